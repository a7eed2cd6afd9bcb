use std::collections::BTreeMap;

use rr_ast::ASTProgram;
use rr_config::DumpKind;
use rr_tachyon::TachyonReport;

/// One independently compiled source: its name and the front-end's AST.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
  pub name: String,
  pub ast: ASTProgram,
}

impl CompilationUnit {
  pub fn new(
    name: impl Into<String>,
    ast: ASTProgram,
  ) -> Self {
    Self { name: name.into(), ast }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
  Hir,
  Mir,
  Tachyon,
  Emit,
}

impl std::fmt::Display for Stage {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    let name = match self {
      Stage::Hir => "HIR construction",
      Stage::Mir => "MIR lowering",
      Stage::Tachyon => "Tachyon",
      Stage::Emit => "R emission",
    };
    write!(f, "{}", name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
  Compiled,
  /// The stage reported errors for this unit.
  Failed(Stage),
  /// The run was stopped before the stage started.
  Skipped(Stage),
}

#[derive(Debug, Clone)]
pub struct UnitResult {
  pub name: String,
  pub status: UnitStatus,
  pub r_source: Option<String>,
  /// Requested dumps of the stages that ran.
  pub dumps: BTreeMap<DumpKind, String>,
  pub tachyon: Option<TachyonReport>,
}

impl UnitResult {
  pub(crate) fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      status: UnitStatus::Compiled,
      r_source: None,
      dumps: BTreeMap::new(),
      tachyon: None,
    }
  }

  pub fn is_compiled(&self) -> bool {
    self.status == UnitStatus::Compiled
  }

  pub fn dump(
    &self,
    kind: DumpKind,
  ) -> Option<&str> {
    self.dumps.get(&kind).map(String::as_str)
  }
}
