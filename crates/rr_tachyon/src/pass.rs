use rr_mir::FunctionMir;

use crate::{AnalysisCache, TachyonError};

/// Facts about a function that passes may share instead of recomputing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Analysis {
  Dominance,
}

impl Analysis {
  pub fn name(&self) -> &'static str {
    match self {
      Analysis::Dominance => "dominance",
    }
  }
}

/// Static scheduling facts of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDescriptor {
  pub name: &'static str,
  pub description: &'static str,
  /// Analyses that must be current before the pass runs.
  pub requires: &'static [Analysis],
  /// Analyses the pass computes.
  pub provides: &'static [Analysis],
  /// Analyses made stale when the pass changes the function.
  pub invalidates: &'static [Analysis],
  /// Passes that must come first when both are enabled.
  pub runs_after: &'static [&'static str],
}

/// A Tachyon pass over one function.
///
/// `run` returns whether the function changed. A pass must leave the function
/// in valid SSA form.
pub trait Pass: Send + Sync {
  fn descriptor(&self) -> &'static PassDescriptor;

  fn name(&self) -> &'static str {
    self.descriptor().name
  }

  fn run(
    &self,
    function: &mut FunctionMir,
    analyses: &mut AnalysisCache,
  ) -> Result<bool, TachyonError>;
}
