use rr_analyzer::build_hir;
use rr_ast::builder::ASTBuilder;
use rr_config::RrConfig;
use rr_mir::{MirProgram, display::format_function, lower_hir};
use rr_tachyon::{Tachyon, TachyonReport};
use rr_type::{file::FileId, symbol::SymbolTable};

pub fn quiet_config() -> RrConfig {
  RrConfig {
    quiet: true,
    ..RrConfig::default()
  }
}

/// Builds a unit with `build`, analyzes it and lowers it to MIR.
pub fn lower(build: impl FnOnce(&mut ASTBuilder)) -> MirProgram {
  let mut builder = ASTBuilder::new(FileId::new(0));
  build(&mut builder);
  let ast = builder.finish();

  let hir = match build_hir(&ast, SymbolTable::with_builtins()) {
    Ok(hir) => hir,
    Err(diagnostics) => panic!("unit does not analyze: {:#?}", diagnostics),
  };
  match lower_hir(&hir) {
    Ok(lowering) => lowering.program,
    Err(error) => panic!("unit does not lower: {}", error),
  }
}

/// Lowers and optimizes with `config`, returning the optimized program.
#[allow(dead_code)]
pub fn optimize_with(
  config: &RrConfig,
  build: impl FnOnce(&mut ASTBuilder),
) -> (MirProgram, TachyonReport) {
  let mut program = lower(build);
  let tachyon = match Tachyon::new(config) {
    Ok(tachyon) => tachyon,
    Err(error) => panic!("invalid pass list: {}", error),
  };
  match tachyon.optimize_program(&mut program) {
    Ok(report) => (program, report),
    Err(error) => panic!("optimization failed: {}", error),
  }
}

#[allow(dead_code)]
pub fn optimize(build: impl FnOnce(&mut ASTBuilder)) -> MirProgram {
  optimize_with(&quiet_config(), build).0
}

#[allow(dead_code)]
pub fn function_text(
  program: &MirProgram,
  name: &str,
) -> String {
  match program.function(name) {
    Some(function) => format_function(function),
    None => panic!("no function named '{}'", name),
  }
}
