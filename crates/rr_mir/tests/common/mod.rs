use rr_analyzer::build_hir;
use rr_ast::builder::ASTBuilder;
use rr_mir::{
  MirLowering, MirProgram,
  display::format_function,
  eval::{EvalError, EvalOutcome, run_program},
  lower_hir,
};
use rr_type::{file::FileId, symbol::SymbolTable};

/// Builds a unit with `build`, analyzes it and lowers it to MIR.
pub fn lower(build: impl FnOnce(&mut ASTBuilder)) -> MirLowering {
  let mut builder = ASTBuilder::new(FileId::new(0));
  build(&mut builder);
  let ast = builder.finish();

  let hir = match build_hir(&ast, SymbolTable::with_builtins()) {
    Ok(hir) => hir,
    Err(diagnostics) => panic!("unit does not analyze: {:#?}", diagnostics),
  };
  match lower_hir(&hir) {
    Ok(lowering) => lowering,
    Err(error) => panic!("unit does not lower: {}", error),
  }
}

#[allow(dead_code)]
pub fn program(build: impl FnOnce(&mut ASTBuilder)) -> MirProgram {
  lower(build).program
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

#[allow(dead_code)]
pub fn run(build: impl FnOnce(&mut ASTBuilder)) -> Result<EvalOutcome, EvalError> {
  run_program(&program(build))
}

#[allow(dead_code)]
pub fn output(build: impl FnOnce(&mut ASTBuilder)) -> String {
  match run(build) {
    Ok(outcome) => outcome.output,
    Err(error) => panic!("evaluation failed: {}", error),
  }
}
