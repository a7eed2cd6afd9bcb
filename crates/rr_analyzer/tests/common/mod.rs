use rr_analyzer::build_hir;
use rr_ast::builder::ASTBuilder;
use rr_diagnostics::diagnostic_report::Diagnostic;
use rr_hir::{HIR, display::HIRPrinter};
use rr_type::{file::FileId, symbol::SymbolTable};

/// Builds a unit with `build` and runs the HIR builder over it.
pub fn analyze(build: impl FnOnce(&mut ASTBuilder)) -> Result<HIR, Vec<Diagnostic>> {
  let mut builder = ASTBuilder::new(FileId::new(0));
  build(&mut builder);
  let program = builder.finish();
  build_hir(&program, SymbolTable::with_builtins())
}

#[allow(dead_code)]
pub fn analyze_ok(build: impl FnOnce(&mut ASTBuilder)) -> HIR {
  match analyze(build) {
    Ok(hir) => hir,
    Err(diagnostics) => panic!("expected no errors, got: {:#?}", diagnostics),
  }
}

#[allow(dead_code)]
pub fn error_codes(build: impl FnOnce(&mut ASTBuilder)) -> Vec<String> {
  match analyze(build) {
    Ok(_) => Vec::new(),
    Err(diagnostics) => diagnostics.into_iter().map(|d| d.error_code).collect(),
  }
}

#[allow(dead_code)]
pub fn format_hir(hir: &HIR) -> String {
  HIRPrinter::new(hir).print()
}
