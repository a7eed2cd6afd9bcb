use rr_analyzer::build_hir;
use rr_ast::builder::ASTBuilder;
use rr_codegen_r::emit_r;
use rr_config::RrConfig;
use rr_mir::{MirProgram, lower_hir};
use rr_tachyon::Tachyon;
use rr_type::{file::FileId, symbol::SymbolTable};

pub fn quiet_config() -> RrConfig {
  RrConfig {
    quiet: true,
    ..RrConfig::default()
  }
}

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

pub fn emit(program: &MirProgram) -> String {
  match emit_r(program, &quiet_config()) {
    Ok(source) => source,
    Err(error) => panic!("emission failed: {}", error),
  }
}

/// R for the unit exactly as lowered.
#[allow(dead_code)]
pub fn emit_plain(build: impl FnOnce(&mut ASTBuilder)) -> String {
  emit(&lower(build))
}

/// R for the unit after Tachyon with the default pass list.
#[allow(dead_code)]
pub fn emit_optimized(build: impl FnOnce(&mut ASTBuilder)) -> String {
  let config = quiet_config();
  let mut program = lower(build);
  let tachyon = match Tachyon::new(&config) {
    Ok(tachyon) => tachyon,
    Err(error) => panic!("invalid pass list: {}", error),
  };
  if let Err(error) = tachyon.optimize_program(&mut program) {
    panic!("optimization failed: {}", error);
  }
  emit(&program)
}
