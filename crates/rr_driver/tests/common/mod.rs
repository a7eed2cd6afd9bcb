#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use rr_ast::builder::ASTBuilder;
use rr_config::RrConfig;
use rr_driver::{CompilationUnit, RunOutcome, compile_unit};
use rr_type::file::FileId;
use tempfile::TempDir;

pub fn quiet_config() -> RrConfig {
  RrConfig {
    quiet: true,
    ..RrConfig::default()
  }
}

pub fn unit(
  name: &str,
  build: impl FnOnce(&mut ASTBuilder),
) -> CompilationUnit {
  let mut builder = ASTBuilder::new(FileId::new(0));
  build(&mut builder);
  CompilationUnit::new(name, builder.finish())
}

/// R source of a unit that is expected to compile.
pub fn r_source(
  config: &RrConfig,
  unit: &CompilationUnit,
) -> String {
  let outcome = match compile_unit(config, unit) {
    Ok(outcome) => outcome,
    Err(error) => panic!("invalid pass list: {}", error),
  };
  assert!(outcome.succeeded(), "'{}' did not compile: {:#?}", unit.name, outcome.diagnostics);
  source_of(&outcome, &unit.name)
}

pub fn source_of(
  outcome: &RunOutcome,
  name: &str,
) -> String {
  match outcome.unit(name).and_then(|unit| unit.r_source.clone()) {
    Some(source) => source,
    None => panic!("no R output for '{}'", name),
  }
}

pub fn rscript_available() -> bool {
  Command::new("Rscript").arg("--version").output().map(|out| out.status.success()).unwrap_or(false)
}

pub struct RResult {
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
}

/// Runs R source with `Rscript` from a scratch directory.
pub fn run_r(source: &str) -> RResult {
  let dir = TempDir::new().expect("temp dir");
  let script = dir.path().join("main.R");
  std::fs::write(&script, source).expect("write R script");

  run_script(&script, dir.path())
}

fn run_script(
  script: &Path,
  cwd: &Path,
) -> RResult {
  let output = Command::new("Rscript")
    .arg("--vanilla")
    .arg(script)
    .current_dir(cwd)
    .output()
    .expect("run Rscript");

  RResult {
    success: output.status.success(),
    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
  }
}
