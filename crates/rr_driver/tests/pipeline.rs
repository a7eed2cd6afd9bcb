mod common;

use rr_ast::{builder::ASTBuilder, expressions::ASTBinaryOperator};
use rr_config::DumpKind;
use rr_driver::{Driver, Stage, UnitStatus, compile_units, write_outputs};
use rr_tachyon::TachyonError;

fn print_sum(b: &mut ASTBuilder) {
  let one = b.int(1);
  let two = b.int(2);
  let sum = b.binary(ASTBinaryOperator::Add, one, two);
  let call = b.call("print", vec![sum]);
  let stmt = b.expr_stmt(call);
  b.root(stmt);
}

fn print_undeclared(
  b: &mut ASTBuilder,
  names: &[&str],
) {
  for name in names {
    let value = b.var(name);
    let call = b.call("print", vec![value]);
    let stmt = b.expr_stmt(call);
    b.root(stmt);
  }
}

#[test]
fn units_come_back_in_input_order() {
  let units: Vec<_> = (0..6).map(|i| common::unit(&format!("unit{}", i), print_sum)).collect();

  let outcome = compile_units(&common::quiet_config(), &units).unwrap();

  assert!(outcome.succeeded());
  let names: Vec<&str> = outcome.units.iter().map(|u| u.name.as_str()).collect();
  assert_eq!(names, vec!["unit0", "unit1", "unit2", "unit3", "unit4", "unit5"]);
  for unit in &outcome.units {
    let source = unit.r_source.as_deref().unwrap();
    assert!(source.contains("print(3)"), "{}", source);
  }
}

#[test]
fn failing_unit_does_not_stop_its_siblings() {
  let units = vec![
    common::unit("good", print_sum),
    common::unit("bad", |b| print_undeclared(b, &["missing"])),
    common::unit("also_good", print_sum),
  ];

  let outcome = compile_units(&common::quiet_config(), &units).unwrap();

  assert!(!outcome.aborted);
  assert!(!outcome.succeeded());
  assert_eq!(outcome.unit("good").unwrap().status, UnitStatus::Compiled);
  assert_eq!(outcome.unit("also_good").unwrap().status, UnitStatus::Compiled);

  let bad = outcome.unit("bad").unwrap();
  assert_eq!(bad.status, UnitStatus::Failed(Stage::Hir));
  assert!(bad.r_source.is_none());

  let codes: Vec<&str> = outcome.diagnostics.iter().map(|d| d.error_code.as_str()).collect();
  assert_eq!(codes, vec!["RR0001"]);
  assert_eq!(outcome.error_count(), 1);
}

#[test]
fn error_budget_stops_later_units() {
  let mut config = common::quiet_config();
  config.max_errors = 2;

  let units = vec![
    common::unit("bad", |b| print_undeclared(b, &["x", "y"])),
    common::unit("late", print_sum),
  ];
  let outcome = Driver::new(&config).unwrap().with_workers(1).compile_units(&units);

  assert!(outcome.aborted);
  assert_eq!(outcome.unit("bad").unwrap().status, UnitStatus::Failed(Stage::Hir));
  assert_eq!(outcome.unit("late").unwrap().status, UnitStatus::Skipped(Stage::Hir));
}

#[test]
fn zero_error_budget_means_no_limit() {
  let mut config = common::quiet_config();
  config.max_errors = 0;

  let units = vec![
    common::unit("bad", |b| print_undeclared(b, &["x"])),
    common::unit("late", print_sum),
  ];
  let outcome = Driver::new(&config).unwrap().with_workers(1).compile_units(&units);

  assert!(!outcome.aborted);
  assert_eq!(outcome.unit("late").unwrap().status, UnitStatus::Compiled);
}

#[test]
fn diagnostics_of_one_unit_stay_together() {
  let names: Vec<(String, String)> = (0..16).map(|i| (format!("a{}", i), format!("b{}", i))).collect();
  let units: Vec<_> = names
    .iter()
    .enumerate()
    .map(|(i, (a, b))| common::unit(&format!("u{}", i), |builder| print_undeclared(builder, &[a.as_str(), b.as_str()])))
    .collect();

  let outcome = compile_units(&common::quiet_config(), &units).unwrap();

  assert_eq!(outcome.diagnostics.len(), 32);
  for (a, b) in &names {
    let first = outcome.diagnostics.iter().position(|d| d.message == format!("Undeclared variable '{}'", a));
    let second = outcome.diagnostics.iter().position(|d| d.message == format!("Undeclared variable '{}'", b));
    assert_eq!(first.map(|i| i + 1), second, "diagnostics of '{}' were split", a);
  }
}

#[test]
fn requested_dumps_are_returned() {
  let mut config = common::quiet_config();
  config.dump = vec![DumpKind::Hir, DumpKind::Mir, DumpKind::MirOpt, DumpKind::R];

  let outcome = compile_units(&config, &[common::unit("main", print_sum)]).unwrap();
  let unit = outcome.unit("main").unwrap();

  assert!(unit.dump(DumpKind::Mir).unwrap().starts_with("=== MIR ==="));
  assert!(unit.dump(DumpKind::MirOpt).unwrap().contains("call print(3)"));
  assert!(unit.dump(DumpKind::Hir).is_some());
  assert_eq!(unit.dump(DumpKind::R), unit.r_source.as_deref());
}

#[test]
fn unoptimized_runs_skip_tachyon() {
  let mut config = common::quiet_config();
  config.optimize = false;
  config.dump = vec![DumpKind::MirOpt];

  let outcome = compile_units(&config, &[common::unit("main", print_sum)]).unwrap();
  let unit = outcome.unit("main").unwrap();

  assert!(unit.is_compiled());
  assert!(unit.tachyon.is_none());
  assert!(unit.dump(DumpKind::MirOpt).is_none());
  assert!(unit.r_source.as_deref().unwrap().contains("1 + 2"));
}

#[test]
fn tachyon_report_is_attached() {
  let outcome = compile_units(&common::quiet_config(), &[common::unit("main", print_sum)]).unwrap();
  let report = outcome.unit("main").unwrap().tachyon.as_ref().unwrap();

  let main = report.function(".rr_main").unwrap();
  assert!(main.converged);
  assert_eq!(main.changes_by("const-prop"), 1);
}

#[test]
fn non_convergence_is_only_a_warning() {
  let mut config = common::quiet_config();
  config.tachyon.max_iterations = 1;

  let outcome = compile_units(&config, &[common::unit("main", print_sum)]).unwrap();

  assert!(outcome.succeeded());
  let codes: Vec<&str> = outcome.diagnostics.iter().map(|d| d.error_code.as_str()).collect();
  assert_eq!(codes, vec!["RR0101"]);
  assert_eq!(outcome.error_count(), 0);
}

#[test]
fn invalid_pass_list_is_rejected_up_front() {
  let mut config = common::quiet_config();
  config.tachyon = config.tachyon.with_pass_enabled("inline", true);

  let error = compile_units(&config, &[common::unit("main", print_sum)]).unwrap_err();
  assert_eq!(error, TachyonError::UnknownPass("inline".to_string()));
}

#[test]
fn outputs_are_written_next_to_each_other() {
  let mut config = common::quiet_config();
  config.dump = vec![DumpKind::MirOpt];

  let units = vec![
    common::unit("main", print_sum),
    common::unit("broken", |b| print_undeclared(b, &["x"])),
  ];
  let outcome = compile_units(&config, &units).unwrap();

  let dir = tempfile::tempdir().unwrap();
  let written = write_outputs(&outcome, dir.path()).unwrap();

  let mut names: Vec<String> =
    written.iter().map(|p| p.file_name().unwrap().to_string_lossy().to_string()).collect();
  names.sort();
  assert_eq!(names, vec!["main.R", "main.mir-opt.txt"]);

  let source = std::fs::read_to_string(dir.path().join("main.R")).unwrap();
  assert_eq!(Some(source), outcome.unit("main").unwrap().r_source.clone());
}

#[test]
fn entry_unit_emits_rr_main() {
  let source = common::r_source(&common::quiet_config(), &common::unit("main", print_sum));

  insta::assert_snapshot!(source, @r"
  .rr_main <- function() {
    print(3)
    return(invisible(NULL))
  }

  invisible(.rr_main())
  ");
}
