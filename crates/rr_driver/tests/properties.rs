mod common;

use proptest::prelude::*;
use rr_ast::{NodeId, builder::ASTBuilder, expressions::ASTBinaryOperator};
use rr_config::RrConfig;
use rr_driver::compile_unit;

const VARS: [&str; 2] = ["x", "y"];

#[derive(Debug, Clone)]
enum Stmt {
  Bump { target: usize, by: i64 },
  Branch { source: usize, limit: i64, then_body: Vec<Stmt>, else_body: Vec<Stmt> },
  Count { times: i64, body: Vec<Stmt> },
  /// `break` inside a loop, `print` elsewhere.
  Leave,
  Print(usize),
}

fn stmt() -> impl Strategy<Value = Stmt> {
  let leaf = prop_oneof![
    (0..2usize, -3..3i64).prop_map(|(target, by)| Stmt::Bump { target, by }),
    Just(Stmt::Leave),
    (0..2usize).prop_map(Stmt::Print),
  ];

  leaf.prop_recursive(3, 16, 3, |inner| {
    prop_oneof![
      (
        0..2usize,
        -3..3i64,
        prop::collection::vec(inner.clone(), 0..3),
        prop::collection::vec(inner.clone(), 0..3)
      )
        .prop_map(|(source, limit, then_body, else_body)| Stmt::Branch {
          source,
          limit,
          then_body,
          else_body
        }),
      (0..4i64, prop::collection::vec(inner, 0..4)).prop_map(|(times, body)| Stmt::Count { times, body }),
    ]
  })
}

fn build_stmt(
  b: &mut ASTBuilder,
  stmt: &Stmt,
  depth: usize,
) -> NodeId {
  match stmt {
    Stmt::Bump { target, by } => {
      let current = b.var(VARS[*target]);
      let by = b.int(*by);
      let value = b.binary(ASTBinaryOperator::Add, current, by);
      b.assign(VARS[*target], value)
    },
    Stmt::Branch {
      source,
      limit,
      then_body,
      else_body,
    } => {
      let source = b.var(VARS[*source]);
      let limit = b.int(*limit);
      let condition = b.binary(ASTBinaryOperator::LessThan, source, limit);
      let then_body = then_body.iter().map(|s| build_stmt(b, s, depth)).collect();
      let else_body = else_body.iter().map(|s| build_stmt(b, s, depth)).collect();
      b.if_(condition, then_body, Some(else_body))
    },
    Stmt::Count { times, body } => {
      let start = b.int(1);
      let end = b.int(*times);
      let body = body.iter().map(|s| build_stmt(b, s, depth + 1)).collect();
      b.for_range(&format!("k{}", depth), start, end, body)
    },
    Stmt::Leave if depth > 0 => b.break_(),
    Stmt::Leave => {
      let value = b.str("out");
      let call = b.call("print", vec![value]);
      b.expr_stmt(call)
    },
    Stmt::Print(source) => {
      let value = b.var(VARS[*source]);
      let call = b.call("print", vec![value]);
      b.expr_stmt(call)
    },
  }
}

fn build_program(
  b: &mut ASTBuilder,
  statements: &[Stmt],
) {
  for name in VARS {
    let zero = b.int(0);
    let decl = b.let_mut(name, zero);
    b.root(decl);
  }
  for statement in statements {
    let node = build_stmt(b, statement, 0);
    b.root(node);
  }
  for name in VARS {
    let value = b.var(name);
    let call = b.call("print", vec![value]);
    let stmt = b.expr_stmt(call);
    b.root(stmt);
  }
}

fn compile(
  config: &RrConfig,
  statements: &[Stmt],
) -> Result<String, String> {
  let unit = common::unit("generated", |b| build_program(b, statements));
  let outcome = compile_unit(config, &unit).map_err(|e| e.to_string())?;
  if !outcome.succeeded() {
    return Err(format!("{:#?}", outcome.diagnostics));
  }
  Ok(common::source_of(&outcome, "generated"))
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn structured_programs_always_emit(statements in prop::collection::vec(stmt(), 0..6)) {
    let plain = RrConfig { optimize: false, ..common::quiet_config() };

    let unoptimized = compile(&plain, &statements);
    prop_assert!(unoptimized.is_ok(), "{:?}", unoptimized);
    let optimized = compile(&common::quiet_config(), &statements);
    prop_assert!(optimized.is_ok(), "{:?}", optimized);
  }

  #[test]
  fn emission_is_deterministic(statements in prop::collection::vec(stmt(), 0..6)) {
    let first = compile(&common::quiet_config(), &statements);
    let second = compile(&common::quiet_config(), &statements);
    prop_assert_eq!(first, second);
  }
}
