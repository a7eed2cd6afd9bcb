mod common;

use proptest::prelude::*;
use rr_ast::{NodeId, builder::ASTBuilder, expressions::ASTBinaryOperator};
use rr_mir::{eval::run_program, verify_program};

const VARS: [&str; 3] = ["a", "b", "c"];

#[derive(Debug, Clone)]
enum Stmt {
  Set { target: usize, source: usize, op: u8, literal: i64 },
  Branch { source: usize, limit: i64, then_body: Vec<Stmt>, else_body: Vec<Stmt> },
  Count { times: i64, body: Vec<Stmt> },
  Print(usize),
}

fn stmt() -> impl Strategy<Value = Stmt> {
  let leaf = prop_oneof![
    (0..3usize, 0..3usize, 0..3u8, -5..5i64).prop_map(|(target, source, op, literal)| Stmt::Set {
      target,
      source,
      op,
      literal
    }),
    (0..3usize).prop_map(Stmt::Print),
  ];

  leaf.prop_recursive(2, 12, 3, |inner| {
    prop_oneof![
      (
        0..3usize,
        -5..5i64,
        prop::collection::vec(inner.clone(), 0..3),
        prop::collection::vec(inner.clone(), 0..3)
      )
        .prop_map(|(source, limit, then_body, else_body)| Stmt::Branch {
          source,
          limit,
          then_body,
          else_body
        }),
      (0..4i64, prop::collection::vec(inner, 0..3)).prop_map(|(times, body)| Stmt::Count { times, body }),
    ]
  })
}

fn build_stmt(
  b: &mut ASTBuilder,
  stmt: &Stmt,
  counter: &mut usize,
) -> NodeId {
  match stmt {
    Stmt::Set {
      target,
      source,
      op,
      literal,
    } => {
      let source = b.var(VARS[*source]);
      let literal = b.int(*literal);
      let operator = match op {
        0 => ASTBinaryOperator::Add,
        1 => ASTBinaryOperator::Subtract,
        _ => ASTBinaryOperator::Multiply,
      };
      let value = b.binary(operator, source, literal);
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
      let then_body = then_body.iter().map(|s| build_stmt(b, s, counter)).collect();
      let else_body = else_body.iter().map(|s| build_stmt(b, s, counter)).collect();
      b.if_(condition, then_body, Some(else_body))
    },
    Stmt::Count { times, body } => {
      *counter += 1;
      let name = format!("k{}", counter);
      let start = b.int(1);
      let end = b.int(*times);
      let body = body.iter().map(|s| build_stmt(b, s, counter)).collect();
      b.for_range(&name, start, end, body)
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
  for (i, name) in VARS.iter().enumerate() {
    let init = b.int(i as i64 + 1);
    let decl = b.let_mut(name, init);
    b.root(decl);
  }
  let mut counter = 0;
  for statement in statements {
    let node = build_stmt(b, statement, &mut counter);
    b.root(node);
  }
  for name in VARS {
    let value = b.var(name);
    let call = b.call("print", vec![value]);
    let stmt = b.expr_stmt(call);
    b.root(stmt);
  }
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn lowered_programs_verify(statements in prop::collection::vec(stmt(), 0..6)) {
    let program = common::program(|b| build_program(b, &statements));
    prop_assert_eq!(verify_program(&program), Ok(()));
  }

  #[test]
  fn lowered_programs_run_to_completion(statements in prop::collection::vec(stmt(), 0..6)) {
    let program = common::program(|b| build_program(b, &statements));
    let outcome = run_program(&program);
    prop_assert!(outcome.is_ok(), "{:?}", outcome);
    let outcome = outcome.unwrap();
    prop_assert!(outcome.output.lines().count() >= VARS.len());
  }
}
