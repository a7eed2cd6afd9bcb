mod common;

use proptest::prelude::*;
use rr_ast::{builder::ASTBuilder, expressions::ASTBinaryOperator, NodeId};

fn operator() -> impl Strategy<Value = ASTBinaryOperator> {
  prop_oneof![
    Just(ASTBinaryOperator::Add),
    Just(ASTBinaryOperator::Subtract),
    Just(ASTBinaryOperator::Multiply),
    Just(ASTBinaryOperator::Divide),
    Just(ASTBinaryOperator::LessThan),
    Just(ASTBinaryOperator::And),
  ]
}

/// A chain of `let vN = <previous or literal> op <name>` statements over a
/// small pool of names, some of which are never declared.
fn program() -> impl Strategy<Value = Vec<(ASTBinaryOperator, i64, usize)>> {
  prop::collection::vec((operator(), -50i64..50, 0usize..6), 1..12)
}

fn build(
  b: &mut ASTBuilder,
  steps: &[(ASTBinaryOperator, i64, usize)],
) {
  let names = ["v0", "v1", "v2", "v3", "w", "z"];
  for (i, (op, literal, name)) in steps.iter().enumerate() {
    let left: NodeId = b.int(*literal);
    let right = b.var(names[*name]);
    let value = b.binary(*op, left, right);
    let decl = b.let_(&format!("v{}", i), value);
    b.root(decl);
  }
}

proptest! {
  #[test]
  fn hir_output_is_deterministic(steps in program()) {
    let first = common::analyze(|b| build(b, &steps));
    let second = common::analyze(|b| build(b, &steps));

    match (first, second) {
      (Ok(a), Ok(b)) => prop_assert_eq!(common::format_hir(&a), common::format_hir(&b)),
      (Err(a), Err(b)) => prop_assert_eq!(a, b),
      _ => prop_assert!(false, "runs disagree on success"),
    }
  }

  #[test]
  fn every_failure_carries_a_user_error(steps in program()) {
    if let Err(diagnostics) = common::analyze(|b| build(b, &steps)) {
      prop_assert!(!diagnostics.is_empty());
      prop_assert!(diagnostics.iter().all(|d| !d.kind.is_internal()));
    }
  }
}
