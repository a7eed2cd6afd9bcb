//! Runs emitted R with `Rscript`, comparing optimized against unoptimized
//! output. Skipped when R is not installed.

mod common;

use rr_ast::{builder::ASTBuilder, expressions::ASTBinaryOperator, statements::ASTAssignOperator};
use rr_config::RrConfig;
use rr_driver::CompilationUnit;

fn print_stmt(
  b: &mut ASTBuilder,
  value: rr_ast::NodeId,
) -> rr_ast::NodeId {
  let call = b.call("print", vec![value]);
  b.expr_stmt(call)
}

fn fib(b: &mut ASTBuilder) {
  let n = b.var("n");
  let two = b.int(2);
  let small = b.binary(ASTBinaryOperator::LessThan, n, two);
  let n = b.var("n");
  let base = b.expr_stmt(n);

  let n = b.var("n");
  let one = b.int(1);
  let a = b.binary(ASTBinaryOperator::Subtract, n, one);
  let left = b.call("fib", vec![a]);
  let n = b.var("n");
  let two = b.int(2);
  let c = b.binary(ASTBinaryOperator::Subtract, n, two);
  let right = b.call("fib", vec![c]);
  let sum = b.binary(ASTBinaryOperator::Add, left, right);
  let recurse = b.expr_stmt(sum);

  let body = b.if_(small, vec![base], Some(vec![recurse]));
  let f = b.function("fib", &["n"], vec![body]);
  b.root(f);

  let ten = b.int(10);
  let call = b.call("fib", vec![ten]);
  let stmt = print_stmt(b, call);
  b.root(stmt);
}

fn filtered_sum(b: &mut ASTBuilder) {
  let zero = b.int(0);
  let total = b.let_mut("total", zero);
  b.root(total);

  let i = b.var("i");
  let seven = b.int(7);
  let stop = b.binary(ASTBinaryOperator::GreaterThan, i, seven);
  let brk = b.break_();
  let early = b.if_(stop, vec![brk], None);
  let i = b.var("i");
  let two = b.int(2);
  let rem = b.binary(ASTBinaryOperator::Modulo, i, two);
  let zero = b.int(0);
  let even = b.binary(ASTBinaryOperator::Equal, rem, zero);
  let nxt = b.next();
  let skip = b.if_(even, vec![nxt], None);
  let i = b.var("i");
  let add = b.assign_op("total", ASTAssignOperator::AddAssign, i);
  let start = b.int(1);
  let end = b.int(10);
  let lp = b.for_range("i", start, end, vec![early, skip, add]);
  b.root(lp);

  let t = b.var("total");
  let stmt = print_stmt(b, t);
  b.root(stmt);
}

fn vector_update(b: &mut ASTBuilder) {
  let items: Vec<_> = [1, 2, 3].iter().map(|v| b.int(*v)).collect();
  let vector = b.call("c", items);
  let decl = b.let_mut("v", vector);
  b.root(decl);

  let one = b.int(1);
  let three = b.int(3);
  let doubled = b.binary(ASTBinaryOperator::Multiply, one, three);
  let ten = b.int(10);
  let store = b.assign_index("v", doubled, ASTAssignOperator::AddAssign, ten);
  b.root(store);

  let v = b.var("v");
  let stmt = print_stmt(b, v);
  b.root(stmt);
  let v = b.var("v");
  let len = b.call("length", vec![v]);
  let stmt = print_stmt(b, len);
  b.root(stmt);
}

fn swap_loop(b: &mut ASTBuilder) {
  let one = b.int(1);
  let a = b.let_mut("a", one);
  b.root(a);
  let two = b.int(2);
  let c = b.let_mut("b", two);
  b.root(c);

  let a_ref = b.var("a");
  let t = b.let_("t", a_ref);
  let b_ref = b.var("b");
  let set_a = b.assign("a", b_ref);
  let t_ref = b.var("t");
  let set_b = b.assign("b", t_ref);
  let start = b.int(1);
  let end = b.int(3);
  let lp = b.for_range("k", start, end, vec![t, set_a, set_b]);
  b.root(lp);

  let a_ref = b.var("a");
  let stmt = print_stmt(b, a_ref);
  b.root(stmt);
  let b_ref = b.var("b");
  let stmt = print_stmt(b, b_ref);
  b.root(stmt);
}

fn logic_and_division(b: &mut ASTBuilder) {
  let x = b.var("x");
  let zero = b.int(0);
  let positive = b.binary(ASTBinaryOperator::GreaterThan, x, zero);
  let x = b.var("x");
  let ten = b.int(10);
  let small = b.binary(ASTBinaryOperator::LessThan, x, ten);
  let both = b.binary(ASTBinaryOperator::And, positive, small);
  let x = b.var("x");
  let four = b.int(4);
  let quarter = b.binary(ASTBinaryOperator::Divide, x, four);
  let then_tail = b.expr_stmt(quarter);
  let none = b.float(-1.0);
  let else_tail = b.expr_stmt(none);
  let choice = b.if_(both, vec![then_tail], Some(vec![else_tail]));
  let f = b.function("scale", &["x"], vec![choice]);
  b.root(f);

  for input in [-3, 5, 12] {
    let arg = b.int(input);
    let call = b.call("scale", vec![arg]);
    let stmt = print_stmt(b, call);
    b.root(stmt);
  }

  let s = b.str("done \"quoted\"\n");
  let call = b.call("cat", vec![s]);
  let stmt = b.expr_stmt(call);
  b.root(stmt);
}

fn samples() -> Vec<CompilationUnit> {
  vec![
    common::unit("fib", fib),
    common::unit("filtered_sum", filtered_sum),
    common::unit("vector_update", vector_update),
    common::unit("swap_loop", swap_loop),
    common::unit("logic_and_division", logic_and_division),
  ]
}

#[test]
fn optimized_r_behaves_like_unoptimized_r() {
  if !common::rscript_available() {
    eprintln!("Rscript not found, skipping");
    return;
  }

  let optimized = common::quiet_config();
  let plain = RrConfig {
    optimize: false,
    ..common::quiet_config()
  };

  for unit in samples() {
    let before = common::run_r(&common::r_source(&plain, &unit));
    let after = common::run_r(&common::r_source(&optimized, &unit));

    assert!(before.success, "'{}' failed unoptimized:\n{}", unit.name, before.stderr);
    assert!(after.success, "'{}' failed optimized:\n{}", unit.name, after.stderr);
    assert_eq!(before.stdout, after.stdout, "'{}' changed behavior", unit.name);
  }
}

#[test]
fn known_outputs() {
  if !common::rscript_available() {
    eprintln!("Rscript not found, skipping");
    return;
  }

  let config = common::quiet_config();
  let outputs: Vec<String> = samples()
    .iter()
    .map(|unit| common::run_r(&common::r_source(&config, unit)).stdout)
    .collect();

  assert_eq!(outputs[0], "[1] 55\n");
  assert_eq!(outputs[1], "[1] 16\n");
  assert_eq!(outputs[2], "[1]  1  2 13\n[1] 3\n");
  assert_eq!(outputs[3], "[1] 2\n[1] 1\n");
  assert_eq!(outputs[4], "[1] -1\n[1] 1.25\n[1] -1\ndone \"quoted\"\n");
}
