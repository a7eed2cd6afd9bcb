mod common;

use rr_ast::{builder::ASTBuilder, expressions::ASTBinaryOperator, statements::ASTAssignOperator};
use rr_type::types::Type;

#[test]
fn constant_branch_emits_a_single_return() {
  let source = common::emit_optimized(|b| {
    let two = b.int(2);
    let one = b.int(1);
    let condition = b.binary(ASTBinaryOperator::GreaterThan, two, one);
    let ten = b.int(10);
    let ret_ten = b.ret(Some(ten));
    let twenty = b.int(20);
    let ret_twenty = b.ret(Some(twenty));
    let choice = b.if_(condition, vec![ret_ten], Some(vec![ret_twenty]));
    let f = b.function("pick", &[], vec![choice]);
    b.root(f);
  });

  insta::assert_snapshot!(source, @r"
  pick <- function() {
    return(10)
  }
  ");
}

fn add_and_print(b: &mut ASTBuilder) {
  let a = b.var("a");
  let c = b.var("b");
  let sum = b.binary(ASTBinaryOperator::Add, a, c);
  let tail = b.expr_stmt(sum);
  let f = b.function("add", &["a", "b"], vec![tail]);
  b.root(f);

  let one = b.int(1);
  let two = b.int(2);
  let call = b.call("add", vec![one, two]);
  let print = b.call("print", vec![call]);
  let stmt = b.expr_stmt(print);
  b.root(stmt);
}

#[test]
fn entry_function_runs_last() {
  let source = common::emit_optimized(add_and_print);

  insta::assert_snapshot!(source, @r"
  add <- function(a, b) {
    return(a + b)
  }

  .rr_main <- function() {
    print(add(1, 2))
    return(invisible(NULL))
  }

  invisible(.rr_main())
  ");
}

#[test]
fn if_value_assigns_on_each_arm() {
  let source = common::emit_plain(|b| {
    let c = b.var("c");
    let one = b.int(1);
    let then_tail = b.expr_stmt(one);
    let two = b.int(2);
    let else_tail = b.expr_stmt(two);
    let choice = b.if_(c, vec![then_tail], Some(vec![else_tail]));
    let f = b.function("pick", &["c"], vec![choice]);
    b.root(f);
  });

  insta::assert_snapshot!(source, @r"
  pick <- function(c) {
    .v0 <- NULL
    if (c) {
      .v0 <- 1
    } else {
      .v0 <- 2
    }
    return(.v0)
  }
  ");
}

#[test]
fn while_loop_becomes_repeat_with_guard() {
  let source = common::emit_plain(|b| {
    let zero = b.int(0);
    let init = b.let_mut("i", zero);
    let i = b.var("i");
    let n = b.var("n");
    let cond = b.binary(ASTBinaryOperator::LessThan, i, n);
    let i2 = b.var("i");
    let one = b.int(1);
    let next = b.binary(ASTBinaryOperator::Add, i2, one);
    let step = b.assign("i", next);
    let lp = b.while_(cond, vec![step]);
    let result = b.var("i");
    let tail = b.expr_stmt(result);
    let f = b.function("count", &["n"], vec![init, lp, tail]);
    b.root(f);
  });

  insta::assert_snapshot!(source, @r"
  count <- function(n) {
    .v1 <- NULL
    .v1 <- 0
    repeat {
      if (!(.v1 < n)) {
        break
      }
      .v3 <- .v1 + 1
      .v1 <- .v3
    }
    return(.v1)
  }
  ");
}

#[test]
fn indexed_variables_are_named_after_their_source() {
  let source = common::emit_optimized(|b| {
    let items: Vec<_> = [1, 2, 3].iter().map(|v| b.int(*v)).collect();
    let vector = b.call("c", items);
    let decl = b.let_mut("v", vector);
    b.root(decl);
    let index = b.int(2);
    let ten = b.int(10);
    let store = b.assign_index("v", index, ASTAssignOperator::Assign, ten);
    b.root(store);
    let v = b.var("v");
    let call = b.call("print", vec![v]);
    let print = b.expr_stmt(call);
    b.root(print);
  });

  assert!(source.contains("  v <- c(1, 2, 3)\n"), "{}", source);
  assert!(source.contains("  v[2] <- 10\n"), "{}", source);
  assert!(source.contains("  print(v)\n"), "{}", source);
}

#[test]
fn swapped_loop_variables_use_a_temporary() {
  let source = common::emit_plain(|b| {
    let one = b.int(1);
    let a = b.let_mut("a", one);
    let two = b.int(2);
    let c = b.let_mut("b", two);
    let zero = b.int(0);
    let i = b.let_mut("i", zero);

    let i_ref = b.var("i");
    let n = b.var("n");
    let cond = b.binary(ASTBinaryOperator::LessThan, i_ref, n);
    let a_ref = b.var("a");
    let t = b.let_("t", a_ref);
    let b_ref = b.var("b");
    let set_a = b.assign("a", b_ref);
    let t_ref = b.var("t");
    let set_b = b.assign("b", t_ref);
    let one = b.int(1);
    let bump = b.assign_op("i", ASTAssignOperator::AddAssign, one);
    let lp = b.while_(cond, vec![t, set_a, set_b, bump]);

    let a_ref = b.var("a");
    let tail = b.expr_stmt(a_ref);
    let f = b.function("swap", &["n"], vec![a, c, i, lp, tail]);
    b.root(f);
  });

  assert!(source.contains(".t0 <- "), "{}", source);
  assert!(source.contains("repeat {"), "{}", source);
}

#[test]
fn short_circuit_keeps_evaluation_order() {
  let source = common::emit_plain(|b| {
    let x = b.var("x");
    let y = b.var("y");
    let both = b.binary(ASTBinaryOperator::And, x, y);
    let tail = b.expr_stmt(both);
    let f = b.function("both", &["x", "y"], vec![tail]);
    b.root(f);
  });

  insta::assert_snapshot!(source, @r"
  both <- function(x, y) {
    .v0 <- NULL
    if (x) {
      .v0 <- y
    } else {
      .v0 <- FALSE
    }
    return(.v0)
  }
  ");
}

#[test]
fn loops_with_break_and_next_stay_structured() {
  let source = common::emit_optimized(|b| {
    let zero = b.int(0);
    let total = b.let_mut("total", zero);
    b.root(total);

    let i = b.var("i");
    let five = b.int(5);
    let stop = b.binary(ASTBinaryOperator::GreaterThan, i, five);
    let brk = b.break_();
    let early = b.if_(stop, vec![brk], None);
    let i2 = b.var("i");
    let two = b.int(2);
    let rem = b.binary(ASTBinaryOperator::Modulo, i2, two);
    let zero = b.int(0);
    let even = b.binary(ASTBinaryOperator::Equal, rem, zero);
    let nxt = b.next();
    let skip = b.if_(even, vec![nxt], None);
    let i3 = b.var("i");
    let add = b.assign_op("total", ASTAssignOperator::AddAssign, i3);
    let start = b.int(1);
    let end = b.int(10);
    let lp = b.for_range("i", start, end, vec![early, skip, add]);
    b.root(lp);

    let t = b.var("total");
    let call = b.call("print", vec![t]);
    let print = b.expr_stmt(call);
    b.root(print);
  });

  assert_eq!(source.matches("repeat {").count(), 1, "{}", source);
  assert!(source.contains("break"), "{}", source);
  assert!(source.contains("%% 2"), "{}", source);
  assert!(source.trim_end().ends_with("invisible(.rr_main())"), "{}", source);
}

fn print_as_string(
  b: &mut ASTBuilder,
  value: i64,
) {
  let number = b.int(value);
  let text = b.cast(number, Type::Str);
  let print = b.call("print", vec![text]);
  let stmt = b.expr_stmt(print);
  b.root(stmt);
}

#[test]
fn number_to_string_is_left_to_r() {
  for value in [100_000, 1_000_000_000_000_000] {
    let plain = common::emit_plain(|b| print_as_string(b, value));
    let optimized = common::emit_optimized(|b| print_as_string(b, value));

    assert_eq!(plain, optimized);
    assert!(optimized.contains(&format!("  print(as.character({}))\n", value)), "{}", optimized);
  }
}

#[test]
fn integer_casts_are_not_folded_away() {
  let source = common::emit_optimized(|b| {
    let first = b.float(2e9);
    let first = b.cast(first, Type::Int);
    let second = b.float(2e9);
    let second = b.cast(second, Type::Int);
    let sum = b.binary(ASTBinaryOperator::Add, first, second);
    let print = b.call("print", vec![sum]);
    let stmt = b.expr_stmt(print);
    b.root(stmt);
  });

  assert!(source.contains("as.integer(2000000000.0)"), "{}", source);
  assert!(!source.contains("4000000000"), "{}", source);
}
