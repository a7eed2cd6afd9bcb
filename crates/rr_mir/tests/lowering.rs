mod common;

use rr_ast::expressions::ASTBinaryOperator;
use rr_ast::statements::ASTAssignOperator;
use rr_mir::{Instr, Terminator, cfg, verify_program};

#[test]
fn straight_line_function() {
  let program = common::program(|b| {
    let a = b.var("a");
    let c = b.var("b");
    let sum = b.binary(ASTBinaryOperator::Add, a, c);
    let tail = b.expr_stmt(sum);
    let f = b.function("add", &["a", "b"], vec![tail]);
    b.root(f);
  });

  assert!(program.entry.is_none());
  insta::assert_snapshot!(common::function_text(&program, "add"), @r"
  fn add(a: any, b: any): any {
    entry_0:
      %0: any = add $a, $b
      return %0
  }
  ");
}

#[test]
fn if_value_merges_through_phi() {
  let program = common::program(|b| {
    let c = b.var("c");
    let one = b.int(1);
    let then_tail = b.expr_stmt(one);
    let two = b.int(2);
    let else_tail = b.expr_stmt(two);
    let choice = b.if_(c, vec![then_tail], Some(vec![else_tail]));
    let f = b.function("pick", &["c"], vec![choice]);
    b.root(f);
  });

  insta::assert_snapshot!(common::function_text(&program, "pick"), @r"
  fn pick(c: any): any {
    entry_0:
      branch $c, then_1, else_2
    then_1:
      goto join_3
    else_2:
      goto join_3
    join_3:
      %0: int = phi [then_1: 1, else_2: 2]
      return %0
  }
  ");
}

#[test]
fn loop_carried_variable_gets_header_phi() {
  let program = common::program(|b| {
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

  insta::assert_snapshot!(common::function_text(&program, "count"), @r"
  fn count(n: any): any {
    entry_0:
      goto loop_header_1
    loop_header_1:
      %1: int = phi [entry_0: 0, loop_body_2: %3]
      %2: bool = lt %1, $n
      branch %2, loop_body_2, loop_exit_3
    loop_body_2:
      %3: int = add %1, 1
      goto loop_header_1
    loop_exit_3:
      return %1
  }
  ");
}

#[test]
fn short_circuit_joins_with_constant_edge() {
  let program = common::program(|b| {
    let x = b.var("x");
    let y = b.var("y");
    let both = b.binary(ASTBinaryOperator::And, x, y);
    let tail = b.expr_stmt(both);
    let f = b.function("both", &["x", "y"], vec![tail]);
    b.root(f);
  });

  let text = common::function_text(&program, "both");
  assert!(text.contains("branch $x, rhs_1, short_2"), "{}", text);
  assert!(text.contains("phi [rhs_1: $y, short_2: FALSE]"), "{}", text);
  assert!(verify_program(&program).is_ok());
}

#[test]
fn indexed_variables_live_in_slots() {
  let program = common::program(|b| {
    let one = b.int(1);
    let two = b.int(2);
    let vector = b.call("c", vec![one, two]);
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

  let text = common::function_text(&program, ".rr_main");
  assert!(text.contains("slots:\n    s0: v: vector"), "{}", text);
  assert!(text.contains("store s0[2], 10"), "{}", text);
  assert!(text.contains("load s0"), "{}", text);
  assert!(verify_program(&program).is_ok());
}

#[test]
fn code_after_return_is_reported_once() {
  let lowering = common::lower(|b| {
    let one = b.int(1);
    let ret = b.ret(Some(one));
    let two = b.int(2);
    let call = b.call("print", vec![two]);
    let dead = b.expr_stmt(call);
    let three = b.int(3);
    let call = b.call("print", vec![three]);
    let also_dead = b.expr_stmt(call);
    let f = b.function("early", &[], vec![ret, dead, also_dead]);
    b.root(f);
  });

  let codes: Vec<&str> = lowering.warnings.iter().map(|d| d.error_code.as_str()).collect();
  assert_eq!(codes, vec!["RR0100"]);

  let function = &lowering.program.functions[0];
  assert_eq!(function.instruction_count(), 0);
  assert!(verify_program(&lowering.program).is_ok());
}

#[test]
fn loop_exits_and_back_edges_are_wired() {
  let program = common::program(|b| {
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

  assert_eq!(verify_program(&program), Ok(()));

  let main = program.entry_function().expect("entry function");
  let header = main
    .live_blocks()
    .find(|(_, block)| block.label.starts_with("loop_header"))
    .map(|(id, _)| id)
    .expect("loop header");
  let preds = cfg::predecessors(main);
  // Preheader plus the single back edge out of the update block.
  assert_eq!(preds[header.index() as usize].len(), 2);
  assert!(main.live_blocks().any(|(_, block)| block.label.starts_with("loop_next")));
  assert!(main.live_blocks().any(|(_, block)| block.label.starts_with("loop_end")));
}

#[test]
fn phi_entries_follow_predecessor_order() {
  let program = common::program(|b| {
    let zero = b.int(0);
    let decl = b.let_mut("x", zero);
    let flag = b.var("flag");
    let one = b.int(1);
    let set_one = b.assign("x", one);
    let two = b.int(2);
    let set_two = b.assign("x", two);
    let branch = b.if_(flag, vec![set_one], Some(vec![set_two]));
    let x = b.var("x");
    let tail = b.expr_stmt(x);
    let f = b.function("choose", &["flag"], vec![decl, branch, tail]);
    b.root(f);
  });

  let function = program.function("choose").expect("choose");
  let preds = cfg::predecessors(function);
  for (id, block) in function.live_blocks() {
    for instr in block.phis() {
      let Instr::Phi { incoming, .. } = instr else {
        unreachable!();
      };
      let sources: Vec<_> = incoming.iter().map(|(b, _)| *b).collect();
      assert_eq!(sources, preds[id.index() as usize]);
    }
  }
}

#[test]
fn repeat_without_break_never_returns() {
  let program = common::program(|b| {
    let one = b.int(1);
    let call = b.call("print", vec![one]);
    let body = b.expr_stmt(call);
    let lp = b.repeat(vec![body]);
    b.root(lp);
  });

  let main = program.entry_function().expect("entry function");
  assert!(
    main
      .live_blocks()
      .all(|(_, block)| !matches!(block.terminator, Terminator::Return(_)))
  );
  assert_eq!(verify_program(&program), Ok(()));
}

#[test]
fn entry_function_is_last_and_flagged() {
  let program = common::program(|b| {
    let one = b.int(1);
    let tail = b.expr_stmt(one);
    let f = b.function("one", &[], vec![tail]);
    b.root(f);
    let call = b.call("one", vec![]);
    let print = b.call("print", vec![call]);
    let stmt = b.expr_stmt(print);
    b.root(stmt);
  });

  assert_eq!(program.entry, Some(1));
  let main = program.entry_function().expect("entry function");
  assert!(main.is_entry);
  assert_eq!(main.name, ".rr_main");
  assert!(!program.functions[0].is_entry);
}
