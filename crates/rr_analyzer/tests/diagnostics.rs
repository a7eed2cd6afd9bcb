mod common;

use rr_ast::expressions::ASTBinaryOperator;
use rr_diagnostics::diagnostic_report::{ErrorKind, Severity};
use rr_type::types::Type;

#[test]
fn undeclared_variable_is_a_name_resolution_error() {
  let diagnostics = common::analyze(|b| {
    let y = b.var("y");
    let call = b.call("print", vec![y]);
    let stmt = b.expr_stmt(call);
    b.root(stmt);
  })
  .unwrap_err();

  assert_eq!(diagnostics.len(), 1);
  assert_eq!(diagnostics[0].kind, ErrorKind::NameResolution);
  assert_eq!(diagnostics[0].error_code, "RR0001");
  assert_eq!(diagnostics[0].severity, Severity::Error);
}

#[test]
fn redeclaration_in_same_frame_points_at_previous() {
  let diagnostics = common::analyze(|b| {
    let one = b.int(1);
    let first = b.let_("x", one);
    let two = b.int(2);
    let second = b.let_("x", two);
    b.root(first);
    b.root(second);
  })
  .unwrap_err();

  assert_eq!(diagnostics.len(), 1);
  assert_eq!(diagnostics[0].kind, ErrorKind::DuplicateDeclaration);
  assert_eq!(diagnostics[0].labels.len(), 1);
}

#[test]
fn shadowing_in_nested_block_is_allowed() {
  common::analyze_ok(|b| {
    let one = b.int(1);
    let outer = b.let_("x", one);
    let two = b.int(2);
    let inner = b.let_("x", two);
    let x = b.var("x");
    let call = b.call("print", vec![x]);
    let print = b.expr_stmt(call);
    let block = b.block(vec![inner, print]);
    b.root(outer);
    b.root(block);
  });
}

#[test]
fn assigning_an_immutable_binding_fails() {
  let codes = common::error_codes(|b| {
    let one = b.int(1);
    let decl = b.let_("x", one);
    let two = b.int(2);
    let assign = b.assign("x", two);
    b.root(decl);
    b.root(assign);
  });

  assert_eq!(codes, vec!["RR0004"]);
}

#[test]
fn operand_mismatch_is_reported_with_operator() {
  let diagnostics = common::analyze(|b| {
    let one = b.int(1);
    let text = b.str("a");
    let sum = b.binary(ASTBinaryOperator::Add, one, text);
    let decl = b.let_("x", sum);
    b.root(decl);
  })
  .unwrap_err();

  assert_eq!(diagnostics[0].kind, ErrorKind::TypeMismatch);
  assert_eq!(diagnostics[0].message, "Operator '+' cannot be applied to 'int' and 'str'");
}

#[test]
fn conditions_must_be_boolean() {
  let codes = common::error_codes(|b| {
    let one = b.int(1);
    let two = b.int(2);
    let body = b.expr_stmt(two);
    let stmt = b.if_(one, vec![body], None);
    b.root(stmt);
  });

  assert_eq!(codes, vec!["RR0008"]);
}

#[test]
fn loop_control_and_return_need_context() {
  let codes = common::error_codes(|b| {
    let brk = b.break_();
    let nxt = b.next();
    let one = b.int(1);
    let ret = b.ret(Some(one));
    b.root(brk);
    b.root(nxt);
    b.root(ret);
  });

  assert_eq!(codes, vec!["RR0016", "RR0016", "RR0017"]);
}

#[test]
fn nested_functions_are_unsupported() {
  let diagnostics = common::analyze(|b| {
    let inner = b.function("inner", &[], vec![]);
    let outer = b.function("outer", &[], vec![inner]);
    b.root(outer);
  })
  .unwrap_err();

  assert_eq!(diagnostics.len(), 1);
  assert_eq!(diagnostics[0].kind, ErrorKind::UnsupportedConstruct);
}

#[test]
fn functions_are_hoisted() {
  let hir = common::analyze_ok(|b| {
    let two = b.int(2);
    let call = b.call("double", vec![two]);
    let print = b.call("print", vec![call]);
    let stmt = b.expr_stmt(print);
    b.root(stmt);

    let x = b.var("x");
    let two = b.int(2);
    let product = b.binary(ASTBinaryOperator::Multiply, x, two);
    let tail = b.expr_stmt(product);
    let f = b.function_typed("double", vec![("x", Some(Type::Int))], Some(Type::Int), vec![tail]);
    b.root(f);
  });

  assert_eq!(hir.items.len(), 2);
  assert_eq!(hir.function_name(hir.items[0]), "double");
  assert_eq!(hir.function_name(hir.items[1]), ".rr_main");
  assert_eq!(hir.entry, Some(hir.items[1]));
}

#[test]
fn functions_do_not_see_entry_locals() {
  let codes = common::error_codes(|b| {
    let one = b.int(1);
    let decl = b.let_("secret", one);
    b.root(decl);

    let secret = b.var("secret");
    let ret = b.ret(Some(secret));
    let f = b.function("leak", &[], vec![ret]);
    b.root(f);
  });

  assert_eq!(codes, vec!["RR0001"]);
}

#[test]
fn call_arity_and_argument_types_are_checked() {
  let codes = common::error_codes(|b| {
    let x = b.var("x");
    let tail = b.expr_stmt(x);
    let f = b.function_typed("id", vec![("x", Some(Type::Int))], Some(Type::Int), vec![tail]);
    b.root(f);

    let call = b.call("id", vec![]);
    let stmt = b.expr_stmt(call);
    b.root(stmt);

    let text = b.str("no");
    let call = b.call("id", vec![text]);
    let stmt = b.expr_stmt(call);
    b.root(stmt);

    let a = b.int(1);
    let c = b.int(2);
    let call = b.call("sqrt", vec![a, c]);
    let stmt = b.expr_stmt(call);
    b.root(stmt);
  });

  assert_eq!(codes, vec!["RR0010", "RR0011", "RR0010"]);
}

#[test]
fn every_error_of_a_unit_is_collected_in_order() {
  let diagnostics = common::analyze(|b| {
    let a = b.var("a");
    let first = b.expr_stmt(a);
    let brk = b.break_();
    let c = b.var("c");
    let third = b.expr_stmt(c);
    b.root(first);
    b.root(brk);
    b.root(third);
  })
  .unwrap_err();

  let codes: Vec<_> = diagnostics.iter().map(|d| d.error_code.as_str()).collect();
  assert_eq!(codes, vec!["RR0001", "RR0016", "RR0001"]);
  assert!(diagnostics.windows(2).all(|w| w[0].primary_span.start < w[1].primary_span.start));
}

#[test]
fn void_results_cannot_be_bound() {
  let codes = common::error_codes(|b| {
    let one = b.int(1);
    let call = b.call("print", vec![one]);
    let decl = b.let_("x", call);
    b.root(decl);
  });

  assert_eq!(codes, vec!["RR0013"]);
}

#[test]
fn int_widens_into_float_binding() {
  common::analyze_ok(|b| {
    let one = b.float(1.5);
    let decl = b.let_mut("x", one);
    let two = b.int(2);
    let assign = b.assign("x", two);
    b.root(decl);
    b.root(assign);
  });
}
