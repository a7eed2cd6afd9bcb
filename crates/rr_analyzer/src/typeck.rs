use rr_ast::{
  ASTNode, NodeId,
  expressions::{ASTBinaryOperator, ASTCall, ASTExpression, ASTUnaryOperator},
};
use rr_diagnostics::message::DiagnosticMessage;
use rr_hir::{
  HIRId, HIRKind,
  operation::{BinaryOperation, UnaryOperation},
};
use rr_type::{span::Span, symbol::SymbolKind, types::Type};

use crate::HirBuilder;

/// Result type of a binary operation, or `None` when the operands are rejected.
pub(crate) fn binary_result_type(
  operation: BinaryOperation,
  left: Type,
  right: Type,
) -> Option<Type> {
  if left == Type::Void || right == Type::Void {
    return None;
  }

  if operation.is_short_circuit() {
    return (left.is_boolean_like() && right.is_boolean_like()).then_some(Type::Bool);
  }

  if operation.is_arithmetic() {
    if !left.is_arithmetic() || !right.is_arithmetic() {
      return None;
    }
    let joined = left.join(&right);
    let ty = match (operation, joined) {
      (_, Type::Vector) | (_, Type::Any) => joined,
      (BinaryOperation::Div | BinaryOperation::Pow, _) => Type::Float,
      _ => joined,
    };
    return Some(ty);
  }

  let vector = left == Type::Vector || right == Type::Vector;
  let compatible = match operation {
    BinaryOperation::Equal | BinaryOperation::NotEqual => {
      left == right || left.is_any() || right.is_any() || left.join(&right) != Type::Any
    },
    _ => {
      let ordered = |t: Type| t.is_arithmetic() || t == Type::Str;
      ordered(left) && ordered(right) && (left.is_any() || right.is_any() || (left == Type::Str) == (right == Type::Str))
    },
  };

  compatible.then_some(if vector { Type::Vector } else { Type::Bool })
}

fn cast_allowed(
  from: Type,
  to: Type,
) -> bool {
  match (from, to) {
    (Type::Void, _) | (_, Type::Void) => false,
    (_, Type::Any) | (Type::Any, _) => true,
    (_, Type::Vector) => true,
    (Type::Null, _) => false,
    (Type::Vector, t) => t == Type::Vector,
    (_, Type::Int | Type::Float | Type::Bool | Type::Str) => true,
    _ => false,
  }
}

fn binary_operation(operator: ASTBinaryOperator) -> BinaryOperation {
  match operator {
    ASTBinaryOperator::Add => BinaryOperation::Add,
    ASTBinaryOperator::Subtract => BinaryOperation::Sub,
    ASTBinaryOperator::Multiply => BinaryOperation::Mul,
    ASTBinaryOperator::Divide => BinaryOperation::Div,
    ASTBinaryOperator::Modulo => BinaryOperation::Mod,
    ASTBinaryOperator::Power => BinaryOperation::Pow,
    ASTBinaryOperator::Equal => BinaryOperation::Equal,
    ASTBinaryOperator::NotEqual => BinaryOperation::NotEqual,
    ASTBinaryOperator::LessThan => BinaryOperation::LessThan,
    ASTBinaryOperator::LessThanOrEqual => BinaryOperation::LessEqual,
    ASTBinaryOperator::GreaterThan => BinaryOperation::GreaterThan,
    ASTBinaryOperator::GreaterThanOrEqual => BinaryOperation::GreaterEqual,
    ASTBinaryOperator::And => BinaryOperation::And,
    ASTBinaryOperator::Or => BinaryOperation::Or,
  }
}

impl<'a> HirBuilder<'a> {
  /// Lowers an expression whose value is used.
  pub(crate) fn lower_value(
    &mut self,
    node: &NodeId,
  ) -> HIRId {
    let value = self.lower_expression(node);
    let lowered = self.hir.get(value);

    if lowered.ty == Type::Void {
      let span = lowered.span.clone();
      self.report(DiagnosticMessage::VoidValue(span.clone()));
      return self.error_node(span);
    }

    value
  }

  pub(crate) fn lower_condition(
    &mut self,
    node: &NodeId,
  ) -> HIRId {
    let condition = self.lower_value(node);
    let lowered = self.hir.get(condition);

    if !lowered.ty.is_boolean_like() {
      let (got, span) = (lowered.ty, lowered.span.clone());
      self.report(DiagnosticMessage::ConditionNotBoolean { got, span });
    }

    condition
  }

  /// Type-checks and allocates `left <op> right`.
  pub(crate) fn binary_node(
    &mut self,
    operation: BinaryOperation,
    left: HIRId,
    right: HIRId,
    span: &Span,
  ) -> HIRId {
    let left_ty = self.hir.get(left).ty;
    let right_ty = self.hir.get(right).ty;

    let ty = match binary_result_type(operation, left_ty, right_ty) {
      Some(ty) => ty,
      None => {
        self.report(DiagnosticMessage::BinaryTypeMismatch {
          operator: operation.r_symbol().to_string(),
          left: left_ty,
          right: right_ty,
          span: span.clone(),
        });
        Type::Any
      },
    };

    self.alloc(HIRKind::Binary { operation, left, right }, span.clone(), ty)
  }

  pub(crate) fn lower_expression(
    &mut self,
    node: &NodeId,
  ) -> HIRId {
    let ast = self.ast;
    let expression = match ast.get(node) {
      ASTNode::Expression(expression) => expression,
      ASTNode::Statement(_) => return self.lower_statement(node),
    };

    match expression {
      ASTExpression::Literal { value, span } => self.alloc(HIRKind::Literal(value.clone()), span.clone(), value.ty()),
      ASTExpression::Variable { name, span } => match self.scopes.lookup(name) {
        Some(symbol) if !self.hir.symbols.get(&symbol).is_callable() => {
          let ty = self.hir.symbols.get(&symbol).ty;
          self.alloc(HIRKind::Variable(symbol), span.clone(), ty)
        },
        _ => {
          self.report(DiagnosticMessage::UndeclaredVariable {
            name: name.clone(),
            span: span.clone(),
          });
          self.error_node(span.clone())
        },
      },
      ASTExpression::Binary(binary) => {
        let left = self.lower_value(&binary.left);
        let right = self.lower_value(&binary.right);
        self.binary_node(binary_operation(binary.operator), left, right, &binary.span)
      },
      ASTExpression::Unary { operator, operand, span } => {
        let operand = self.lower_value(operand);
        let operand_ty = self.hir.get(operand).ty;

        let (operation, valid, ty) = match operator {
          ASTUnaryOperator::Negate => (UnaryOperation::Neg, operand_ty.is_arithmetic(), operand_ty),
          ASTUnaryOperator::Not => (UnaryOperation::Not, operand_ty.is_boolean_like(), Type::Bool),
        };

        if !valid {
          self.report(DiagnosticMessage::UnaryTypeMismatch {
            operator: operation.r_symbol().to_string(),
            operand: operand_ty,
            span: span.clone(),
          });
        }

        self.alloc(HIRKind::Unary { operation, operand }, span.clone(), ty)
      },
      ASTExpression::Call(call) => self.lower_call(call),
      ASTExpression::Index { target, index, span } => {
        let base = self.lower_value(target);
        let index = self.lower_value(index);
        let target_ty = self.hir.get(base).ty;
        let index_ty = self.hir.get(index).ty;

        if !matches!(target_ty, Type::Vector | Type::Any) || !(index_ty.is_numeric() || index_ty.is_any()) {
          self.report(DiagnosticMessage::IndexTypeMismatch {
            target: target_ty,
            index: index_ty,
            span: span.clone(),
          });
        }

        self.alloc(HIRKind::Index { base, index }, span.clone(), Type::Any)
      },
      ASTExpression::Vector { items, span } => {
        let elements = items.iter().map(|item| self.lower_value(item)).collect();
        self.alloc(HIRKind::Vector { elements }, span.clone(), Type::Vector)
      },
      ASTExpression::Cast {
        expression,
        target,
        span,
      } => {
        let value = self.lower_value(expression);
        let from = self.hir.get(value).ty;

        if !cast_allowed(from, *target) {
          self.report(DiagnosticMessage::InvalidCast {
            from,
            to: *target,
            span: span.clone(),
          });
        }

        self.alloc(
          HIRKind::Cast {
            expression: value,
            target: *target,
          },
          span.clone(),
          *target,
        )
      },
    }
  }

  fn lower_call(
    &mut self,
    call: &ASTCall,
  ) -> HIRId {
    let args: Vec<HIRId> = call.arguments.iter().map(|arg| self.lower_value(arg)).collect();

    let Some(callee) = self.scopes.lookup(&call.callee) else {
      self.report(DiagnosticMessage::UndeclaredFunction {
        name: call.callee.clone(),
        span: call.callee_span.clone(),
      });
      return self.error_node(call.span.clone());
    };

    let symbol = self.hir.symbols.get(&callee).clone();
    let ty = match &symbol.kind {
      SymbolKind::Function { params, ret } => {
        if params.len() != args.len() {
          self.report(DiagnosticMessage::ArgumentCountMismatch {
            name: symbol.name.clone(),
            expected: params.len(),
            got: args.len(),
            span: call.span.clone(),
          });
        } else {
          for (position, (expected, arg)) in params.iter().zip(&args).enumerate() {
            let arg = self.hir.get(*arg);
            if !expected.accepts(&arg.ty) {
              let (got, span) = (arg.ty, arg.span.clone());
              self.report(DiagnosticMessage::ArgumentTypeMismatch {
                name: symbol.name.clone(),
                position,
                expected: *expected,
                got,
                span,
              });
            }
          }
        }
        *ret
      },
      SymbolKind::Builtin { arity, ret } => {
        if let Some(expected) = arity {
          if *expected != args.len() {
            self.report(DiagnosticMessage::ArgumentCountMismatch {
              name: symbol.name.clone(),
              expected: *expected,
              got: args.len(),
              span: call.span.clone(),
            });
          }
        }
        *ret
      },
      SymbolKind::Variable | SymbolKind::Parameter => {
        self.report(DiagnosticMessage::NotCallable {
          name: symbol.name.clone(),
          span: call.callee_span.clone(),
        });
        return self.error_node(call.span.clone());
      },
    };

    self.alloc(HIRKind::Call { callee, args }, call.span.clone(), ty)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn division_and_power_produce_floats() {
    assert_eq!(binary_result_type(BinaryOperation::Div, Type::Int, Type::Int), Some(Type::Float));
    assert_eq!(binary_result_type(BinaryOperation::Pow, Type::Int, Type::Int), Some(Type::Float));
    assert_eq!(binary_result_type(BinaryOperation::Add, Type::Int, Type::Int), Some(Type::Int));
    assert_eq!(binary_result_type(BinaryOperation::Mod, Type::Int, Type::Float), Some(Type::Float));
  }

  #[test]
  fn logical_operators_require_booleans() {
    assert_eq!(binary_result_type(BinaryOperation::And, Type::Bool, Type::Any), Some(Type::Bool));
    assert_eq!(binary_result_type(BinaryOperation::Or, Type::Int, Type::Bool), None);
  }

  #[test]
  fn comparisons_reject_mixed_strings() {
    assert_eq!(binary_result_type(BinaryOperation::LessThan, Type::Int, Type::Float), Some(Type::Bool));
    assert_eq!(binary_result_type(BinaryOperation::LessThan, Type::Str, Type::Int), None);
    assert_eq!(binary_result_type(BinaryOperation::Equal, Type::Str, Type::Str), Some(Type::Bool));
    assert_eq!(binary_result_type(BinaryOperation::Equal, Type::Bool, Type::Int), None);
  }

  #[test]
  fn casts_from_null_are_rejected() {
    assert!(!cast_allowed(Type::Null, Type::Int));
    assert!(cast_allowed(Type::Int, Type::Str));
    assert!(cast_allowed(Type::Null, Type::Vector));
  }
}
