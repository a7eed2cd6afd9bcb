use rr_type::{span::Span, types::Type, value::LiteralValue};

use crate::NodeId;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ASTBinaryOperator {
  Add,
  Subtract,
  Multiply,
  Divide,
  /// R's `%%`.
  Modulo,
  Power,
  Equal,
  NotEqual,
  LessThan,
  LessThanOrEqual,
  GreaterThan,
  GreaterThanOrEqual,
  And,
  Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ASTUnaryOperator {
  Negate,
  Not,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ASTBinary {
  pub left: NodeId,
  pub right: NodeId,
  pub operator: ASTBinaryOperator,
  pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ASTCall {
  pub callee: String,
  pub callee_span: Span,
  pub arguments: Vec<NodeId>,
  pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ASTExpression {
  Literal {
    value: LiteralValue,
    span: Span,
  },
  Variable {
    name: String,
    span: Span,
  },
  Binary(ASTBinary),
  Unary {
    operator: ASTUnaryOperator,
    operand: NodeId,
    span: Span,
  },
  Call(ASTCall),
  Index {
    target: NodeId,
    index: NodeId,
    span: Span,
  },
  Vector {
    items: Vec<NodeId>,
    span: Span,
  },
  Cast {
    expression: NodeId,
    target: Type,
    span: Span,
  },
}

impl ASTExpression {
  pub fn span(&self) -> &Span {
    match self {
      ASTExpression::Literal { span, .. } => span,
      ASTExpression::Variable { span, .. } => span,
      ASTExpression::Binary(binary) => &binary.span,
      ASTExpression::Unary { span, .. } => span,
      ASTExpression::Call(call) => &call.span,
      ASTExpression::Index { span, .. } => span,
      ASTExpression::Vector { span, .. } => span,
      ASTExpression::Cast { span, .. } => span,
    }
  }
}
