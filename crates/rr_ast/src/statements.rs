use rr_type::{span::Span, types::Type};

use crate::NodeId;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ASTAssignOperator {
  Assign,
  AddAssign,
  SubtractAssign,
  MultiplyAssign,
  DivideAssign,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ASTAssignTarget {
  Name(String),
  Index { name: String, index: NodeId },
}

#[derive(Debug, PartialEq, Clone)]
pub enum ASTForIterable {
  /// Inclusive ascending range `start..end`.
  Range { start: NodeId, end: NodeId },
  Vector(NodeId),
}

#[derive(Debug, PartialEq, Clone)]
pub struct ASTParameter {
  pub name: String,
  pub type_annotation: Option<Type>,
  pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ASTFunction {
  pub name: String,
  pub parameters: Vec<ASTParameter>,
  pub return_type: Option<Type>,
  /// Always an [`ASTStatement::Block`].
  pub body: NodeId,
  pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ASTStatement {
  Expression {
    expression: NodeId,
    span: Span,
  },
  Let {
    name: String,
    mutable: bool,
    type_annotation: Option<Type>,
    value: Option<NodeId>,
    span: Span,
  },
  Assign {
    target: ASTAssignTarget,
    operator: ASTAssignOperator,
    value: NodeId,
    span: Span,
  },
  Function(ASTFunction),
  Block {
    statements: Vec<NodeId>,
    span: Span,
  },
  If {
    condition: NodeId,
    then_block: NodeId,
    else_block: Option<NodeId>,
    span: Span,
  },
  While {
    condition: NodeId,
    body: NodeId,
    span: Span,
  },
  For {
    variable: String,
    iterable: ASTForIterable,
    body: NodeId,
    span: Span,
  },
  Repeat {
    body: NodeId,
    span: Span,
  },
  Break {
    span: Span,
  },
  Next {
    span: Span,
  },
  Return {
    value: Option<NodeId>,
    span: Span,
  },
}

impl ASTStatement {
  pub fn span(&self) -> &Span {
    match self {
      ASTStatement::Expression { span, .. } => span,
      ASTStatement::Let { span, .. } => span,
      ASTStatement::Assign { span, .. } => span,
      ASTStatement::Function(function) => &function.span,
      ASTStatement::Block { span, .. } => span,
      ASTStatement::If { span, .. } => span,
      ASTStatement::While { span, .. } => span,
      ASTStatement::For { span, .. } => span,
      ASTStatement::Repeat { span, .. } => span,
      ASTStatement::Break { span } => span,
      ASTStatement::Next { span } => span,
      ASTStatement::Return { span, .. } => span,
    }
  }
}
