//! Programmatic AST construction.
//!
//! Front-ends and tests build units through [`ASTBuilder`]. Every node receives a
//! distinct one-byte span in creation order, so diagnostics stay ordered and
//! distinguishable even without real source text.

use rr_type::{BytePosition, file::FileId, span::Span, types::Type, value::LiteralValue};

use crate::{
  ASTNode, ASTProgram, NodeId,
  expressions::{ASTBinary, ASTBinaryOperator, ASTCall, ASTExpression, ASTUnaryOperator},
  statements::{ASTAssignOperator, ASTAssignTarget, ASTForIterable, ASTFunction, ASTParameter, ASTStatement},
};

pub struct ASTBuilder {
  program: ASTProgram,
  cursor: u32,
}

impl ASTBuilder {
  pub fn new(file: FileId) -> Self {
    Self {
      program: ASTProgram::new(file),
      cursor: 0,
    }
  }

  pub fn finish(self) -> ASTProgram {
    self.program
  }

  /// Appends a top-level statement.
  pub fn root(
    &mut self,
    statement: NodeId,
  ) -> NodeId {
    self.program.roots.push(statement);
    statement
  }

  fn next_span(&mut self) -> Span {
    let start = self.cursor;
    self.cursor += 1;
    Span::new(self.program.file, BytePosition(start), BytePosition(start + 1))
  }

  fn expr(
    &mut self,
    make: impl FnOnce(Span) -> ASTExpression,
  ) -> NodeId {
    let span = self.next_span();
    self.program.nodes.alloc(ASTNode::Expression(make(span)))
  }

  fn stmt(
    &mut self,
    make: impl FnOnce(Span) -> ASTStatement,
  ) -> NodeId {
    let span = self.next_span();
    self.program.nodes.alloc(ASTNode::Statement(make(span)))
  }

  pub fn literal(
    &mut self,
    value: LiteralValue,
  ) -> NodeId {
    self.expr(|span| ASTExpression::Literal { value, span })
  }

  pub fn int(
    &mut self,
    value: i64,
  ) -> NodeId {
    self.literal(LiteralValue::Int(value))
  }

  pub fn float(
    &mut self,
    value: f64,
  ) -> NodeId {
    self.literal(LiteralValue::float(value))
  }

  pub fn bool(
    &mut self,
    value: bool,
  ) -> NodeId {
    self.literal(LiteralValue::Bool(value))
  }

  pub fn str(
    &mut self,
    value: &str,
  ) -> NodeId {
    self.literal(LiteralValue::Str(value.to_string()))
  }

  pub fn var(
    &mut self,
    name: &str,
  ) -> NodeId {
    let name = name.to_string();
    self.expr(|span| ASTExpression::Variable { name, span })
  }

  pub fn binary(
    &mut self,
    operator: ASTBinaryOperator,
    left: NodeId,
    right: NodeId,
  ) -> NodeId {
    self.expr(|span| {
      ASTExpression::Binary(ASTBinary {
        left,
        right,
        operator,
        span,
      })
    })
  }

  pub fn unary(
    &mut self,
    operator: ASTUnaryOperator,
    operand: NodeId,
  ) -> NodeId {
    self.expr(|span| ASTExpression::Unary { operator, operand, span })
  }

  pub fn call(
    &mut self,
    callee: &str,
    arguments: Vec<NodeId>,
  ) -> NodeId {
    let callee_span = self.next_span();
    let callee = callee.to_string();
    self.expr(|span| {
      ASTExpression::Call(ASTCall {
        callee,
        callee_span,
        arguments,
        span,
      })
    })
  }

  pub fn index(
    &mut self,
    target: NodeId,
    index: NodeId,
  ) -> NodeId {
    self.expr(|span| ASTExpression::Index { target, index, span })
  }

  pub fn vector(
    &mut self,
    items: Vec<NodeId>,
  ) -> NodeId {
    self.expr(|span| ASTExpression::Vector { items, span })
  }

  pub fn cast(
    &mut self,
    expression: NodeId,
    target: Type,
  ) -> NodeId {
    self.expr(|span| ASTExpression::Cast { expression, target, span })
  }

  pub fn expr_stmt(
    &mut self,
    expression: NodeId,
  ) -> NodeId {
    self.stmt(|span| ASTStatement::Expression { expression, span })
  }

  pub fn let_(
    &mut self,
    name: &str,
    value: NodeId,
  ) -> NodeId {
    self.let_full(name, false, None, Some(value))
  }

  pub fn let_mut(
    &mut self,
    name: &str,
    value: NodeId,
  ) -> NodeId {
    self.let_full(name, true, None, Some(value))
  }

  pub fn let_full(
    &mut self,
    name: &str,
    mutable: bool,
    type_annotation: Option<Type>,
    value: Option<NodeId>,
  ) -> NodeId {
    let name = name.to_string();
    self.stmt(|span| ASTStatement::Let {
      name,
      mutable,
      type_annotation,
      value,
      span,
    })
  }

  pub fn assign(
    &mut self,
    name: &str,
    value: NodeId,
  ) -> NodeId {
    self.assign_op(name, ASTAssignOperator::Assign, value)
  }

  pub fn assign_op(
    &mut self,
    name: &str,
    operator: ASTAssignOperator,
    value: NodeId,
  ) -> NodeId {
    let target = ASTAssignTarget::Name(name.to_string());
    self.stmt(|span| ASTStatement::Assign {
      target,
      operator,
      value,
      span,
    })
  }

  pub fn assign_index(
    &mut self,
    name: &str,
    index: NodeId,
    operator: ASTAssignOperator,
    value: NodeId,
  ) -> NodeId {
    let target = ASTAssignTarget::Index {
      name: name.to_string(),
      index,
    };
    self.stmt(|span| ASTStatement::Assign {
      target,
      operator,
      value,
      span,
    })
  }

  pub fn block(
    &mut self,
    statements: Vec<NodeId>,
  ) -> NodeId {
    self.stmt(|span| ASTStatement::Block { statements, span })
  }

  /// Untyped function; parameters and result are `any`.
  pub fn function(
    &mut self,
    name: &str,
    parameters: &[&str],
    body: Vec<NodeId>,
  ) -> NodeId {
    let parameters = parameters.iter().map(|p| (*p, None)).collect();
    self.function_typed(name, parameters, None, body)
  }

  pub fn function_typed(
    &mut self,
    name: &str,
    parameters: Vec<(&str, Option<Type>)>,
    return_type: Option<Type>,
    body: Vec<NodeId>,
  ) -> NodeId {
    let parameters = parameters
      .into_iter()
      .map(|(name, type_annotation)| ASTParameter {
        name: name.to_string(),
        type_annotation,
        span: self.next_span(),
      })
      .collect();
    let body = self.block(body);
    let name = name.to_string();

    self.stmt(|span| {
      ASTStatement::Function(ASTFunction {
        name,
        parameters,
        return_type,
        body,
        span,
      })
    })
  }

  pub fn if_(
    &mut self,
    condition: NodeId,
    then_body: Vec<NodeId>,
    else_body: Option<Vec<NodeId>>,
  ) -> NodeId {
    let then_block = self.block(then_body);
    let else_block = else_body.map(|body| self.block(body));
    self.stmt(|span| ASTStatement::If {
      condition,
      then_block,
      else_block,
      span,
    })
  }

  pub fn while_(
    &mut self,
    condition: NodeId,
    body: Vec<NodeId>,
  ) -> NodeId {
    let body = self.block(body);
    self.stmt(|span| ASTStatement::While { condition, body, span })
  }

  pub fn for_range(
    &mut self,
    variable: &str,
    start: NodeId,
    end: NodeId,
    body: Vec<NodeId>,
  ) -> NodeId {
    self.for_(variable, ASTForIterable::Range { start, end }, body)
  }

  pub fn for_in(
    &mut self,
    variable: &str,
    vector: NodeId,
    body: Vec<NodeId>,
  ) -> NodeId {
    self.for_(variable, ASTForIterable::Vector(vector), body)
  }

  fn for_(
    &mut self,
    variable: &str,
    iterable: ASTForIterable,
    body: Vec<NodeId>,
  ) -> NodeId {
    let body = self.block(body);
    let variable = variable.to_string();
    self.stmt(|span| ASTStatement::For {
      variable,
      iterable,
      body,
      span,
    })
  }

  pub fn repeat(
    &mut self,
    body: Vec<NodeId>,
  ) -> NodeId {
    let body = self.block(body);
    self.stmt(|span| ASTStatement::Repeat { body, span })
  }

  pub fn break_(&mut self) -> NodeId {
    self.stmt(|span| ASTStatement::Break { span })
  }

  pub fn next(&mut self) -> NodeId {
    self.stmt(|span| ASTStatement::Next { span })
  }

  pub fn ret(
    &mut self,
    value: Option<NodeId>,
  ) -> NodeId {
    self.stmt(|span| ASTStatement::Return { value, span })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn spans_follow_creation_order() {
    let mut b = ASTBuilder::new(FileId::new(0));
    let one = b.int(1);
    let two = b.int(2);
    let sum = b.binary(ASTBinaryOperator::Add, one, two);
    let stmt = b.expr_stmt(sum);
    b.root(stmt);

    let program = b.finish();
    assert_eq!(program.roots, vec![stmt]);
    assert!(program.get(&one).span().start < program.get(&two).span().start);
    assert!(program.get(&two).span().start < program.get(&sum).span().start);
  }
}
