use rr_ast::{
  ASTNode, NodeId,
  statements::{ASTAssignOperator, ASTAssignTarget, ASTForIterable, ASTStatement},
};
use rr_diagnostics::message::DiagnosticMessage;
use rr_hir::{HIRId, HIRKind, operation::BinaryOperation};
use rr_type::{
  span::Span,
  symbol::{SymbolId, SymbolKind},
  types::Type,
  value::LiteralValue,
};

use crate::{HirBuilder, ScopeKind};

/// Result of lowering the last statement of a value-producing block.
enum Tail {
  Statement(HIRId),
  Value(HIRId),
}

impl<'a> HirBuilder<'a> {
  /// Lowers a function body block. The last statement becomes the block's value
  /// when it produces one, mirroring R's implicit return.
  pub(crate) fn lower_body(
    &mut self,
    block: &NodeId,
    want_value: bool,
  ) -> HIRId {
    let body = self.lower_block(block, want_value);

    if let HIRKind::Block {
      expression: Some(value), ..
    } = &self.hir.get(body).kind
    {
      let value = *value;
      let got = self.hir.get(value).ty;
      let expected = self.return_type.unwrap_or(Type::Any);
      if !expected.accepts(&got) {
        let span = self.hir.get(value).span.clone();
        self.report(DiagnosticMessage::ReturnTypeMismatch { expected, got, span });
      }
    }

    body
  }

  pub(crate) fn lower_statements(
    &mut self,
    statements: &[NodeId],
  ) -> Vec<HIRId> {
    statements.iter().map(|s| self.lower_statement(s)).collect()
  }

  fn lower_block(
    &mut self,
    block: &NodeId,
    want_value: bool,
  ) -> HIRId {
    let ast = self.ast;
    let node = ast.get(block);
    let span = node.span().clone();

    let statements: &[NodeId] = match node {
      ASTNode::Statement(ASTStatement::Block { statements, .. }) => statements,
      _ => std::slice::from_ref(block),
    };

    self.with_scope(ScopeKind::Block, |this| {
      let (lowered, value) = this.lower_block_contents(statements, want_value);
      let ty = value.map(|v| this.hir.get(v).ty).unwrap_or(Type::Void);
      this.alloc(
        HIRKind::Block {
          statements: lowered,
          expression: value,
        },
        span,
        ty,
      )
    })
  }

  fn lower_block_contents(
    &mut self,
    statements: &[NodeId],
    want_value: bool,
  ) -> (Vec<HIRId>, Option<HIRId>) {
    let Some((last, init)) = statements.split_last() else {
      return (Vec::new(), None);
    };

    let mut lowered = self.lower_statements(init);

    if !want_value {
      lowered.push(self.lower_statement(last));
      return (lowered, None);
    }

    match self.lower_tail(last) {
      Tail::Value(value) => (lowered, Some(value)),
      Tail::Statement(statement) => {
        lowered.push(statement);
        (lowered, None)
      },
    }
  }

  fn lower_tail(
    &mut self,
    node: &NodeId,
  ) -> Tail {
    let ast = self.ast;
    match ast.get(node) {
      ASTNode::Statement(ASTStatement::Expression { expression, span }) => {
        let value = self.lower_expression(expression);
        if self.hir.get(value).ty == Type::Void {
          Tail::Statement(self.alloc(HIRKind::ExpressionStatement(value), span.clone(), Type::Void))
        } else {
          Tail::Value(value)
        }
      },
      ASTNode::Statement(ASTStatement::If {
        condition,
        then_block,
        else_block: Some(else_block),
        span,
      }) => {
        let (id, has_value) = self.lower_if(condition, then_block, Some(else_block), span, true);
        if has_value { Tail::Value(id) } else { Tail::Statement(id) }
      },
      _ => Tail::Statement(self.lower_statement(node)),
    }
  }

  pub(crate) fn lower_statement(
    &mut self,
    node: &NodeId,
  ) -> HIRId {
    let ast = self.ast;
    let statement = match ast.get(node) {
      ASTNode::Statement(statement) => statement,
      ASTNode::Expression(expression) => {
        let span = expression.span().clone();
        let value = self.lower_expression(node);
        return self.alloc(HIRKind::ExpressionStatement(value), span, Type::Void);
      },
    };

    match statement {
      ASTStatement::Expression { expression, span } => {
        let value = self.lower_expression(expression);
        self.alloc(HIRKind::ExpressionStatement(value), span.clone(), Type::Void)
      },
      ASTStatement::Let {
        name,
        mutable,
        type_annotation,
        value,
        span,
      } => self.lower_let(name, *mutable, *type_annotation, value.as_ref(), span),
      ASTStatement::Assign {
        target,
        operator,
        value,
        span,
      } => self.lower_assign(target, *operator, value, span),
      ASTStatement::Function(function) => {
        self.report(DiagnosticMessage::NestedFunction {
          name: function.name.clone(),
          span: function.span.clone(),
        });
        self.error_node(function.span.clone())
      },
      ASTStatement::Block { .. } => self.lower_block(node, false),
      ASTStatement::If {
        condition,
        then_block,
        else_block,
        span,
      } => self.lower_if(condition, then_block, else_block.as_ref(), span, false).0,
      ASTStatement::While { condition, body, span } => {
        let condition = self.lower_condition(condition);
        let body = self.with_scope(ScopeKind::Loop, |this| this.lower_block(body, false));
        self.alloc(
          HIRKind::Loop {
            condition,
            body,
            update: None,
          },
          span.clone(),
          Type::Void,
        )
      },
      ASTStatement::For {
        variable,
        iterable,
        body,
        span,
      } => match iterable {
        ASTForIterable::Range { start, end } => self.lower_for_range(variable, start, end, body, span),
        ASTForIterable::Vector(vector) => self.lower_for_vector(variable, vector, body, span),
      },
      ASTStatement::Repeat { body, span } => {
        let condition = self.alloc(HIRKind::Literal(LiteralValue::Bool(true)), span.clone(), Type::Bool);
        let body = self.with_scope(ScopeKind::Loop, |this| this.lower_block(body, false));
        self.alloc(
          HIRKind::Loop {
            condition,
            body,
            update: None,
          },
          span.clone(),
          Type::Void,
        )
      },
      ASTStatement::Break { span } => self.lower_loop_control("break", HIRKind::Break, span),
      ASTStatement::Next { span } => self.lower_loop_control("next", HIRKind::Continue, span),
      ASTStatement::Return { value, span } => self.lower_return(value.as_ref(), span),
    }
  }

  fn lower_let(
    &mut self,
    name: &str,
    mutable: bool,
    type_annotation: Option<Type>,
    value: Option<&NodeId>,
    span: &Span,
  ) -> HIRId {
    // The initializer is resolved before the binding exists: `let x = x + 1`
    // reads the outer `x`.
    let value = value.map(|v| self.lower_value(v));
    let value_ty = value.map(|v| self.hir.get(v).ty);

    let ty = match (type_annotation, value_ty) {
      (Some(declared), Some(got)) => {
        if !declared.accepts(&got) {
          self.report(DiagnosticMessage::AssignmentTypeMismatch {
            name: name.to_string(),
            expected: declared,
            got,
            span: span.clone(),
          });
        }
        declared
      },
      (Some(declared), None) => declared,
      (None, Some(Type::Null)) | (None, None) => Type::Any,
      (None, Some(got)) => got,
    };

    let symbol = self.declare(name, ty, mutable, SymbolKind::Variable, span);
    self.alloc(HIRKind::Let { symbol, value }, span.clone(), Type::Void)
  }

  /// Resolves the target of an assignment and checks it may be written.
  fn resolve_assignable(
    &mut self,
    name: &str,
    span: &Span,
  ) -> Option<SymbolId> {
    let Some(symbol) = self.scopes.lookup(name) else {
      self.report(DiagnosticMessage::UndeclaredVariable {
        name: name.to_string(),
        span: span.clone(),
      });
      return None;
    };

    let sym = self.hir.symbols.get(&symbol);
    if sym.is_callable() || !sym.mutable {
      let declared_span = sym.span.clone();
      self.report(DiagnosticMessage::ImmutableAssignment {
        name: name.to_string(),
        span: span.clone(),
        declared_span,
      });
      return None;
    }

    Some(symbol)
  }

  fn lower_assign(
    &mut self,
    target: &ASTAssignTarget,
    operator: ASTAssignOperator,
    value: &NodeId,
    span: &Span,
  ) -> HIRId {
    let compound = compound_operation(operator);

    match target {
      ASTAssignTarget::Name(name) => {
        let symbol = self.resolve_assignable(name, span);
        let rhs = self.lower_value(value);
        let Some(symbol) = symbol else {
          return self.error_node(span.clone());
        };

        let target_ty = self.hir.symbols.get(&symbol).ty;
        let rhs = match compound {
          Some(operation) => {
            let current = self.alloc(HIRKind::Variable(symbol), span.clone(), target_ty);
            self.binary_node(operation, current, rhs, span)
          },
          None => rhs,
        };

        let got = self.hir.get(rhs).ty;
        if !target_ty.accepts(&got) {
          self.report(DiagnosticMessage::AssignmentTypeMismatch {
            name: name.clone(),
            expected: target_ty,
            got,
            span: span.clone(),
          });
        }

        self.alloc(HIRKind::Assign { target: symbol, value: rhs }, span.clone(), Type::Void)
      },
      ASTAssignTarget::Index { name, index } => {
        let symbol = self.resolve_assignable(name, span);
        self.with_scope(ScopeKind::Block, |this| this.lower_index_assign(symbol, index, compound, value, span))
      },
    }
  }

  fn lower_index_assign(
    &mut self,
    symbol: Option<SymbolId>,
    index: &NodeId,
    compound: Option<BinaryOperation>,
    value: &NodeId,
    span: &Span,
  ) -> HIRId {
    let index = self.lower_value(index);
    let Some(symbol) = symbol else {
      self.lower_value(value);
      return self.error_node(span.clone());
    };

    let target_ty = self.hir.symbols.get(&symbol).ty;
    let index_ty = self.hir.get(index).ty;
    if !matches!(target_ty, Type::Vector | Type::Any) || !(index_ty.is_numeric() || index_ty.is_any()) {
      self.report(DiagnosticMessage::IndexTypeMismatch {
        target: target_ty,
        index: index_ty,
        span: span.clone(),
      });
    }

    let mut prelude = Vec::new();
    let (index, rhs) = match compound {
      None => (index, self.lower_value(value)),
      Some(operation) => {
        // `x[i] op= v` reads and writes the same element; a non-trivial index is
        // evaluated once through a temporary.
        let (first, second) = if self.is_trivial(index) {
          (index, self.duplicate(index))
        } else {
          let temp = self.declare_hidden("idx", index_ty, false, span);
          prelude.push(self.alloc(
            HIRKind::Let {
              symbol: temp,
              value: Some(index),
            },
            span.clone(),
            Type::Void,
          ));
          (
            self.alloc(HIRKind::Variable(temp), span.clone(), index_ty),
            self.alloc(HIRKind::Variable(temp), span.clone(), index_ty),
          )
        };

        let base = self.alloc(HIRKind::Variable(symbol), span.clone(), target_ty);
        let current = self.alloc(HIRKind::Index { base, index: second }, span.clone(), Type::Any);
        let value = self.lower_value(value);
        (first, self.binary_node(operation, current, value, span))
      },
    };

    let assign = self.alloc(
      HIRKind::IndexAssign {
        target: symbol,
        index,
        value: rhs,
      },
      span.clone(),
      Type::Void,
    );

    if prelude.is_empty() {
      return assign;
    }

    prelude.push(assign);
    self.alloc(
      HIRKind::Block {
        statements: prelude,
        expression: None,
      },
      span.clone(),
      Type::Void,
    )
  }

  fn is_trivial(
    &self,
    node: HIRId,
  ) -> bool {
    matches!(self.hir.get(node).kind, HIRKind::Literal(_) | HIRKind::Variable(_))
  }

  fn duplicate(
    &mut self,
    node: HIRId,
  ) -> HIRId {
    let copy = self.hir.get(node).clone();
    self.hir.alloc(copy)
  }

  /// Returns the lowered node and whether it yields a value.
  fn lower_if(
    &mut self,
    condition: &NodeId,
    then_block: &NodeId,
    else_block: Option<&NodeId>,
    span: &Span,
    want_value: bool,
  ) -> (HIRId, bool) {
    let condition = self.lower_condition(condition);
    let then_branch = self.lower_block(then_block, want_value);
    let else_branch = else_block.map(|e| self.lower_block(e, want_value));

    let then_ty = self.block_value_type(then_branch);
    let else_ty = else_branch.and_then(|e| self.block_value_type(e));

    let ty = match (then_ty, else_ty) {
      (Some(a), Some(b)) => a.join(&b),
      _ => Type::Void,
    };

    let id = self.alloc(
      HIRKind::If {
        condition,
        then_branch,
        else_branch,
      },
      span.clone(),
      ty,
    );

    (id, ty != Type::Void)
  }

  fn block_value_type(
    &self,
    block: HIRId,
  ) -> Option<Type> {
    match &self.hir.get(block).kind {
      HIRKind::Block {
        expression: Some(value), ..
      } => Some(self.hir.get(*value).ty),
      _ => None,
    }
  }

  fn lower_for_range(
    &mut self,
    variable: &str,
    start: &NodeId,
    end: &NodeId,
    body: &NodeId,
    span: &Span,
  ) -> HIRId {
    self.with_scope(ScopeKind::Block, |this| {
      let start = this.lower_value(start);
      let end = this.lower_value(end);
      let start_ty = this.hir.get(start).ty;
      let end_ty = this.hir.get(end).ty;

      let valid = |t: Type| t.is_numeric() || t.is_any();
      if !valid(start_ty) || !valid(end_ty) {
        this.report(DiagnosticMessage::BinaryTypeMismatch {
          operator: "..".to_string(),
          left: start_ty,
          right: end_ty,
          span: span.clone(),
        });
      }

      let ty = start_ty.join(&end_ty);
      let end_symbol = this.declare_hidden("end", end_ty, false, span);
      let end_let = this.alloc(
        HIRKind::Let {
          symbol: end_symbol,
          value: Some(end),
        },
        span.clone(),
        Type::Void,
      );
      let counter = this.declare_hidden("iter", ty, true, span);
      let counter_let = this.alloc(
        HIRKind::Let {
          symbol: counter,
          value: Some(start),
        },
        span.clone(),
        Type::Void,
      );

      let left = this.alloc(HIRKind::Variable(counter), span.clone(), ty);
      let right = this.alloc(HIRKind::Variable(end_symbol), span.clone(), end_ty);
      let condition = this.alloc(
        HIRKind::Binary {
          operation: BinaryOperation::LessEqual,
          left,
          right,
        },
        span.clone(),
        Type::Bool,
      );

      let body = this.with_scope(ScopeKind::Loop, |this| {
        let current = this.alloc(HIRKind::Variable(counter), span.clone(), ty);
        this.lower_loop_body(variable, current, ty, body, span)
      });

      let update = this.increment(counter, ty, span);
      let lowered = this.alloc(
        HIRKind::Loop {
          condition,
          body,
          update: Some(update),
        },
        span.clone(),
        Type::Void,
      );

      this.alloc(
        HIRKind::Block {
          statements: vec![end_let, counter_let, lowered],
          expression: None,
        },
        span.clone(),
        Type::Void,
      )
    })
  }

  fn lower_for_vector(
    &mut self,
    variable: &str,
    vector: &NodeId,
    body: &NodeId,
    span: &Span,
  ) -> HIRId {
    self.with_scope(ScopeKind::Block, |this| {
      let sequence = this.lower_value(vector);
      let sequence_ty = this.hir.get(sequence).ty;
      if !matches!(sequence_ty, Type::Vector | Type::Any) {
        this.report(DiagnosticMessage::IndexTypeMismatch {
          target: sequence_ty,
          index: Type::Int,
          span: span.clone(),
        });
      }

      let Some(length) = this.builtin("length") else {
        this.report(DiagnosticMessage::UndeclaredFunction {
          name: "length".to_string(),
          span: span.clone(),
        });
        return this.error_node(span.clone());
      };

      let seq_symbol = this.declare_hidden("seq", sequence_ty, false, span);
      let seq_let = this.alloc(
        HIRKind::Let {
          symbol: seq_symbol,
          value: Some(sequence),
        },
        span.clone(),
        Type::Void,
      );
      let counter = this.declare_hidden("idx", Type::Int, true, span);
      let one = this.alloc(HIRKind::Literal(LiteralValue::Int(1)), span.clone(), Type::Int);
      let counter_let = this.alloc(
        HIRKind::Let {
          symbol: counter,
          value: Some(one),
        },
        span.clone(),
        Type::Void,
      );

      let left = this.alloc(HIRKind::Variable(counter), span.clone(), Type::Int);
      let seq_ref = this.alloc(HIRKind::Variable(seq_symbol), span.clone(), sequence_ty);
      let right = this.alloc(
        HIRKind::Call {
          callee: length,
          args: vec![seq_ref],
        },
        span.clone(),
        Type::Int,
      );
      let condition = this.alloc(
        HIRKind::Binary {
          operation: BinaryOperation::LessEqual,
          left,
          right,
        },
        span.clone(),
        Type::Bool,
      );

      let body = this.with_scope(ScopeKind::Loop, |this| {
        let base = this.alloc(HIRKind::Variable(seq_symbol), span.clone(), sequence_ty);
        let index = this.alloc(HIRKind::Variable(counter), span.clone(), Type::Int);
        let element = this.alloc(HIRKind::Index { base, index }, span.clone(), Type::Any);
        this.lower_loop_body(variable, element, Type::Any, body, span)
      });

      let update = this.increment(counter, Type::Int, span);
      let lowered = this.alloc(
        HIRKind::Loop {
          condition,
          body,
          update: Some(update),
        },
        span.clone(),
        Type::Void,
      );

      this.alloc(
        HIRKind::Block {
          statements: vec![seq_let, counter_let, lowered],
          expression: None,
        },
        span.clone(),
        Type::Void,
      )
    })
  }

  /// `{ let <variable> = <current>; <body> }`, inside the loop frame.
  fn lower_loop_body(
    &mut self,
    variable: &str,
    current: HIRId,
    ty: Type,
    body: &NodeId,
    span: &Span,
  ) -> HIRId {
    let symbol = self.declare(variable, ty, false, SymbolKind::Variable, span);
    let binding = self.alloc(
      HIRKind::Let {
        symbol,
        value: Some(current),
      },
      span.clone(),
      Type::Void,
    );
    let inner = self.lower_block(body, false);

    self.alloc(
      HIRKind::Block {
        statements: vec![binding, inner],
        expression: None,
      },
      span.clone(),
      Type::Void,
    )
  }

  fn increment(
    &mut self,
    counter: SymbolId,
    ty: Type,
    span: &Span,
  ) -> HIRId {
    let current = self.alloc(HIRKind::Variable(counter), span.clone(), ty);
    let one = self.alloc(HIRKind::Literal(LiteralValue::Int(1)), span.clone(), Type::Int);
    let next = self.alloc(
      HIRKind::Binary {
        operation: BinaryOperation::Add,
        left: current,
        right: one,
      },
      span.clone(),
      ty,
    );
    self.alloc(
      HIRKind::Assign {
        target: counter,
        value: next,
      },
      span.clone(),
      Type::Void,
    )
  }

  fn builtin(
    &self,
    name: &str,
  ) -> Option<SymbolId> {
    self.hir.symbols.builtins().find(|(_, s)| s.name == name).map(|(id, _)| id)
  }

  fn lower_loop_control(
    &mut self,
    keyword: &'static str,
    kind: HIRKind,
    span: &Span,
  ) -> HIRId {
    if !self.scopes.in_loop() {
      self.report(DiagnosticMessage::LoopControlOutsideLoop {
        keyword,
        span: span.clone(),
      });
      return self.error_node(span.clone());
    }

    self.alloc(kind, span.clone(), Type::Void)
  }

  fn lower_return(
    &mut self,
    value: Option<&NodeId>,
    span: &Span,
  ) -> HIRId {
    let value = value.map(|v| self.lower_value(v));

    if !self.scopes.in_function() {
      self.report(DiagnosticMessage::ReturnOutsideFunction(span.clone()));
      return self.error_node(span.clone());
    }

    if let Some(value) = value {
      let expected = self.return_type.unwrap_or(Type::Any);
      let got = self.hir.get(value).ty;
      if expected == Type::Void || !expected.accepts(&got) {
        self.report(DiagnosticMessage::ReturnTypeMismatch {
          expected,
          got,
          span: span.clone(),
        });
      }
    }

    self.alloc(HIRKind::Return(value), span.clone(), Type::Void)
  }
}

fn compound_operation(operator: ASTAssignOperator) -> Option<BinaryOperation> {
  match operator {
    ASTAssignOperator::Assign => None,
    ASTAssignOperator::AddAssign => Some(BinaryOperation::Add),
    ASTAssignOperator::SubtractAssign => Some(BinaryOperation::Sub),
    ASTAssignOperator::MultiplyAssign => Some(BinaryOperation::Mul),
    ASTAssignOperator::DivideAssign => Some(BinaryOperation::Div),
  }
}
