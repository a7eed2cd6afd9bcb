mod builder;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rr_diagnostics::{diagnostic_report::Diagnostic, message::DiagnosticMessage};
use rr_hir::{
  HIR, HIRId, HIRKind,
  operation::{BinaryOperation, UnaryOperation},
};
use rr_type::{span::Span, symbol::SymbolId, types::Type, value::LiteralValue};

use crate::{BlockId, FunctionMir, Instr, MirProgram, Operand, ParamData, SlotData, SlotId, Terminator, ValueId};

pub use builder::FunctionBuilder;

/// HIR handed to lowering contained something the builder never produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweringError {
  pub function: String,
  pub detail: String,
  pub span: Span,
}

impl std::fmt::Display for LoweringError {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "cannot lower '{}': {}", self.function, self.detail)
  }
}

impl std::error::Error for LoweringError {}

impl From<LoweringError> for DiagnosticMessage {
  fn from(error: LoweringError) -> Self {
    DiagnosticMessage::LoweringInvariant {
      function: error.function,
      detail: error.detail,
      span: error.span,
    }
  }
}

/// Result of lowering one unit: the program plus non-fatal warnings.
#[derive(Debug, Clone)]
pub struct MirLowering {
  pub program: MirProgram,
  pub warnings: Vec<Diagnostic>,
}

pub fn lower_hir(hir: &HIR) -> Result<MirLowering, LoweringError> {
  LoweringContext::new(hir).lower()
}

/// Reaching definition of every SSA variable at the insertion point.
type Env = BTreeMap<SymbolId, Operand>;

/// A pending edge into a merge point: an open block, the definitions reaching
/// its end and the value it carries, if any.
struct Arrival {
  block: BlockId,
  env: Env,
  value: Option<Operand>,
}

#[derive(Default)]
struct LoopContext {
  breaks: Vec<Arrival>,
  continues: Vec<Arrival>,
}

pub struct LoweringContext<'a> {
  hir: &'a HIR,
  program: MirProgram,
  warnings: Vec<Diagnostic>,

  current_fn: Option<FunctionBuilder>,
  env: Env,
  /// Variables written through an index live in slots instead of SSA values.
  slot_of: HashMap<SymbolId, SlotId>,
  loop_stack: Vec<LoopContext>,
}

impl<'a> LoweringContext<'a> {
  pub fn new(hir: &'a HIR) -> Self {
    Self {
      hir,
      program: MirProgram::new(),
      warnings: Vec::new(),
      current_fn: None,
      env: Env::new(),
      slot_of: HashMap::new(),
      loop_stack: Vec::new(),
    }
  }

  pub fn lower(mut self) -> Result<MirLowering, LoweringError> {
    let hir = self.hir;
    for id in hir.functions() {
      let function = self.lower_function(id)?;
      self.program.functions.push(function);
      if hir.entry == Some(id) {
        self.program.entry = Some(self.program.functions.len() - 1);
      }
    }

    Ok(MirLowering {
      program: self.program,
      warnings: self.warnings,
    })
  }

  fn lower_function(
    &mut self,
    id: HIRId,
  ) -> Result<FunctionMir, LoweringError> {
    let hir = self.hir;
    let node = hir.get(id);
    let HIRKind::Function { symbol, params, body } = &node.kind else {
      return Err(LoweringError {
        function: "<unit>".to_string(),
        detail: "item is not a function".to_string(),
        span: node.span.clone(),
      });
    };

    let name = hir.symbols.name(symbol).to_string();
    let param_data = params
      .iter()
      .map(|p| {
        let symbol = hir.symbols.get(p);
        ParamData {
          name: symbol.name.clone(),
          ty: symbol.ty,
        }
      })
      .collect();

    self.current_fn = Some(FunctionBuilder::new(
      name,
      param_data,
      node.ty,
      hir.entry == Some(id),
      node.span.clone(),
    ));
    self.env.clear();
    self.slot_of.clear();
    self.loop_stack.clear();

    let mut indexed = BTreeSet::new();
    self.collect_index_targets(*body, &mut indexed);
    for symbol in &indexed {
      let data = hir.symbols.get(symbol);
      let slot = self.builder()?.alloc_slot(SlotData {
        name: data.name.clone(),
        symbol: *symbol,
        ty: data.ty,
      });
      self.slot_of.insert(*symbol, slot);
    }

    for (position, param) in params.iter().enumerate() {
      let argument = Operand::Param(position as u32);
      match self.slot_of.get(param).copied() {
        Some(slot) => self.builder()?.emit(Instr::Store { slot, value: argument }),
        None => {
          self.env.insert(*param, argument);
        },
      }
    }

    let value = self.lower_node(*body)?;

    let builder = self.builder()?;
    if !builder.is_dead() {
      let returned = if builder.is_entry() || builder.return_type() == Type::Void {
        None
      } else {
        value
      };
      builder.terminate(Terminator::Return(returned));
    }

    let mut function = match self.current_fn.take() {
      Some(builder) => builder.finish(),
      None => return Err(self.invariant("function builder vanished", &node.span)),
    };
    function.remove_trivial_phis();
    Ok(function)
  }

  fn builder(&mut self) -> Result<&mut FunctionBuilder, LoweringError> {
    match self.current_fn {
      Some(ref mut builder) => Ok(builder),
      None => Err(LoweringError {
        function: "<unit>".to_string(),
        detail: "no function is being lowered".to_string(),
        span: Span::default(),
      }),
    }
  }

  fn invariant(
    &self,
    detail: &str,
    span: &Span,
  ) -> LoweringError {
    LoweringError {
      function: self.current_fn.as_ref().map(|b| b.name().to_string()).unwrap_or_default(),
      detail: detail.to_string(),
      span: span.clone(),
    }
  }

  fn is_dead(&self) -> bool {
    self.current_fn.as_ref().map_or(true, FunctionBuilder::is_dead)
  }

  fn collect_index_targets(
    &self,
    id: HIRId,
    out: &mut BTreeSet<SymbolId>,
  ) {
    let mut children: Vec<HIRId> = Vec::new();
    match &self.hir.get(id).kind {
      HIRKind::IndexAssign { target, index, value } => {
        out.insert(*target);
        children.extend([*index, *value]);
      },
      HIRKind::Binary { left, right, .. } => children.extend([*left, *right]),
      HIRKind::Unary { operand, .. } => children.push(*operand),
      HIRKind::Call { args, .. } => children.extend(args.iter().copied()),
      HIRKind::Index { base, index } => children.extend([*base, *index]),
      HIRKind::Vector { elements } => children.extend(elements.iter().copied()),
      HIRKind::Cast { expression, .. } => children.push(*expression),
      HIRKind::Let { value, .. } => children.extend(value.iter().copied()),
      HIRKind::Assign { value, .. } => children.push(*value),
      HIRKind::Block { statements, expression } => {
        children.extend(statements.iter().copied());
        children.extend(expression.iter().copied());
      },
      HIRKind::If {
        condition,
        then_branch,
        else_branch,
      } => {
        children.extend([*condition, *then_branch]);
        children.extend(else_branch.iter().copied());
      },
      HIRKind::Loop { condition, body, update } => {
        children.extend([*condition, *body]);
        children.extend(update.iter().copied());
      },
      HIRKind::Return(value) => children.extend(value.iter().copied()),
      HIRKind::ExpressionStatement(expression) => children.push(*expression),
      HIRKind::Literal(_)
      | HIRKind::Variable(_)
      | HIRKind::Break
      | HIRKind::Continue
      | HIRKind::Function { .. }
      | HIRKind::Error => {},
    }

    for child in children {
      self.collect_index_targets(child, out);
    }
  }

  /// Lowers a node; returns the operand holding its value, if it has one and
  /// control still reaches the end of it.
  fn lower_node(
    &mut self,
    id: HIRId,
  ) -> Result<Option<Operand>, LoweringError> {
    if self.is_dead() {
      return Ok(None);
    }

    let hir = self.hir;
    let node = hir.get(id);
    let span = &node.span;

    match &node.kind {
      HIRKind::Literal(value) => Ok(Some(Operand::Const(value.clone()))),
      HIRKind::Variable(symbol) => self.lower_read(*symbol, span).map(Some),
      HIRKind::Binary { operation, left, right } => {
        if operation.is_short_circuit() {
          return self.lower_short_circuit(*operation, *left, *right, span);
        }
        self.lower_binary(*operation, *left, *right, node.ty, span)
      },
      HIRKind::Unary { operation, operand } => self.lower_unary(*operation, *operand, node.ty, span),
      HIRKind::Call { callee, args } => self.lower_call(*callee, args, node.ty, span),
      HIRKind::Index { base, index } => {
        let Some(base) = self.lower_node(*base)? else {
          return Ok(None);
        };
        let Some(index) = self.lower_node(*index)? else {
          return Ok(None);
        };
        let builder = self.builder()?;
        let dest = builder.alloc_value(node.ty, span.clone());
        builder.emit(Instr::Index { dest, base, index });
        Ok(Some(Operand::Value(dest)))
      },
      HIRKind::Vector { elements } => {
        let mut operands = Vec::with_capacity(elements.len());
        for element in elements {
          let Some(operand) = self.lower_node(*element)? else {
            return Ok(None);
          };
          operands.push(operand);
        }
        let builder = self.builder()?;
        let dest = builder.alloc_value(node.ty, span.clone());
        builder.emit(Instr::Vector {
          dest,
          elements: operands,
        });
        Ok(Some(Operand::Value(dest)))
      },
      HIRKind::Cast { expression, target } => {
        let Some(source) = self.lower_node(*expression)? else {
          return Ok(None);
        };
        let builder = self.builder()?;
        let dest = builder.alloc_value(*target, span.clone());
        builder.emit(Instr::Cast {
          dest,
          source,
          target: *target,
        });
        Ok(Some(Operand::Value(dest)))
      },
      HIRKind::Let { .. } | HIRKind::Assign { .. } => {
        self.lower_definition(id)?;
        Ok(None)
      },
      HIRKind::IndexAssign { target, index, value } => {
        let Some(index) = self.lower_node(*index)? else {
          return Ok(None);
        };
        let Some(value) = self.lower_node(*value)? else {
          return Ok(None);
        };
        let Some(slot) = self.slot_of.get(target).copied() else {
          return Err(self.invariant("indexed assignment to a variable without a slot", span));
        };
        self.builder()?.emit(Instr::StoreIndex { slot, index, value });
        Ok(None)
      },
      HIRKind::Block { statements, expression } => self.lower_block(statements, *expression),
      HIRKind::If {
        condition,
        then_branch,
        else_branch,
      } => self.lower_if(*condition, *then_branch, *else_branch, node.ty, span),
      HIRKind::Loop { condition, body, update } => {
        self.lower_loop(*condition, *body, *update, span)?;
        Ok(None)
      },
      HIRKind::Break | HIRKind::Continue => {
        let Some(block) = self.builder()?.current_block() else {
          return Ok(None);
        };
        let arrival = Arrival {
          block,
          env: self.env.clone(),
          value: None,
        };
        if self.loop_stack.is_empty() {
          return Err(self.invariant("loop control outside of a loop", span));
        }
        if let Some(context) = self.loop_stack.last_mut() {
          match node.kind {
            HIRKind::Break => context.breaks.push(arrival),
            _ => context.continues.push(arrival),
          }
        }
        self.builder()?.detach();
        Ok(None)
      },
      HIRKind::Return(value) => {
        let operand = match value {
          Some(value) => match self.lower_node(*value)? {
            Some(operand) => Some(operand),
            None if self.is_dead() => return Ok(None),
            None => None,
          },
          None => None,
        };
        let builder = self.builder()?;
        let operand = if builder.is_entry() { None } else { operand };
        builder.terminate(Terminator::Return(operand));
        Ok(None)
      },
      HIRKind::ExpressionStatement(expression) => {
        self.lower_node(*expression)?;
        Ok(None)
      },
      HIRKind::Function { .. } => Err(self.invariant("nested function definition", span)),
      HIRKind::Error => Err(self.invariant("error node survived name resolution", span)),
    }
  }

  fn lower_read(
    &mut self,
    symbol: SymbolId,
    span: &Span,
  ) -> Result<Operand, LoweringError> {
    if let Some(slot) = self.slot_of.get(&symbol).copied() {
      let builder = self.builder()?;
      let ty = builder.slot_type(slot);
      let dest = builder.alloc_value(ty, span.clone());
      builder.emit(Instr::Load { dest, slot });
      return Ok(Operand::Value(dest));
    }

    match self.env.get(&symbol) {
      Some(operand) => Ok(operand.clone()),
      None => {
        let name = self.hir.symbols.name(&symbol).to_string();
        Err(self.invariant(&format!("'{}' is read before any definition", name), span))
      },
    }
  }

  /// `Let` and `Assign`: a fresh SSA definition, or a store for slot variables.
  fn lower_definition(
    &mut self,
    id: HIRId,
  ) -> Result<(), LoweringError> {
    let node = self.hir.get(id);
    let (symbol, value) = match &node.kind {
      HIRKind::Let { symbol, value } => (*symbol, *value),
      HIRKind::Assign { target, value } => (*target, Some(*value)),
      _ => return Err(self.invariant("not a definition", &node.span)),
    };

    let operand = match value {
      Some(value) => match self.lower_node(value)? {
        Some(operand) => operand,
        None if self.is_dead() => return Ok(()),
        None => Operand::Const(LiteralValue::Null),
      },
      None => Operand::Const(LiteralValue::Null),
    };

    match self.slot_of.get(&symbol).copied() {
      Some(slot) => self.builder()?.emit(Instr::Store { slot, value: operand }),
      None => {
        self.env.insert(symbol, operand);
      },
    }
    Ok(())
  }

  fn lower_binary(
    &mut self,
    operation: BinaryOperation,
    left: HIRId,
    right: HIRId,
    ty: Type,
    span: &Span,
  ) -> Result<Option<Operand>, LoweringError> {
    let Some(left) = self.lower_node(left)? else {
      return Ok(None);
    };
    let Some(right) = self.lower_node(right)? else {
      return Ok(None);
    };

    let builder = self.builder()?;
    let dest = builder.alloc_value(ty, span.clone());
    builder.emit(Instr::BinOp {
      dest,
      op: operation,
      left,
      right,
    });
    Ok(Some(Operand::Value(dest)))
  }

  fn lower_unary(
    &mut self,
    operation: UnaryOperation,
    operand: HIRId,
    ty: Type,
    span: &Span,
  ) -> Result<Option<Operand>, LoweringError> {
    let Some(operand) = self.lower_node(operand)? else {
      return Ok(None);
    };

    let builder = self.builder()?;
    let dest = builder.alloc_value(ty, span.clone());
    builder.emit(Instr::UnaryOp {
      dest,
      op: operation,
      operand,
    });
    Ok(Some(Operand::Value(dest)))
  }

  fn lower_call(
    &mut self,
    callee: SymbolId,
    args: &[HIRId],
    ty: Type,
    span: &Span,
  ) -> Result<Option<Operand>, LoweringError> {
    let mut operands = Vec::with_capacity(args.len());
    for arg in args {
      let Some(operand) = self.lower_node(*arg)? else {
        return Ok(None);
      };
      operands.push(operand);
    }

    let callee = self.hir.symbols.name(&callee).to_string();
    let builder = self.builder()?;
    let dest = if ty == Type::Void {
      None
    } else {
      Some(builder.alloc_value(ty, span.clone()))
    };
    builder.emit(Instr::Call {
      dest,
      callee,
      args: operands,
    });
    Ok(dest.map(Operand::Value))
  }

  /// `a && b` branches to the right operand only when it can change the result.
  fn lower_short_circuit(
    &mut self,
    operation: BinaryOperation,
    left: HIRId,
    right: HIRId,
    span: &Span,
  ) -> Result<Option<Operand>, LoweringError> {
    let Some(left) = self.lower_node(left)? else {
      return Ok(None);
    };

    let builder = self.builder()?;
    let rhs = builder.create_block("rhs");
    let short = builder.create_block("short");
    let (then_block, else_block) = match operation {
      BinaryOperation::And => (rhs, short),
      _ => (short, rhs),
    };
    builder.terminate(Terminator::Branch {
      condition: left,
      then_block,
      else_block,
    });

    let saved = self.env.clone();

    self.builder()?.switch_to_block(rhs);
    let right = self.lower_node(right)?;
    let mut arrivals = Vec::new();
    if let Some(block) = self.builder()?.current_block() {
      arrivals.push(Arrival {
        block,
        env: self.env.clone(),
        value: right,
      });
    }

    arrivals.push(Arrival {
      block: short,
      env: saved,
      value: Some(Operand::Const(LiteralValue::Bool(operation == BinaryOperation::Or))),
    });

    Ok(self.merge("logic_join", arrivals, Some(Type::Bool), span))
  }

  fn lower_block(
    &mut self,
    statements: &[HIRId],
    expression: Option<HIRId>,
  ) -> Result<Option<Operand>, LoweringError> {
    for statement in statements {
      if self.is_dead() {
        self.warn_unreachable(*statement);
        return Ok(None);
      }
      self.lower_node(*statement)?;
    }

    match expression {
      Some(expression) if self.is_dead() => {
        self.warn_unreachable(expression);
        Ok(None)
      },
      Some(expression) => self.lower_node(expression),
      None => Ok(None),
    }
  }

  fn warn_unreachable(
    &mut self,
    id: HIRId,
  ) {
    let span = self.hir.get(id).span.clone();
    self.warnings.push(DiagnosticMessage::UnreachableCode(span).report());
  }

  fn lower_if(
    &mut self,
    condition: HIRId,
    then_branch: HIRId,
    else_branch: Option<HIRId>,
    ty: Type,
    span: &Span,
  ) -> Result<Option<Operand>, LoweringError> {
    let Some(condition) = self.lower_node(condition)? else {
      return Ok(None);
    };

    let builder = self.builder()?;
    let then_block = builder.create_block("then");
    let else_block = builder.create_block("else");
    builder.terminate(Terminator::Branch {
      condition,
      then_block,
      else_block,
    });

    let saved = self.env.clone();
    let mut arrivals = Vec::new();

    self.builder()?.switch_to_block(then_block);
    let then_value = self.lower_node(then_branch)?;
    if let Some(block) = self.builder()?.current_block() {
      arrivals.push(Arrival {
        block,
        env: std::mem::take(&mut self.env),
        value: then_value,
      });
    }

    self.env = saved;
    self.builder()?.switch_to_block(else_block);
    let else_value = match else_branch {
      Some(else_branch) => self.lower_node(else_branch)?,
      None => None,
    };
    if let Some(block) = self.builder()?.current_block() {
      arrivals.push(Arrival {
        block,
        env: std::mem::take(&mut self.env),
        value: else_value,
      });
    }

    let value_type = match (ty, else_branch) {
      (Type::Void, _) | (_, None) => None,
      (ty, Some(_)) => Some(ty),
    };
    Ok(self.merge("join", arrivals, value_type, span))
  }

  fn lower_loop(
    &mut self,
    condition: HIRId,
    body: HIRId,
    update: Option<HIRId>,
    span: &Span,
  ) -> Result<(), LoweringError> {
    let Some(preheader) = self.builder()?.current_block() else {
      return Ok(());
    };

    let header = self.builder()?.create_block("loop_header");
    self.builder()?.set_block_span(header, span.clone());
    self.builder()?.terminate(Terminator::Goto(header));

    // Every live variable gets a phi; the ones the loop never redefines turn
    // out trivial and are removed when the function is finished.
    let mut header_phis: Vec<(SymbolId, ValueId)> = Vec::new();
    let mut header_env = Env::new();
    for (symbol, operand) in std::mem::take(&mut self.env) {
      let ty = self.hir.symbols.get(&symbol).ty;
      let builder = self.builder()?;
      let dest = builder.alloc_value(ty, span.clone());
      builder.push_phi(
        header,
        Instr::Phi {
          dest,
          incoming: vec![(preheader, operand)],
        },
      );
      header_env.insert(symbol, Operand::Value(dest));
      header_phis.push((symbol, dest));
    }
    self.env = header_env;
    self.builder()?.switch_to_block(header);

    let mut exits = Vec::new();
    let body_block = self.builder()?.create_block("loop_body");

    let infinite = matches!(self.hir.get(condition).kind, HIRKind::Literal(LiteralValue::Bool(true)));
    if infinite {
      self.builder()?.terminate(Terminator::Goto(body_block));
    } else {
      let Some(condition) = self.lower_node(condition)? else {
        return Err(self.invariant("loop condition produced no value", span));
      };
      let builder = self.builder()?;
      let exit_block = builder.create_block("loop_exit");
      builder.terminate(Terminator::Branch {
        condition,
        then_block: body_block,
        else_block: exit_block,
      });
      exits.push(Arrival {
        block: exit_block,
        env: self.env.clone(),
        value: None,
      });
    }

    self.builder()?.switch_to_block(body_block);
    self.loop_stack.push(LoopContext::default());
    self.lower_node(body)?;
    let context = self.loop_stack.pop().unwrap_or_default();

    let mut latches = context.continues;
    if let Some(block) = self.builder()?.current_block() {
      latches.push(Arrival {
        block,
        env: std::mem::take(&mut self.env),
        value: None,
      });
    }

    let back_edges = match update {
      Some(update) if !latches.is_empty() => {
        self.merge("loop_next", latches, None, span);
        self.lower_node(update)?;
        match self.builder()?.current_block() {
          Some(block) => vec![Arrival {
            block,
            env: std::mem::take(&mut self.env),
            value: None,
          }],
          None => Vec::new(),
        }
      },
      _ => latches,
    };

    for edge in &back_edges {
      self.builder()?.terminate_block(edge.block, Terminator::Goto(header));
      for (symbol, dest) in &header_phis {
        let Some(operand) = edge.env.get(symbol).cloned() else {
          return Err(self.invariant("loop-carried variable lost on a back edge", span));
        };
        self.builder()?.add_phi_incoming(header, *dest, edge.block, operand);
      }
    }

    exits.extend(context.breaks);
    self.merge("loop_end", exits, None, span);
    Ok(())
  }

  /// Joins the open blocks of `arrivals`. Variables defined differently on
  /// different edges, and the carried value when `value_type` is set, get a
  /// phi with one entry per predecessor in predecessor order.
  ///
  /// No arrivals leaves the builder without an insertion point. A single
  /// arrival continues in its own block.
  fn merge(
    &mut self,
    prefix: &str,
    mut arrivals: Vec<Arrival>,
    value_type: Option<Type>,
    span: &Span,
  ) -> Option<Operand> {
    let builder = self.current_fn.as_mut()?;

    if arrivals.is_empty() {
      builder.detach();
      return None;
    }

    arrivals.sort_by_key(|a| a.block);

    if arrivals.len() == 1 {
      let arrival = arrivals.pop()?;
      builder.switch_to_block(arrival.block);
      self.env = arrival.env;
      return if value_type.is_some() { arrival.value } else { None };
    }

    let join = builder.create_block(prefix);
    builder.set_block_span(join, span.clone());
    for arrival in &arrivals {
      builder.terminate_block(arrival.block, Terminator::Goto(join));
    }

    let mut env = Env::new();
    for symbol in arrivals[0].env.keys() {
      let incoming: Option<Vec<(BlockId, Operand)>> = arrivals
        .iter()
        .map(|a| a.env.get(symbol).map(|op| (a.block, op.clone())))
        .collect();
      let Some(incoming) = incoming else {
        continue;
      };

      let ty = self.hir.symbols.get(symbol).ty;
      let operand = Self::phi_or_common(builder, join, incoming, ty, span);
      env.insert(*symbol, operand);
    }

    let value = match value_type {
      Some(ty) => {
        let incoming: Option<Vec<(BlockId, Operand)>> = arrivals
          .iter()
          .map(|a| a.value.clone().map(|op| (a.block, op)))
          .collect();
        incoming.map(|incoming| Self::phi_or_common(builder, join, incoming, ty, span))
      },
      None => None,
    };

    builder.switch_to_block(join);
    self.env = env;
    value
  }

  fn phi_or_common(
    builder: &mut FunctionBuilder,
    join: BlockId,
    incoming: Vec<(BlockId, Operand)>,
    ty: Type,
    span: &Span,
  ) -> Operand {
    let first = incoming[0].1.clone();
    if incoming.iter().all(|(_, op)| *op == first) {
      return first;
    }

    let dest = builder.alloc_value(ty, span.clone());
    builder.push_phi(join, Instr::Phi { dest, incoming });
    Operand::Value(dest)
  }
}
