//! Names, literals and expression rendering for one function.

use std::collections::{HashMap, HashSet};

use rr_mir::{FunctionMir, Instr, MirProgram, Operand, SlotId, ValueId};
use rr_type::{
  symbol::BUILTINS,
  types::Type,
  value::{LiteralValue, escape_string},
};

/// A rendered R expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
  pub text: String,
  /// Binds tighter than any operator, so it never needs parentheses.
  pub atomic: bool,
}

impl Expr {
  pub fn atom(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      atomic: true,
    }
  }

  pub fn compound(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      atomic: false,
    }
  }

  /// Text for an operator operand or an index base.
  pub fn operand(&self) -> String {
    if self.atomic {
      self.text.clone()
    } else {
      format!("({})", self.text)
    }
  }
}

pub fn literal(value: &LiteralValue) -> Expr {
  match value {
    LiteralValue::Int(i) if *i < 0 => Expr::compound(i.to_string()),
    LiteralValue::Int(i) => Expr::atom(i.to_string()),
    LiteralValue::Float(f) => float_literal(f.0),
    LiteralValue::Bool(true) => Expr::atom("TRUE"),
    LiteralValue::Bool(false) => Expr::atom("FALSE"),
    LiteralValue::Str(s) => Expr::atom(format!("\"{}\"", escape_string(s))),
    LiteralValue::Null => Expr::atom("NULL"),
    LiteralValue::Na => Expr::atom("NA"),
  }
}

/// Doubles always carry a decimal point or an exponent.
fn float_literal(x: f64) -> Expr {
  if x.is_nan() {
    return Expr::atom("NaN");
  }
  if x.is_infinite() {
    return if x > 0.0 { Expr::atom("Inf") } else { Expr::compound("-Inf") };
  }

  let text = format!("{:?}", x);
  if x.is_sign_negative() {
    Expr::compound(text)
  } else {
    Expr::atom(text)
  }
}

fn cast_function(target: Type) -> Option<&'static str> {
  match target {
    Type::Int => Some("as.integer"),
    Type::Float => Some("as.double"),
    Type::Bool => Some("as.logical"),
    Type::Str => Some("as.character"),
    Type::Null | Type::Vector | Type::Any | Type::Void => None,
  }
}

/// Whether a call to `callee` forces its arguments in order before running.
/// User functions receive lazy promises, builtins do not.
pub fn forces_arguments(
  program: &MirProgram,
  callee: &str,
) -> bool {
  program.function(callee).is_none() && BUILTINS.iter().any(|(name, _, _)| *name == callee)
}

/// R names of the parameters and slots of a function. SSA values are `.vN`.
#[derive(Debug, Clone)]
pub struct Names {
  params: Vec<String>,
  slots: Vec<String>,
}

impl Names {
  pub fn new(function: &FunctionMir) -> Self {
    let params: Vec<String> = function.params.iter().map(|p| p.name.clone()).collect();
    let mut taken: HashSet<String> = params.iter().cloned().collect();

    // Slots of shadowed variables share a source name.
    let mut slots = Vec::with_capacity(function.slots.len());
    for (_, slot) in function.slots.iter() {
      let mut name = slot.name.clone();
      let mut suffix = 1;
      while taken.contains(&name) {
        name = format!("{}.{}", slot.name, suffix);
        suffix += 1;
      }
      taken.insert(name.clone());
      slots.push(name);
    }

    Self { params, slots }
  }

  pub fn param(
    &self,
    index: u32,
  ) -> String {
    match self.params.get(index as usize) {
      Some(name) => name.clone(),
      None => format!("..{}", index + 1),
    }
  }

  pub fn slot(
    &self,
    slot: SlotId,
  ) -> String {
    match self.slots.get(slot.index() as usize) {
      Some(name) => name.clone(),
      None => format!(".s{}", slot.index()),
    }
  }

  pub fn value(value: ValueId) -> String {
    format!(".v{}", value.index())
  }
}

/// Values rendered directly into their single use instead of being bound.
///
/// A value qualifies when its only use is later in the defining block, no
/// call or store sits between the two, and the use is not a phi or an
/// argument of a user function.
#[derive(Debug, Clone)]
pub struct InlinePlan {
  inline: Vec<bool>,
}

impl InlinePlan {
  pub fn compute(
    program: &MirProgram,
    function: &FunctionMir,
  ) -> Self {
    let counts = function.use_counts();
    let mut inline = vec![false; function.values.len()];

    for (_, block) in function.live_blocks() {
      let mut effects_before = Vec::with_capacity(block.instructions.len() + 1);
      let mut running = 0;
      for instr in &block.instructions {
        effects_before.push(running);
        running += usize::from(instr.is_effectful());
      }
      effects_before.push(running);

      let mut defined: HashMap<ValueId, usize> = HashMap::new();
      let mut consider = |value: ValueId, use_at: usize, defined: &HashMap<ValueId, usize>| {
        if counts.get(value.index() as usize).copied() != Some(1) {
          return;
        }
        let Some(&def_at) = defined.get(&value) else {
          return;
        };
        if effects_before[use_at] == effects_before[def_at + 1] {
          inline[value.index() as usize] = true;
        }
      };

      for (position, instr) in block.instructions.iter().enumerate() {
        let eager = match instr {
          Instr::Phi { .. } => false,
          Instr::Call { callee, .. } => forces_arguments(program, callee),
          _ => true,
        };
        if eager {
          for operand in instr.operands() {
            if let Some(value) = operand.as_value() {
              consider(value, position, &defined);
            }
          }
        }

        if let Some(dest) = instr.dest() {
          if is_deferrable(instr) {
            defined.insert(dest, position);
          }
        }
      }

      if let Some(Operand::Value(value)) = block.terminator.operand() {
        consider(*value, block.instructions.len(), &defined);
      }
    }

    Self { inline }
  }

  pub fn contains(
    &self,
    value: ValueId,
  ) -> bool {
    self.inline.get(value.index() as usize).copied().unwrap_or(false)
  }
}

fn is_deferrable(instr: &Instr) -> bool {
  matches!(
    instr,
    Instr::BinOp { .. }
      | Instr::UnaryOp { .. }
      | Instr::Cast { .. }
      | Instr::Index { .. }
      | Instr::Vector { .. }
      | Instr::Load { .. }
      | Instr::Call { dest: Some(_), .. }
  )
}

/// Renders operands and instructions, holding inlined values until their use.
pub struct ExprRenderer<'a> {
  function: &'a FunctionMir,
  names: Names,
  plan: InlinePlan,
  pending: HashMap<ValueId, Expr>,
}

impl<'a> ExprRenderer<'a> {
  pub fn new(
    program: &MirProgram,
    function: &'a FunctionMir,
  ) -> Self {
    Self {
      function,
      names: Names::new(function),
      plan: InlinePlan::compute(program, function),
      pending: HashMap::new(),
    }
  }

  pub fn names(&self) -> &Names {
    &self.names
  }

  pub fn is_inlined(
    &self,
    value: ValueId,
  ) -> bool {
    self.plan.contains(value)
  }

  /// Holds the expression of an inlined value for its use.
  pub fn defer(
    &mut self,
    value: ValueId,
    expr: Expr,
  ) {
    self.pending.insert(value, expr);
  }

  pub fn operand(
    &mut self,
    operand: &Operand,
  ) -> Expr {
    match operand {
      Operand::Value(value) => match self.pending.remove(value) {
        Some(expr) => expr,
        None => Expr::atom(Names::value(*value)),
      },
      Operand::Const(value) => literal(value),
      Operand::Param(index) => Expr::atom(self.names.param(*index)),
    }
  }

  /// Whether negating `operand` with `!` keeps `if` semantics.
  pub fn is_logical(
    &self,
    operand: &Operand,
  ) -> bool {
    self.function.operand_type(operand) == Type::Bool
  }

  fn arguments(
    &mut self,
    operands: &[Operand],
  ) -> String {
    operands
      .iter()
      .map(|op| self.operand(op).text)
      .collect::<Vec<_>>()
      .join(", ")
  }

  /// Right-hand side of an instruction that defines a value.
  pub fn instruction(
    &mut self,
    instr: &Instr,
  ) -> Option<Expr> {
    let expr = match instr {
      Instr::BinOp { op, left, right, .. } => {
        let left = self.operand(left).operand();
        let right = self.operand(right).operand();
        Expr::compound(format!("{} {} {}", left, op.r_symbol(), right))
      },
      Instr::UnaryOp { op, operand, .. } => {
        let inner = self.operand(operand);
        // `- -1` is legal but `-(-1)` reads better.
        let text = if inner.atomic && !inner.text.starts_with('-') {
          inner.text
        } else {
          format!("({})", inner.text)
        };
        Expr::compound(format!("{}{}", op.r_symbol(), text))
      },
      Instr::Cast { source, target, .. } => {
        let source = self.operand(source);
        match cast_function(*target) {
          Some(function) => Expr::atom(format!("{}({})", function, source.text)),
          None => source,
        }
      },
      Instr::Index { base, index, .. } => {
        let base = self.operand(base).operand();
        let index = self.operand(index).text;
        Expr::atom(format!("{}[{}]", base, index))
      },
      Instr::Vector { elements, .. } => Expr::atom(format!("c({})", self.arguments(elements))),
      Instr::Call { callee, args, .. } => Expr::atom(format!("{}({})", callee, self.arguments(args))),
      Instr::Load { slot, .. } => Expr::atom(self.names.slot(*slot)),
      Instr::Phi { .. } | Instr::Store { .. } | Instr::StoreIndex { .. } => return None,
    };
    Some(expr)
  }
}
