//! Reference interpreter for MIR.
//!
//! Runs a program the way the emitted R would, closely enough that two MIR
//! versions of the same unit (say, before and after optimization) can be
//! compared by their printed output and return values.

use rr_hir::operation::BinaryOperation;
use rr_type::{
  types::Type,
  value::{LiteralValue, escape_string},
};

use crate::{
  BlockId, FunctionMir, Instr, MirProgram, Operand, Terminator,
  semantics::{self, OperationError},
};

/// Instructions executed before a run is cut off.
pub const DEFAULT_FUEL: u64 = 1_000_000;
const MAX_DEPTH: usize = 256;

/// An R value as far as RR programs can observe it. Length-one vectors are
/// always `Scalar`, empty vectors are `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum RValue {
  Null,
  Scalar(LiteralValue),
  Vector(Vec<LiteralValue>),
}

impl RValue {
  pub fn from_elements(mut elements: Vec<LiteralValue>) -> Self {
    elements.retain(|e| *e != LiteralValue::Null);
    match elements.len() {
      0 => RValue::Null,
      1 => RValue::Scalar(elements.remove(0)),
      _ => RValue::Vector(elements),
    }
  }

  pub fn elements(&self) -> Vec<LiteralValue> {
    match self {
      RValue::Null => Vec::new(),
      RValue::Scalar(value) => vec![value.clone()],
      RValue::Vector(values) => values.clone(),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      RValue::Null => 0,
      RValue::Scalar(_) => 1,
      RValue::Vector(values) => values.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl From<LiteralValue> for RValue {
  fn from(value: LiteralValue) -> Self {
    RValue::from_elements(vec![value])
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
  /// The program itself fails, as it would in R.
  Runtime(String),
  UnknownFunction(String),
  ArityMismatch {
    function: String,
    expected: usize,
    got: usize,
  },
  OutOfFuel,
  StackOverflow,
  /// Malformed MIR.
  Internal(String),
}

impl std::fmt::Display for EvalError {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    match self {
      EvalError::Runtime(message) => write!(f, "Error: {}", message),
      EvalError::UnknownFunction(name) => write!(f, "could not find function \"{}\"", name),
      EvalError::ArityMismatch { function, expected, got } => {
        write!(f, "'{}' takes {} arguments, {} given", function, expected, got)
      },
      EvalError::OutOfFuel => write!(f, "evaluation ran out of fuel"),
      EvalError::StackOverflow => write!(f, "evaluation nested too deeply"),
      EvalError::Internal(message) => write!(f, "malformed MIR: {}", message),
    }
  }
}

impl std::error::Error for EvalError {}

impl From<OperationError> for EvalError {
  fn from(error: OperationError) -> Self {
    EvalError::Runtime(error.0)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
  /// Everything `print` and `cat` wrote.
  pub output: String,
  pub value: RValue,
}

/// Runs the entry function of `program`. A unit without top-level statements
/// produces no output.
pub fn run_program(program: &MirProgram) -> Result<EvalOutcome, EvalError> {
  let Some(entry) = program.entry_function() else {
    return Ok(EvalOutcome {
      output: String::new(),
      value: RValue::Null,
    });
  };

  let mut evaluator = Evaluator::new(program);
  let value = evaluator.call(&entry.name, Vec::new())?;
  Ok(EvalOutcome {
    output: evaluator.output,
    value,
  })
}

/// Calls one function of `program` directly.
pub fn run_function(
  program: &MirProgram,
  name: &str,
  args: Vec<RValue>,
) -> Result<EvalOutcome, EvalError> {
  let mut evaluator = Evaluator::new(program);
  let value = evaluator.call(name, args)?;
  Ok(EvalOutcome {
    output: evaluator.output,
    value,
  })
}

pub struct Evaluator<'a> {
  program: &'a MirProgram,
  output: String,
  fuel: u64,
  depth: usize,
}

impl<'a> Evaluator<'a> {
  pub fn new(program: &'a MirProgram) -> Self {
    Self {
      program,
      output: String::new(),
      fuel: DEFAULT_FUEL,
      depth: 0,
    }
  }

  pub fn with_fuel(
    mut self,
    fuel: u64,
  ) -> Self {
    self.fuel = fuel;
    self
  }

  pub fn output(&self) -> &str {
    &self.output
  }

  pub fn call(
    &mut self,
    name: &str,
    args: Vec<RValue>,
  ) -> Result<RValue, EvalError> {
    let program = self.program;
    match program.function(name) {
      Some(function) => {
        if self.depth >= MAX_DEPTH {
          return Err(EvalError::StackOverflow);
        }
        self.depth += 1;
        let result = self.execute(function, args);
        self.depth -= 1;
        result
      },
      None => self.call_builtin(name, args),
    }
  }

  fn burn(&mut self) -> Result<(), EvalError> {
    if self.fuel == 0 {
      return Err(EvalError::OutOfFuel);
    }
    self.fuel -= 1;
    Ok(())
  }

  fn execute(
    &mut self,
    function: &'a FunctionMir,
    args: Vec<RValue>,
  ) -> Result<RValue, EvalError> {
    if args.len() != function.params.len() {
      return Err(EvalError::ArityMismatch {
        function: function.name.clone(),
        expected: function.params.len(),
        got: args.len(),
      });
    }

    let mut frame = Frame {
      values: vec![None; function.values.len()],
      slots: vec![RValue::Null; function.slots.len()],
      args,
    };
    let mut block = function.entry_block;
    let mut previous: Option<BlockId> = None;

    loop {
      self.burn()?;
      let current = function.block(block);
      if current.removed {
        return Err(EvalError::Internal(format!("control reached removed block {}", current.label)));
      }

      // Phis read their operands before any of them is written.
      let phi_count = current.phi_count();
      let mut staged = Vec::with_capacity(phi_count);
      for instr in &current.instructions[..phi_count] {
        let Instr::Phi { dest, incoming } = instr else {
          continue;
        };
        let operand = previous
          .and_then(|pred| incoming.iter().find(|(b, _)| *b == pred))
          .map(|(_, op)| op)
          .ok_or_else(|| EvalError::Internal(format!("phi in {} has no entry for the incoming edge", current.label)))?;
        staged.push((*dest, frame.read(operand)?));
      }
      for (dest, value) in staged {
        frame.write(dest, value)?;
      }

      for instr in &current.instructions[phi_count..] {
        self.burn()?;
        self.step(instr, &mut frame)?;
      }

      match &current.terminator {
        Terminator::Goto(target) => {
          previous = Some(block);
          block = *target;
        },
        Terminator::Branch {
          condition,
          then_block,
          else_block,
        } => {
          let taken = truth(&frame.read(condition)?)?;
          previous = Some(block);
          block = if taken { *then_block } else { *else_block };
        },
        Terminator::Return(value) => {
          return match value {
            Some(operand) => frame.read(operand),
            None => Ok(RValue::Null),
          };
        },
        Terminator::Unreachable => {
          return Err(EvalError::Internal(format!("{} has no terminator", current.label)));
        },
      }
    }
  }

  fn step(
    &mut self,
    instr: &Instr,
    frame: &mut Frame,
  ) -> Result<(), EvalError> {
    match instr {
      Instr::BinOp { dest, op, left, right } => {
        let left = frame.read(left)?;
        let right = frame.read(right)?;
        let result = elementwise(&left, &right, |a, b| semantics::apply_binary(*op, a, b))?;
        frame.write(*dest, result)
      },
      Instr::UnaryOp { dest, op, operand } => {
        let operand = frame.read(operand)?;
        let result = map_elements(&operand, |a| semantics::apply_unary(*op, a))?;
        frame.write(*dest, result)
      },
      Instr::Cast { dest, source, target } => {
        let source = frame.read(source)?;
        let result = match target {
          Type::Vector | Type::Any => source,
          _ => map_elements(&source, |a| semantics::apply_cast(a, *target))?,
        };
        frame.write(*dest, result)
      },
      Instr::Index { dest, base, index } => {
        let base = frame.read(base)?;
        let position = position(&frame.read(index)?)?;
        let value = base.elements().get(position - 1).cloned().unwrap_or(LiteralValue::Na);
        frame.write(*dest, RValue::from(value))
      },
      Instr::Vector { dest, elements } => {
        let mut values = Vec::new();
        for element in elements {
          values.extend(frame.read(element)?.elements());
        }
        frame.write(*dest, RValue::from_elements(values))
      },
      Instr::Phi { .. } => Err(EvalError::Internal("phi after an ordinary instruction".to_string())),
      Instr::Call { dest, callee, args } => {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
          values.push(frame.read(arg)?);
        }
        let result = self.call(callee, values)?;
        match dest {
          Some(dest) => frame.write(*dest, result),
          None => Ok(()),
        }
      },
      Instr::Load { dest, slot } => {
        let value = frame
          .slots
          .get(slot.index() as usize)
          .cloned()
          .ok_or_else(|| EvalError::Internal(format!("slot s{} does not exist", slot.index())))?;
        frame.write(*dest, value)
      },
      Instr::Store { slot, value } => {
        let value = frame.read(value)?;
        let target = frame
          .slots
          .get_mut(slot.index() as usize)
          .ok_or_else(|| EvalError::Internal(format!("slot s{} does not exist", slot.index())))?;
        *target = value;
        Ok(())
      },
      Instr::StoreIndex { slot, index, value } => {
        let position = position(&frame.read(index)?)?;
        let value = frame.read(value)?;
        let RValue::Scalar(value) = value else {
          return Err(EvalError::Runtime("replacement has length other than 1".to_string()));
        };
        let target = frame
          .slots
          .get_mut(slot.index() as usize)
          .ok_or_else(|| EvalError::Internal(format!("slot s{} does not exist", slot.index())))?;
        let mut elements = target.elements();
        if elements.len() < position {
          elements.resize(position, LiteralValue::Na);
        }
        elements[position - 1] = value;
        *target = RValue::from_elements(elements);
        Ok(())
      },
    }
  }

  fn call_builtin(
    &mut self,
    name: &str,
    args: Vec<RValue>,
  ) -> Result<RValue, EvalError> {
    let arity = |expected: usize| -> Result<(), EvalError> {
      if args.len() == expected {
        Ok(())
      } else {
        Err(EvalError::ArityMismatch {
          function: name.to_string(),
          expected,
          got: args.len(),
        })
      }
    };

    match name {
      "print" => {
        arity(1)?;
        let line = format_print(&args[0]);
        self.output.push_str(&line);
        self.output.push('\n');
        Ok(args[0].clone())
      },
      "cat" => {
        let pieces: Vec<String> = args
          .iter()
          .flat_map(|a| a.elements())
          .map(|e| format_plain(&e))
          .collect();
        self.output.push_str(&pieces.join(" "));
        Ok(RValue::Null)
      },
      "paste" => Ok(paste(&args)),
      "length" => {
        arity(1)?;
        Ok(RValue::from(LiteralValue::Int(args[0].len() as i64)))
      },
      "c" => Ok(RValue::from_elements(args.iter().flat_map(RValue::elements).collect())),
      "seq_len" => {
        arity(1)?;
        let count = match &args[0] {
          RValue::Scalar(value) => value.as_f64().filter(|n| *n >= 0.0).map(|n| n as i64),
          _ => None,
        };
        let Some(count) = count else {
          return Err(EvalError::Runtime("argument of length 0".to_string()));
        };
        Ok(RValue::from_elements((1..=count).map(LiteralValue::Int).collect()))
      },
      "sum" => fold_numbers(&args, LiteralValue::Int(0), |a, b| {
        semantics::apply_binary(BinaryOperation::Add, a, b)
      }),
      "max" | "min" => extremum(&args, name == "max"),
      "abs" => {
        arity(1)?;
        map_elements(&args[0], |value| match value {
          LiteralValue::Int(i) => Ok(LiteralValue::Int(i.abs())),
          LiteralValue::Na => Ok(LiteralValue::Na),
          other => match other.as_f64() {
            Some(x) => Ok(LiteralValue::float(x.abs())),
            None => Err(OperationError("non-numeric argument to mathematical function".to_string())),
          },
        })
      },
      "sqrt" | "exp" | "log" | "floor" => {
        arity(1)?;
        map_elements(&args[0], |value| {
          if *value == LiteralValue::Na {
            return Ok(LiteralValue::Na);
          }
          let Some(x) = value.as_f64() else {
            return Err(OperationError("non-numeric argument to mathematical function".to_string()));
          };
          let result = match name {
            "sqrt" => x.sqrt(),
            "exp" => x.exp(),
            "log" => x.ln(),
            _ => x.floor(),
          };
          Ok(LiteralValue::float(result))
        })
      },
      other => Err(EvalError::UnknownFunction(other.to_string())),
    }
  }
}

struct Frame {
  values: Vec<Option<RValue>>,
  slots: Vec<RValue>,
  args: Vec<RValue>,
}

impl Frame {
  fn read(
    &self,
    operand: &Operand,
  ) -> Result<RValue, EvalError> {
    match operand {
      Operand::Const(value) => Ok(RValue::from(value.clone())),
      Operand::Param(i) => {
        self.args.get(*i as usize).cloned().ok_or_else(|| EvalError::Internal(format!("no argument {}", i)))
      },
      Operand::Value(v) => self
        .values
        .get(v.index() as usize)
        .cloned()
        .flatten()
        .ok_or_else(|| EvalError::Internal(format!("%{} read before it was computed", v.index()))),
    }
  }

  fn write(
    &mut self,
    dest: crate::ValueId,
    value: RValue,
  ) -> Result<(), EvalError> {
    match self.values.get_mut(dest.index() as usize) {
      Some(slot) => {
        *slot = Some(value);
        Ok(())
      },
      None => Err(EvalError::Internal(format!("%{} is out of range", dest.index()))),
    }
  }
}

fn truth(value: &RValue) -> Result<bool, EvalError> {
  match value {
    RValue::Scalar(LiteralValue::Bool(b)) => Ok(*b),
    RValue::Scalar(LiteralValue::Na) => Err(EvalError::Runtime("missing value where TRUE/FALSE needed".to_string())),
    RValue::Scalar(other) => match other.as_f64() {
      Some(x) if !x.is_nan() => Ok(x != 0.0),
      _ => Err(EvalError::Runtime("argument is not interpretable as logical".to_string())),
    },
    RValue::Null => Err(EvalError::Runtime("argument is of length zero".to_string())),
    RValue::Vector(_) => Err(EvalError::Runtime("the condition has length > 1".to_string())),
  }
}

/// 1-based position from an index operand.
fn position(index: &RValue) -> Result<usize, EvalError> {
  let RValue::Scalar(value) = index else {
    return Err(EvalError::Runtime("subscript must have length one".to_string()));
  };
  match value.as_f64() {
    Some(x) if x >= 1.0 && x.is_finite() => Ok(x.trunc() as usize),
    _ => Err(EvalError::Runtime("subscript out of bounds".to_string())),
  }
}

fn elementwise(
  left: &RValue,
  right: &RValue,
  op: impl Fn(&LiteralValue, &LiteralValue) -> Result<LiteralValue, OperationError>,
) -> Result<RValue, EvalError> {
  if let (RValue::Scalar(a), RValue::Scalar(b)) = (left, right) {
    return Ok(RValue::from(op(a, b)?));
  }

  let a = left.elements();
  let b = right.elements();
  if a.is_empty() || b.is_empty() {
    return Ok(RValue::Null);
  }

  let length = a.len().max(b.len());
  let mut out = Vec::with_capacity(length);
  for i in 0..length {
    out.push(op(&a[i % a.len()], &b[i % b.len()])?);
  }
  Ok(RValue::from_elements(out))
}

fn map_elements(
  value: &RValue,
  op: impl Fn(&LiteralValue) -> Result<LiteralValue, OperationError>,
) -> Result<RValue, EvalError> {
  let mut out = Vec::with_capacity(value.len());
  for element in value.elements() {
    out.push(op(&element)?);
  }
  Ok(RValue::from_elements(out))
}

fn fold_numbers(
  args: &[RValue],
  initial: LiteralValue,
  op: impl Fn(&LiteralValue, &LiteralValue) -> Result<LiteralValue, OperationError>,
) -> Result<RValue, EvalError> {
  let mut acc = initial;
  for element in args.iter().flat_map(RValue::elements) {
    acc = op(&acc, &element)?;
  }
  Ok(RValue::from(acc))
}

fn extremum(
  args: &[RValue],
  max: bool,
) -> Result<RValue, EvalError> {
  let elements: Vec<LiteralValue> = args.iter().flat_map(RValue::elements).collect();
  if elements.iter().any(|e| *e == LiteralValue::Na) {
    return Ok(RValue::from(LiteralValue::Na));
  }
  let Some(first) = elements.first().cloned() else {
    let infinity = if max { f64::NEG_INFINITY } else { f64::INFINITY };
    return Ok(RValue::from(LiteralValue::float(infinity)));
  };

  let better = if max {
    BinaryOperation::GreaterThan
  } else {
    BinaryOperation::LessThan
  };
  let any_float = elements.iter().any(|e| matches!(e, LiteralValue::Float(_)));

  let mut best = first;
  for element in elements.into_iter().skip(1) {
    if semantics::apply_binary(better, &element, &best)? == LiteralValue::Bool(true) {
      best = element;
    }
  }

  Ok(RValue::from(match (best, any_float) {
    (LiteralValue::Int(i), true) => LiteralValue::float(i as f64),
    (other, _) => other,
  }))
}

fn paste(args: &[RValue]) -> RValue {
  let parts: Vec<Vec<String>> = args
    .iter()
    .map(|a| a.elements().iter().map(format_character).collect::<Vec<_>>())
    .filter(|p| !p.is_empty())
    .collect();
  let length = parts.iter().map(Vec::len).max().unwrap_or(0);
  if length == 0 {
    return RValue::from(LiteralValue::Str(String::new()));
  }

  let strings = (0..length)
    .map(|i| {
      let row: Vec<&str> = parts.iter().map(|p| p[i % p.len()].as_str()).collect();
      LiteralValue::Str(row.join(" "))
    })
    .collect();
  RValue::from_elements(strings)
}

/// One element as `cat` shows it. RR ints are doubles on the R side.
pub fn format_plain(value: &LiteralValue) -> String {
  match value {
    LiteralValue::Int(i) => semantics::format_number(*i as f64),
    LiteralValue::Float(f) => semantics::format_number(f.0),
    other => format_character(other),
  }
}

/// One element as `paste` converts it.
pub fn format_character(value: &LiteralValue) -> String {
  match value {
    LiteralValue::Int(i) => semantics::as_character(*i as f64),
    LiteralValue::Float(f) => semantics::as_character(f.0),
    LiteralValue::Bool(true) => "TRUE".to_string(),
    LiteralValue::Bool(false) => "FALSE".to_string(),
    LiteralValue::Str(s) => s.clone(),
    LiteralValue::Null => "NULL".to_string(),
    LiteralValue::Na => "NA".to_string(),
  }
}

/// A value as `print` shows it, without R's column alignment.
pub fn format_print(value: &RValue) -> String {
  if value.is_empty() {
    return "NULL".to_string();
  }

  let items: Vec<String> = value
    .elements()
    .iter()
    .map(|e| match e {
      LiteralValue::Str(s) => format!("\"{}\"", escape_string(s)),
      other => format_plain(other),
    })
    .collect();
  format!("[1] {}", items.join(" "))
}
