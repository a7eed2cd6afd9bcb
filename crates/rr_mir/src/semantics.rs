//! Scalar operator semantics as R evaluates them.
//!
//! RR integers are emitted as plain numerals, which R reads as doubles. Integer
//! arithmetic therefore stays exact only up to 2^53; `/` and `^` always produce
//! doubles and `%%` takes the sign of the divisor.
//!
//! The `fold_*` functions are partial: they answer only when the result is a
//! finite, exactly representable literal whose R printing cannot differ from
//! ours. Casts to `int` are never folded because `as.integer` switches R to
//! integer storage, where arithmetic overflows to `NA` past 2^31 - 1. The
//! evaluator uses the total `apply_*` functions, which defer to the fold
//! functions first so folded and evaluated programs always agree.

use rr_hir::operation::{BinaryOperation, UnaryOperation};
use rr_type::{types::Type, value::LiteralValue};

/// Largest integer magnitude a double represents exactly.
pub const MAX_EXACT_INT: i64 = 1 << 53;

fn exact(value: i64) -> Option<LiteralValue> {
  if value.abs() <= MAX_EXACT_INT {
    Some(LiteralValue::Int(value))
  } else {
    None
  }
}

fn finite(value: f64) -> Option<LiteralValue> {
  if value.is_finite() {
    Some(LiteralValue::float(value))
  } else {
    None
  }
}

/// `x %% y` with the sign of `y`.
pub fn r_modulo(
  x: f64,
  y: f64,
) -> f64 {
  x - (x / y).floor() * y
}

fn int_modulo(
  x: i64,
  y: i64,
) -> Option<i64> {
  if y == 0 {
    return None;
  }
  let m = x.checked_rem(y)?;
  if m != 0 && ((m < 0) != (y < 0)) {
    Some(m + y)
  } else {
    Some(m)
  }
}

pub fn fold_binary(
  op: BinaryOperation,
  left: &LiteralValue,
  right: &LiteralValue,
) -> Option<LiteralValue> {
  use BinaryOperation::*;
  use LiteralValue::{Bool, Float, Int, Str};

  match (op, left, right) {
    (Add, Int(a), Int(b)) => a.checked_add(*b).and_then(exact),
    (Sub, Int(a), Int(b)) => a.checked_sub(*b).and_then(exact),
    (Mul, Int(a), Int(b)) => a.checked_mul(*b).and_then(exact),
    (Mod, Int(a), Int(b)) => int_modulo(*a, *b).and_then(exact),
    (Div, Int(_) | Float(_), Int(_) | Float(_))
    | (Pow, Int(_) | Float(_), Int(_) | Float(_))
    | (Add | Sub | Mul | Mod, Float(_), Int(_) | Float(_))
    | (Add | Sub | Mul | Mod, Int(_), Float(_)) => {
      let a = left.as_f64()?;
      let b = right.as_f64()?;
      let result = match op {
        Add => a + b,
        Sub => a - b,
        Mul => a * b,
        Div => a / b,
        Mod => r_modulo(a, b),
        Pow => a.powf(b),
        _ => return None,
      };
      finite(result)
    },
    (Equal | NotEqual | LessThan | LessEqual | GreaterThan | GreaterEqual, Int(a), Int(b)) => {
      Some(Bool(compare(op, a.cmp(b))))
    },
    (Equal | NotEqual | LessThan | LessEqual | GreaterThan | GreaterEqual, Int(_) | Float(_), Int(_) | Float(_)) => {
      let a = left.as_f64()?;
      let b = right.as_f64()?;
      let ordering = a.partial_cmp(&b)?;
      Some(Bool(compare(op, ordering)))
    },
    // Ordering of strings depends on the R session's collation.
    (Equal, Str(a), Str(b)) => Some(Bool(a == b)),
    (NotEqual, Str(a), Str(b)) => Some(Bool(a != b)),
    (Equal, Bool(a), Bool(b)) => Some(Bool(a == b)),
    (NotEqual, Bool(a), Bool(b)) => Some(Bool(a != b)),
    (And, Bool(a), Bool(b)) => Some(Bool(*a && *b)),
    (Or, Bool(a), Bool(b)) => Some(Bool(*a || *b)),
    _ => None,
  }
}

fn compare(
  op: BinaryOperation,
  ordering: std::cmp::Ordering,
) -> bool {
  use std::cmp::Ordering::*;
  match op {
    BinaryOperation::Equal => ordering == Equal,
    BinaryOperation::NotEqual => ordering != Equal,
    BinaryOperation::LessThan => ordering == Less,
    BinaryOperation::LessEqual => ordering != Greater,
    BinaryOperation::GreaterThan => ordering == Greater,
    BinaryOperation::GreaterEqual => ordering != Less,
    _ => false,
  }
}

pub fn fold_unary(
  op: UnaryOperation,
  operand: &LiteralValue,
) -> Option<LiteralValue> {
  match (op, operand) {
    (UnaryOperation::Neg, LiteralValue::Int(a)) => a.checked_neg().and_then(exact),
    (UnaryOperation::Neg, LiteralValue::Float(a)) => finite(-a.0),
    (UnaryOperation::Not, LiteralValue::Bool(b)) => Some(LiteralValue::Bool(!b)),
    _ => None,
  }
}

pub fn fold_cast(
  value: &LiteralValue,
  target: Type,
) -> Option<LiteralValue> {
  match (value, target) {
    (LiteralValue::Float(_), Type::Float) | (LiteralValue::Bool(_), Type::Bool) | (LiteralValue::Str(_), Type::Str) => {
      Some(value.clone())
    },
    (LiteralValue::Int(i), Type::Float) => finite(*i as f64),
    (LiteralValue::Int(i), Type::Bool) => Some(LiteralValue::Bool(*i != 0)),
    (LiteralValue::Bool(b), Type::Str) => Some(LiteralValue::Str(if *b { "TRUE" } else { "FALSE" }.to_string())),
    // Number to string goes through `as.character`, whose notation depends on
    // the digits; `_ as int` leaves integer storage behind.
    _ => None,
  }
}

/// Runtime failure of an operation, worded like R's own errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError(pub String);

impl std::fmt::Display for OperationError {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

fn numeric(value: &LiteralValue) -> Option<f64> {
  match value {
    LiteralValue::Bool(b) => Some(*b as i64 as f64),
    other => other.as_f64(),
  }
}

fn integral(value: &LiteralValue) -> Option<i64> {
  match value {
    LiteralValue::Int(i) => Some(*i),
    LiteralValue::Bool(b) => Some(*b as i64),
    _ => None,
  }
}

pub fn apply_binary(
  op: BinaryOperation,
  left: &LiteralValue,
  right: &LiteralValue,
) -> Result<LiteralValue, OperationError> {
  if let Some(folded) = fold_binary(op, left, right) {
    return Ok(folded);
  }

  use BinaryOperation::*;
  match op {
    And | Or => {
      let a = logical(left)?;
      let b = logical(right)?;
      Ok(match (op, a, b) {
        (And, Some(false), _) | (And, _, Some(false)) => LiteralValue::Bool(false),
        (Or, Some(true), _) | (Or, _, Some(true)) => LiteralValue::Bool(true),
        (_, Some(a), Some(b)) => LiteralValue::Bool(if op == And { a && b } else { a || b }),
        _ => LiteralValue::Na,
      })
    },
    _ if left == &LiteralValue::Na || right == &LiteralValue::Na => Ok(LiteralValue::Na),
    Equal | NotEqual | LessThan | LessEqual | GreaterThan | GreaterEqual => match (left, right) {
      (LiteralValue::Str(a), LiteralValue::Str(b)) => Ok(LiteralValue::Bool(compare(op, a.cmp(b)))),
      _ => {
        let (Some(a), Some(b)) = (numeric(left), numeric(right)) else {
          return Err(OperationError("comparison is possible only for atomic types".to_string()));
        };
        Ok(match a.partial_cmp(&b) {
          Some(ordering) => LiteralValue::Bool(compare(op, ordering)),
          None => LiteralValue::Na,
        })
      },
    },
    Add | Sub | Mul | Mod if integral(left).is_some() && integral(right).is_some() => {
      let (a, b) = (integral(left).unwrap_or(0), integral(right).unwrap_or(0));
      let result = match op {
        Add => a.checked_add(b),
        Sub => a.checked_sub(b),
        Mul => a.checked_mul(b),
        _ => int_modulo(a, b),
      };
      match result.and_then(exact) {
        Some(value) => Ok(value),
        None => arithmetic(op, a as f64, b as f64),
      }
    },
    _ => {
      let (Some(a), Some(b)) = (numeric(left), numeric(right)) else {
        return Err(OperationError("non-numeric argument to binary operator".to_string()));
      };
      arithmetic(op, a, b)
    },
  }
}

fn arithmetic(
  op: BinaryOperation,
  a: f64,
  b: f64,
) -> Result<LiteralValue, OperationError> {
  let result = match op {
    BinaryOperation::Add => a + b,
    BinaryOperation::Sub => a - b,
    BinaryOperation::Mul => a * b,
    BinaryOperation::Div => a / b,
    BinaryOperation::Mod => r_modulo(a, b),
    BinaryOperation::Pow => a.powf(b),
    _ => return Err(OperationError(format!("'{}' is not arithmetic", op.r_symbol()))),
  };
  Ok(LiteralValue::float(result))
}

fn logical(value: &LiteralValue) -> Result<Option<bool>, OperationError> {
  match value {
    LiteralValue::Bool(b) => Ok(Some(*b)),
    LiteralValue::Na => Ok(None),
    LiteralValue::Int(i) => Ok(Some(*i != 0)),
    LiteralValue::Float(f) if f.0.is_nan() => Ok(None),
    LiteralValue::Float(f) => Ok(Some(f.0 != 0.0)),
    _ => Err(OperationError("invalid 'x' type in 'x && y'".to_string())),
  }
}

pub fn apply_unary(
  op: UnaryOperation,
  operand: &LiteralValue,
) -> Result<LiteralValue, OperationError> {
  if let Some(folded) = fold_unary(op, operand) {
    return Ok(folded);
  }

  match (op, operand) {
    (_, LiteralValue::Na) => Ok(LiteralValue::Na),
    (UnaryOperation::Neg, LiteralValue::Bool(b)) => Ok(LiteralValue::Int(-(*b as i64))),
    (UnaryOperation::Neg, LiteralValue::Int(i)) => Ok(LiteralValue::float(-(*i as f64))),
    (UnaryOperation::Neg, LiteralValue::Float(f)) => Ok(LiteralValue::float(-f.0)),
    (UnaryOperation::Not, LiteralValue::Int(_) | LiteralValue::Float(_)) => {
      Ok(LiteralValue::Bool(numeric(operand) == Some(0.0)))
    },
    (UnaryOperation::Neg, _) => Err(OperationError("invalid argument to unary operator".to_string())),
    (UnaryOperation::Not, _) => Err(OperationError("invalid argument type".to_string())),
  }
}

pub fn apply_cast(
  value: &LiteralValue,
  target: Type,
) -> Result<LiteralValue, OperationError> {
  if let Some(folded) = fold_cast(value, target) {
    return Ok(folded);
  }

  Ok(match (value, target) {
    (_, Type::Any | Type::Vector) => value.clone(),
    (LiteralValue::Na | LiteralValue::Null, _) => value.clone(),
    (LiteralValue::Int(i), Type::Int) => integer(*i as f64),
    (LiteralValue::Float(f), Type::Int) => integer(f.0),
    (LiteralValue::Bool(b), Type::Int) => LiteralValue::Int(*b as i64),
    (LiteralValue::Float(f), Type::Bool) if f.0.is_nan() => LiteralValue::Na,
    (LiteralValue::Float(f), Type::Bool) => LiteralValue::Bool(f.0 != 0.0),
    (LiteralValue::Int(i), Type::Str) => LiteralValue::Str(as_character(*i as f64)),
    (LiteralValue::Float(f), Type::Str) => LiteralValue::Str(as_character(f.0)),
    (LiteralValue::Bool(b), Type::Float) => LiteralValue::float(*b as i64 as f64),
    (LiteralValue::Str(s), Type::Int) => match s.trim().parse::<f64>() {
      Ok(x) => integer(x),
      Err(_) => LiteralValue::Na,
    },
    (LiteralValue::Str(s), Type::Float) => match s.trim().parse::<f64>() {
      Ok(x) => LiteralValue::float(x),
      Err(_) => LiteralValue::Na,
    },
    (LiteralValue::Str(s), Type::Bool) => match s.as_str() {
      "TRUE" | "true" | "T" | "True" => LiteralValue::Bool(true),
      "FALSE" | "false" | "F" | "False" => LiteralValue::Bool(false),
      _ => LiteralValue::Na,
    },
    (LiteralValue::Int(i), Type::Float) => LiteralValue::float(*i as f64),
    _ => return Err(OperationError(format!("cannot coerce {} to {}", value, target))),
  })
}

/// `as.integer` of a double: truncation, `NA` outside the int32 range.
fn integer(x: f64) -> LiteralValue {
  if x.is_finite() && x.abs() < 2_147_483_648.0 {
    LiteralValue::Int(x.trunc() as i64)
  } else {
    LiteralValue::Na
  }
}

/// Formats a double the way `print` and `cat` show it with default options.
pub fn format_number(value: f64) -> String {
  format_significant(value, 7)
}

/// Formats a double the way `as.character` and `paste` do.
pub fn as_character(value: f64) -> String {
  format_significant(value, 15)
}

/// At most `digits` significant digits, in fixed notation unless scientific
/// notation is narrower (R's `scipen = 0`).
fn format_significant(
  value: f64,
  digits: usize,
) -> String {
  if value.is_nan() {
    return "NaN".to_string();
  }
  if value.is_infinite() {
    return if value > 0.0 { "Inf" } else { "-Inf" }.to_string();
  }
  if value == 0.0 {
    return "0".to_string();
  }

  let scientific = format!("{:.*e}", digits.saturating_sub(1), value);
  let Some((mantissa, exponent)) = scientific.split_once('e') else {
    return scientific;
  };
  let exponent: i32 = exponent.parse().unwrap_or(0);
  let mantissa = if mantissa.contains('.') {
    mantissa.trim_end_matches('0').trim_end_matches('.')
  } else {
    mantissa
  };

  let sign = usize::from(value < 0.0);
  let significant = mantissa.chars().filter(char::is_ascii_digit).count();
  let decimals = (significant as i32 - 1 - exponent).max(0) as usize;
  let integer_digits = exponent.max(0) as usize + 1;
  let fixed_width = sign + integer_digits + if decimals > 0 { decimals + 1 } else { 0 };
  let exponent_digits = if exponent.abs() >= 100 { 3 } else { 2 };
  let scientific_width = sign + significant + usize::from(significant > 1) + 2 + exponent_digits;

  if fixed_width <= scientific_width {
    format!("{:.*}", decimals, value)
  } else {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exponent.abs())
  }
}
