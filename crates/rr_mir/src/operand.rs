use std::fmt::Display;

use rr_type::{types::Type, value::LiteralValue};

use crate::ValueId;

/// Anything an instruction can read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
  /// Result of an instruction.
  Value(ValueId),
  Const(LiteralValue),
  /// Incoming argument by position. Parameters are never reassigned in MIR,
  /// so reading one needs no definition.
  Param(u32),
}

impl Operand {
  pub fn as_value(&self) -> Option<ValueId> {
    match self {
      Operand::Value(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_const(&self) -> Option<&LiteralValue> {
    match self {
      Operand::Const(c) => Some(c),
      _ => None,
    }
  }

  pub fn is_const(&self) -> bool {
    matches!(self, Operand::Const(_))
  }

  pub fn uses(
    &self,
    value: ValueId,
  ) -> bool {
    matches!(self, Operand::Value(v) if *v == value)
  }

  /// Type of a constant operand; values and parameters need the function's tables.
  pub fn const_type(&self) -> Option<Type> {
    self.as_const().map(LiteralValue::ty)
  }
}

impl Display for Operand {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    match self {
      Operand::Value(v) => write!(f, "%{}", v.index()),
      Operand::Const(c) => write!(f, "{}", c),
      Operand::Param(i) => write!(f, "$arg{}", i),
    }
  }
}
