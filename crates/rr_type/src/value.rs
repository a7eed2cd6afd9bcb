use std::fmt::Display;

use ordered_float::OrderedFloat;

use crate::types::Type;

pub fn escape_string(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  for c in value.chars() {
    match c {
      '\\' => out.push_str("\\\\"),
      '"' => out.push_str("\\\""),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\0' => out.push_str("\\0"),
      c => out.push(c),
    }
  }
  out
}

#[derive(Debug, PartialEq, Clone, Hash, Eq, serde::Serialize)]
pub enum LiteralValue {
  Int(i64),
  Float(OrderedFloat<f64>),
  Bool(bool),
  Str(String),
  Null,
  Na,
}

impl LiteralValue {
  pub fn float(value: f64) -> Self {
    LiteralValue::Float(OrderedFloat(value))
  }

  pub fn ty(&self) -> Type {
    match self {
      LiteralValue::Int(_) => Type::Int,
      LiteralValue::Float(_) => Type::Float,
      LiteralValue::Bool(_) => Type::Bool,
      LiteralValue::Str(_) => Type::Str,
      LiteralValue::Null => Type::Null,
      LiteralValue::Na => Type::Any,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      LiteralValue::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      LiteralValue::Int(i) => Some(*i as f64),
      LiteralValue::Float(f) => Some(f.0),
      _ => None,
    }
  }
}

impl Display for LiteralValue {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    match self {
      LiteralValue::Int(i) => write!(f, "{}", i),
      LiteralValue::Float(x) => write!(f, "{:?}", x.0),
      LiteralValue::Bool(true) => write!(f, "TRUE"),
      LiteralValue::Bool(false) => write!(f, "FALSE"),
      LiteralValue::Str(s) => write!(f, "\"{}\"", escape_string(s)),
      LiteralValue::Null => write!(f, "NULL"),
      LiteralValue::Na => write!(f, "NA"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_keeps_float_marker() {
    assert_eq!(LiteralValue::float(2.0).to_string(), "2.0");
    assert_eq!(LiteralValue::Int(2).to_string(), "2");
    assert_eq!(LiteralValue::Str("a\"b\n".into()).to_string(), "\"a\\\"b\\n\"");
  }
}
