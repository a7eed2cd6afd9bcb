use std::fmt::Display;

/// Type tags inferred by the HIR builder.
///
/// RR is dynamically typed at runtime (it runs on R), so the tags only have to be precise
/// enough to reject obviously wrong programs. `Any` unifies with everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Type {
  Int,
  Float,
  Bool,
  Str,
  Null,
  Vector,
  Any,
  Void,
}

impl Type {
  pub fn is_numeric(&self) -> bool {
    matches!(self, Type::Int | Type::Float)
  }

  /// Operands accepted by arithmetic operators.
  pub fn is_arithmetic(&self) -> bool {
    matches!(self, Type::Int | Type::Float | Type::Vector | Type::Any)
  }

  pub fn is_boolean_like(&self) -> bool {
    matches!(self, Type::Bool | Type::Any)
  }

  pub fn is_any(&self) -> bool {
    matches!(self, Type::Any)
  }

  /// Whether a value of type `from` may be stored into a binding of type `self`.
  pub fn accepts(
    &self,
    from: &Type,
  ) -> bool {
    match (self, from) {
      (Type::Any, t) | (t, Type::Any) => *t != Type::Void,
      (Type::Float, Type::Int) => true,
      (Type::Vector, Type::Int | Type::Float | Type::Bool | Type::Str) => true,
      (a, b) => a == b && *a != Type::Void,
    }
  }

  /// Least upper bound used at control-flow merges and for arithmetic results.
  pub fn join(
    &self,
    other: &Type,
  ) -> Type {
    match (self, other) {
      (a, b) if a == b => *a,
      (Type::Int, Type::Float) | (Type::Float, Type::Int) => Type::Float,
      (Type::Vector, t) | (t, Type::Vector) if t.is_numeric() || t.is_any() => Type::Vector,
      _ => Type::Any,
    }
  }

  pub fn from_name(name: &str) -> Option<Type> {
    let ty = match name {
      "int" => Type::Int,
      "float" => Type::Float,
      "bool" => Type::Bool,
      "str" => Type::Str,
      "null" => Type::Null,
      "vector" => Type::Vector,
      "any" => Type::Any,
      "void" => Type::Void,
      _ => return None,
    };
    Some(ty)
  }
}

impl Display for Type {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    let name = match self {
      Type::Int => "int",
      Type::Float => "float",
      Type::Bool => "bool",
      Type::Str => "str",
      Type::Null => "null",
      Type::Vector => "vector",
      Type::Any => "any",
      Type::Void => "void",
    };
    write!(f, "{}", name)
  }
}
