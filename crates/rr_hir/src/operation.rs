#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperation {
  // Arithmetic
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Pow,

  // Logical, short-circuiting
  And,
  Or,

  // Comparison
  Equal,
  NotEqual,
  LessThan,
  LessEqual,
  GreaterThan,
  GreaterEqual,
}

impl BinaryOperation {
  pub fn is_arithmetic(&self) -> bool {
    matches!(
      self,
      BinaryOperation::Add
        | BinaryOperation::Sub
        | BinaryOperation::Mul
        | BinaryOperation::Div
        | BinaryOperation::Mod
        | BinaryOperation::Pow
    )
  }

  pub fn is_comparison(&self) -> bool {
    matches!(
      self,
      BinaryOperation::Equal
        | BinaryOperation::NotEqual
        | BinaryOperation::LessThan
        | BinaryOperation::LessEqual
        | BinaryOperation::GreaterThan
        | BinaryOperation::GreaterEqual
    )
  }

  pub fn is_short_circuit(&self) -> bool {
    matches!(self, BinaryOperation::And | BinaryOperation::Or)
  }

  pub fn is_commutative(&self) -> bool {
    matches!(
      self,
      BinaryOperation::Add | BinaryOperation::Mul | BinaryOperation::Equal | BinaryOperation::NotEqual
    )
  }

  /// The operator as written in R. `And`/`Or` use the scalar forms.
  pub fn r_symbol(&self) -> &'static str {
    match self {
      BinaryOperation::Add => "+",
      BinaryOperation::Sub => "-",
      BinaryOperation::Mul => "*",
      BinaryOperation::Div => "/",
      BinaryOperation::Mod => "%%",
      BinaryOperation::Pow => "^",
      BinaryOperation::And => "&&",
      BinaryOperation::Or => "||",
      BinaryOperation::Equal => "==",
      BinaryOperation::NotEqual => "!=",
      BinaryOperation::LessThan => "<",
      BinaryOperation::LessEqual => "<=",
      BinaryOperation::GreaterThan => ">",
      BinaryOperation::GreaterEqual => ">=",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperation {
  Not,
  Neg,
}

impl UnaryOperation {
  pub fn r_symbol(&self) -> &'static str {
    match self {
      UnaryOperation::Not => "!",
      UnaryOperation::Neg => "-",
    }
  }
}
