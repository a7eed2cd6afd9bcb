use std::fmt;

use rr_type::{span::Span, types::Type};

use super::diagnostic_report::{Diagnostic, ErrorKind, Severity};

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticMessage {
  // #region Name resolution
  UndeclaredVariable {
    name: String,
    span: Span,
  },
  UndeclaredFunction {
    name: String,
    span: Span,
  },
  DuplicateDeclaration {
    name: String,
    span: Span,
    previous_span: Option<Span>,
  },
  ImmutableAssignment {
    name: String,
    span: Span,
    declared_span: Option<Span>,
  },
  // #endregion Name resolution
  // #region Types
  BinaryTypeMismatch {
    operator: String,
    left: Type,
    right: Type,
    span: Span,
  },
  UnaryTypeMismatch {
    operator: String,
    operand: Type,
    span: Span,
  },
  AssignmentTypeMismatch {
    name: String,
    expected: Type,
    got: Type,
    span: Span,
  },
  ConditionNotBoolean {
    got: Type,
    span: Span,
  },
  NotCallable {
    name: String,
    span: Span,
  },
  ArgumentCountMismatch {
    name: String,
    expected: usize,
    got: usize,
    span: Span,
  },
  ArgumentTypeMismatch {
    name: String,
    position: usize,
    expected: Type,
    got: Type,
    span: Span,
  },
  ReturnTypeMismatch {
    expected: Type,
    got: Type,
    span: Span,
  },
  VoidValue(Span),
  InvalidCast {
    from: Type,
    to: Type,
    span: Span,
  },
  IndexTypeMismatch {
    target: Type,
    index: Type,
    span: Span,
  },
  // #endregion Types
  // #region Control flow
  LoopControlOutsideLoop {
    keyword: &'static str,
    span: Span,
  },
  ReturnOutsideFunction(Span),
  NestedFunction {
    name: String,
    span: Span,
  },
  IrreducibleControlFlow {
    function: String,
    span: Span,
  },
  UnstructuredControlFlow {
    function: String,
    detail: String,
    span: Span,
  },
  // #endregion Control flow
  // #region Warnings
  UnreachableCode(Span),
  OptimizationNotConverged {
    function: String,
    iterations: usize,
    span: Span,
  },
  // #endregion Warnings
  // #region Internal
  LoweringInvariant {
    function: String,
    detail: String,
    span: Span,
  },
  CfgInvariant {
    pass: String,
    function: String,
    block: Option<u32>,
    detail: String,
    span: Span,
  },
  // #endregion Internal
}

impl fmt::Display for DiagnosticMessage {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      DiagnosticMessage::UndeclaredVariable { name, .. } => write!(f, "Undeclared variable '{}'", name),
      DiagnosticMessage::UndeclaredFunction { name, .. } => write!(f, "Undeclared function '{}'", name),
      DiagnosticMessage::DuplicateDeclaration { name, .. } => {
        write!(f, "'{}' is already declared in this scope", name)
      },
      DiagnosticMessage::ImmutableAssignment { name, .. } => {
        write!(f, "Cannot assign twice to immutable variable '{}'", name)
      },

      DiagnosticMessage::BinaryTypeMismatch {
        operator, left, right, ..
      } => write!(f, "Operator '{}' cannot be applied to '{}' and '{}'", operator, left, right),
      DiagnosticMessage::UnaryTypeMismatch { operator, operand, .. } => {
        write!(f, "Operator '{}' cannot be applied to '{}'", operator, operand)
      },
      DiagnosticMessage::AssignmentTypeMismatch { name, expected, got, .. } => {
        write!(f, "Cannot assign a value of type '{}' to '{}' of type '{}'", got, name, expected)
      },
      DiagnosticMessage::ConditionNotBoolean { got, .. } => {
        write!(f, "Condition must be 'bool', found '{}'", got)
      },
      DiagnosticMessage::NotCallable { name, .. } => write!(f, "'{}' is not a function", name),
      DiagnosticMessage::ArgumentCountMismatch { name, expected, got, .. } => {
        write!(f, "Function '{}' expects {} arguments, but got {}", name, expected, got)
      },
      DiagnosticMessage::ArgumentTypeMismatch {
        name,
        position,
        expected,
        got,
        ..
      } => write!(
        f,
        "Argument {} of '{}' expects type '{}', found '{}'",
        position + 1,
        name,
        expected,
        got
      ),
      DiagnosticMessage::ReturnTypeMismatch { expected, got, .. } => {
        write!(f, "Function returns '{}', but the returned value has type '{}'", expected, got)
      },
      DiagnosticMessage::VoidValue(_) => write!(f, "Expression does not produce a value"),
      DiagnosticMessage::InvalidCast { from, to, .. } => write!(f, "Cannot cast '{}' to '{}'", from, to),
      DiagnosticMessage::IndexTypeMismatch { target, index, .. } => {
        write!(f, "Cannot index a value of type '{}' with '{}'", target, index)
      },

      DiagnosticMessage::LoopControlOutsideLoop { keyword, .. } => write!(f, "'{}' outside of a loop", keyword),
      DiagnosticMessage::ReturnOutsideFunction(_) => write!(f, "'return' outside of a function"),
      DiagnosticMessage::NestedFunction { name, .. } => {
        write!(f, "Nested function '{}' is not supported", name)
      },
      DiagnosticMessage::IrreducibleControlFlow { function, .. } => {
        write!(f, "Control flow of '{}' is irreducible and cannot be expressed in R", function)
      },
      DiagnosticMessage::UnstructuredControlFlow { function, detail, .. } => {
        write!(f, "Control flow of '{}' cannot be structured: {}", function, detail)
      },

      DiagnosticMessage::UnreachableCode(_) => write!(f, "Unreachable code"),
      DiagnosticMessage::OptimizationNotConverged { function, iterations, .. } => write!(
        f,
        "Optimization of '{}' did not converge after {} iterations",
        function, iterations
      ),

      DiagnosticMessage::LoweringInvariant { function, detail, .. } => {
        write!(f, "Internal error while lowering '{}': {}", function, detail)
      },
      DiagnosticMessage::CfgInvariant {
        pass, function, detail, ..
      } => write!(f, "Internal error: pass '{}' broke '{}': {}", pass, function, detail),
    }
  }
}

impl DiagnosticMessage {
  pub fn primary_span(&self) -> Span {
    match self {
      DiagnosticMessage::UndeclaredVariable { span, .. }
      | DiagnosticMessage::UndeclaredFunction { span, .. }
      | DiagnosticMessage::DuplicateDeclaration { span, .. }
      | DiagnosticMessage::ImmutableAssignment { span, .. }
      | DiagnosticMessage::BinaryTypeMismatch { span, .. }
      | DiagnosticMessage::UnaryTypeMismatch { span, .. }
      | DiagnosticMessage::AssignmentTypeMismatch { span, .. }
      | DiagnosticMessage::ConditionNotBoolean { span, .. }
      | DiagnosticMessage::NotCallable { span, .. }
      | DiagnosticMessage::ArgumentCountMismatch { span, .. }
      | DiagnosticMessage::ArgumentTypeMismatch { span, .. }
      | DiagnosticMessage::ReturnTypeMismatch { span, .. }
      | DiagnosticMessage::InvalidCast { span, .. }
      | DiagnosticMessage::IndexTypeMismatch { span, .. }
      | DiagnosticMessage::LoopControlOutsideLoop { span, .. }
      | DiagnosticMessage::NestedFunction { span, .. }
      | DiagnosticMessage::IrreducibleControlFlow { span, .. }
      | DiagnosticMessage::UnstructuredControlFlow { span, .. }
      | DiagnosticMessage::OptimizationNotConverged { span, .. }
      | DiagnosticMessage::LoweringInvariant { span, .. }
      | DiagnosticMessage::CfgInvariant { span, .. } => span.clone(),
      DiagnosticMessage::VoidValue(span)
      | DiagnosticMessage::ReturnOutsideFunction(span)
      | DiagnosticMessage::UnreachableCode(span) => span.clone(),
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      DiagnosticMessage::UndeclaredVariable { .. } | DiagnosticMessage::UndeclaredFunction { .. } => {
        ErrorKind::NameResolution
      },
      DiagnosticMessage::DuplicateDeclaration { .. } => ErrorKind::DuplicateDeclaration,
      DiagnosticMessage::ImmutableAssignment { .. } => ErrorKind::ImmutableAssignment,
      DiagnosticMessage::BinaryTypeMismatch { .. }
      | DiagnosticMessage::UnaryTypeMismatch { .. }
      | DiagnosticMessage::AssignmentTypeMismatch { .. }
      | DiagnosticMessage::ConditionNotBoolean { .. }
      | DiagnosticMessage::NotCallable { .. }
      | DiagnosticMessage::ArgumentCountMismatch { .. }
      | DiagnosticMessage::ArgumentTypeMismatch { .. }
      | DiagnosticMessage::ReturnTypeMismatch { .. }
      | DiagnosticMessage::VoidValue(_)
      | DiagnosticMessage::InvalidCast { .. }
      | DiagnosticMessage::IndexTypeMismatch { .. } => ErrorKind::TypeMismatch,
      DiagnosticMessage::LoopControlOutsideLoop { .. } | DiagnosticMessage::ReturnOutsideFunction(_) => {
        ErrorKind::InvalidControlFlow
      },
      DiagnosticMessage::NestedFunction { .. }
      | DiagnosticMessage::IrreducibleControlFlow { .. }
      | DiagnosticMessage::UnstructuredControlFlow { .. } => ErrorKind::UnsupportedConstruct,
      DiagnosticMessage::UnreachableCode(_) => ErrorKind::UnreachableCode,
      DiagnosticMessage::OptimizationNotConverged { .. } => ErrorKind::NonConvergence,
      DiagnosticMessage::LoweringInvariant { .. } => ErrorKind::LoweringInvariant,
      DiagnosticMessage::CfgInvariant { .. } => ErrorKind::CfgInvariant,
    }
  }

  pub fn code(&self) -> String {
    match self {
      DiagnosticMessage::UndeclaredVariable { .. } => "RR0001",
      DiagnosticMessage::UndeclaredFunction { .. } => "RR0002",
      DiagnosticMessage::DuplicateDeclaration { .. } => "RR0003",
      DiagnosticMessage::ImmutableAssignment { .. } => "RR0004",
      DiagnosticMessage::BinaryTypeMismatch { .. } => "RR0005",
      DiagnosticMessage::UnaryTypeMismatch { .. } => "RR0006",
      DiagnosticMessage::AssignmentTypeMismatch { .. } => "RR0007",
      DiagnosticMessage::ConditionNotBoolean { .. } => "RR0008",
      DiagnosticMessage::NotCallable { .. } => "RR0009",
      DiagnosticMessage::ArgumentCountMismatch { .. } => "RR0010",
      DiagnosticMessage::ArgumentTypeMismatch { .. } => "RR0011",
      DiagnosticMessage::ReturnTypeMismatch { .. } => "RR0012",
      DiagnosticMessage::VoidValue(_) => "RR0013",
      DiagnosticMessage::InvalidCast { .. } => "RR0014",
      DiagnosticMessage::IndexTypeMismatch { .. } => "RR0015",
      DiagnosticMessage::LoopControlOutsideLoop { .. } => "RR0016",
      DiagnosticMessage::ReturnOutsideFunction(_) => "RR0017",
      DiagnosticMessage::NestedFunction { .. } => "RR0018",
      DiagnosticMessage::IrreducibleControlFlow { .. } => "RR0019",
      DiagnosticMessage::UnstructuredControlFlow { .. } => "RR0020",
      DiagnosticMessage::UnreachableCode(_) => "RR0100",
      DiagnosticMessage::OptimizationNotConverged { .. } => "RR0101",
      DiagnosticMessage::LoweringInvariant { .. } => "RR0900",
      DiagnosticMessage::CfgInvariant { .. } => "RR0901",
    }
    .to_string()
  }

  pub fn level(&self) -> Severity {
    self.kind().severity()
  }

  fn secondary_labels(&self) -> Vec<(Span, String)> {
    match self {
      DiagnosticMessage::DuplicateDeclaration {
        previous_span: Some(previous),
        ..
      } => vec![(previous.clone(), "Previous declaration here".to_string())],
      DiagnosticMessage::ImmutableAssignment {
        declared_span: Some(declared),
        ..
      } => vec![(declared.clone(), "Declared immutable here".to_string())],
      _ => vec![],
    }
  }

  fn notes(&self) -> Vec<String> {
    match self {
      DiagnosticMessage::ImmutableAssignment { name, .. } => {
        vec![format!("declare it with 'let mut {}' to allow reassignment", name)]
      },
      DiagnosticMessage::CfgInvariant { pass, function, block, .. } => {
        let mut notes = vec![format!("pass: {}", pass), format!("function: {}", function)];
        if let Some(block) = block {
          notes.push(format!("block: bb{}", block));
        }
        notes.push("this is a compiler bug".to_string());
        notes
      },
      DiagnosticMessage::LoweringInvariant { function, .. } => {
        vec![format!("function: {}", function), "this is a compiler bug".to_string()]
      },
      _ => vec![],
    }
  }

  pub fn report(&self) -> Diagnostic {
    let mut diagnostic = Diagnostic::new(self.level(), self.kind(), self.to_string(), self.code(), self.primary_span());
    for (span, message) in self.secondary_labels() {
      diagnostic = diagnostic.with_label(span, message);
    }
    for note in self.notes() {
      diagnostic = diagnostic.with_note(note);
    }
    diagnostic
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_errors_use_low_codes() {
    let message = DiagnosticMessage::UndeclaredVariable {
      name: "x".to_string(),
      span: Span::default(),
    };
    let report = message.report();
    assert_eq!(report.error_code, "RR0001");
    assert_eq!(report.severity, Severity::Error);
    assert_eq!(report.message, "Undeclared variable 'x'");
  }

  #[test]
  fn cfg_invariant_carries_internal_detail() {
    let message = DiagnosticMessage::CfgInvariant {
      pass: "cse".to_string(),
      function: "f".to_string(),
      block: Some(3),
      detail: "use of %2 not dominated by its definition".to_string(),
      span: Span::default(),
    };
    let report = message.report();
    assert_eq!(report.severity, Severity::Fatal);
    assert_eq!(report.error_code, "RR0901");
    assert_eq!(
      report.notes,
      vec!["pass: cse", "function: f", "block: bb3", "this is a compiler bug"]
    );
  }
}
