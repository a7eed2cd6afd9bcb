use rr_diagnostics::message::DiagnosticMessage;
use rr_type::span::Span;

/// A function whose control flow has no R rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
  /// A retreating edge whose target does not dominate its source.
  Irreducible { function: String, block: String, span: Span },

  /// Reducible, but not expressible with `if`, `repeat`, `break` and `next`.
  Unstructured { function: String, detail: String, span: Span },
}

impl EmitError {
  pub fn function(&self) -> &str {
    match self {
      EmitError::Irreducible { function, .. } | EmitError::Unstructured { function, .. } => function,
    }
  }
}

impl std::fmt::Display for EmitError {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    match self {
      EmitError::Irreducible { function, block, .. } => {
        write!(f, "irreducible control flow in '{}' entering '{}'", function, block)
      },
      EmitError::Unstructured { function, detail, .. } => {
        write!(f, "cannot structure '{}': {}", function, detail)
      },
    }
  }
}

impl std::error::Error for EmitError {}

impl From<EmitError> for DiagnosticMessage {
  fn from(error: EmitError) -> Self {
    match error {
      EmitError::Irreducible { function, span, .. } => DiagnosticMessage::IrreducibleControlFlow { function, span },
      EmitError::Unstructured { function, detail, span } => {
        DiagnosticMessage::UnstructuredControlFlow { function, detail, span }
      },
    }
  }
}
