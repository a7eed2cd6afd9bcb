use rr_diagnostics::message::DiagnosticMessage;
use rr_type::span::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TachyonError {
  /// The configured pass list names a pass that does not exist.
  UnknownPass(String),

  /// An enabled pass requires an analysis no enabled pass provides, or the
  /// analysis was not current when the pass ran.
  MissingAnalysis { pass: String, analysis: String },

  /// Ordering constraints between the enabled passes form a cycle.
  ScheduleCycle(Vec<String>),

  /// A pass left the function in an invalid state.
  CfgInvariant {
    pass: String,
    function: String,
    block: Option<u32>,
    detail: String,
    span: Span,
  },
}

impl std::fmt::Display for TachyonError {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    match self {
      TachyonError::UnknownPass(name) => write!(f, "unknown Tachyon pass '{}'", name),
      TachyonError::MissingAnalysis { pass, analysis } => {
        write!(f, "pass '{}' requires the '{}' analysis but nothing provides it", pass, analysis)
      },
      TachyonError::ScheduleCycle(passes) => {
        write!(f, "passes cannot be ordered, they depend on each other: {}", passes.join(", "))
      },
      TachyonError::CfgInvariant {
        pass,
        function,
        block,
        detail,
        ..
      } => match block {
        Some(block) => write!(f, "'{}' broke '{}' at bb{}: {}", pass, function, block, detail),
        None => write!(f, "'{}' broke '{}': {}", pass, function, detail),
      },
    }
  }
}

impl std::error::Error for TachyonError {}

impl From<TachyonError> for DiagnosticMessage {
  fn from(error: TachyonError) -> Self {
    match error {
      TachyonError::CfgInvariant {
        pass,
        function,
        block,
        detail,
        span,
      } => DiagnosticMessage::CfgInvariant {
        pass,
        function,
        block,
        detail,
        span,
      },
      other => DiagnosticMessage::CfgInvariant {
        pass: "<schedule>".to_string(),
        function: String::new(),
        block: None,
        detail: other.to_string(),
        span: Span::default(),
      },
    }
  }
}
