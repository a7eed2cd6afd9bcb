use rr_type::span::Span;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Warning,
  Error,
  /// Internal compiler error. Aborts the whole run.
  Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
  NameResolution,
  TypeMismatch,
  DuplicateDeclaration,
  ImmutableAssignment,
  InvalidControlFlow,
  UnsupportedConstruct,
  UnreachableCode,
  NonConvergence,
  LoweringInvariant,
  CfgInvariant,
}

impl ErrorKind {
  pub fn is_internal(&self) -> bool {
    matches!(self, ErrorKind::LoweringInvariant | ErrorKind::CfgInvariant)
  }

  pub fn severity(&self) -> Severity {
    match self {
      ErrorKind::UnreachableCode | ErrorKind::NonConvergence => Severity::Warning,
      ErrorKind::LoweringInvariant | ErrorKind::CfgInvariant => Severity::Fatal,
      _ => Severity::Error,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
  pub span: Span,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
  pub severity: Severity,
  pub kind: ErrorKind,
  pub message: String,
  pub error_code: String,
  pub primary_span: Span,
  pub labels: Vec<Label>,
  pub notes: Vec<String>,
}

impl Diagnostic {
  pub fn new(
    severity: Severity,
    kind: ErrorKind,
    message: String,
    error_code: String,
    primary_span: Span,
  ) -> Self {
    Self {
      severity,
      kind,
      message,
      error_code,
      primary_span,
      labels: Vec::new(),
      notes: Vec::new(),
    }
  }

  pub fn with_label(
    mut self,
    span: Span,
    message: String,
  ) -> Self {
    self.labels.push(Label { span, message });
    self
  }

  pub fn with_note(
    mut self,
    note: String,
  ) -> Self {
    self.notes.push(note);
    self
  }

  pub fn is_error(&self) -> bool {
    self.severity >= Severity::Error
  }

  /// One JSON object per diagnostic, as consumed by the CLI.
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn internal_kinds_are_fatal() {
    assert_eq!(ErrorKind::CfgInvariant.severity(), Severity::Fatal);
    assert_eq!(ErrorKind::NonConvergence.severity(), Severity::Warning);
    assert_eq!(ErrorKind::TypeMismatch.severity(), Severity::Error);
    assert!(Severity::Fatal > Severity::Error);
  }

  #[test]
  fn json_carries_every_field() {
    let diagnostic = Diagnostic::new(
      Severity::Error,
      ErrorKind::NameResolution,
      "Undeclared variable 'x'".to_string(),
      "RR0001".to_string(),
      Span::default(),
    )
    .with_note("declare it with 'let'".to_string());

    let value: serde_json::Value = serde_json::from_str(&diagnostic.to_json().unwrap()).unwrap();
    assert_eq!(value["severity"], "error");
    assert_eq!(value["kind"], "NameResolution");
    assert_eq!(value["error_code"], "RR0001");
    assert_eq!(value["primary_span"]["start"], 0);
    assert_eq!(value["notes"][0], "declare it with 'let'");
  }
}
