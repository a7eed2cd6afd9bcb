use parking_lot::Mutex;

use crate::diagnostic_report::{Diagnostic, Severity};

#[derive(Debug, Default)]
struct SinkState {
  diagnostics: Vec<Diagnostic>,
  errors: usize,
  fatals: usize,
}

/// Process-wide collector shared by the units of one run.
///
/// A unit hands over its diagnostics with [`DiagnosticSink::push_batch`] under a
/// single lock, so records of one unit are contiguous and in program order. The
/// relative order of different units is whatever order their batches arrive in.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
  state: Mutex<SinkState>,
}

impl DiagnosticSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(
    &self,
    diagnostic: Diagnostic,
  ) {
    self.push_batch(vec![diagnostic]);
  }

  pub fn push_batch(
    &self,
    batch: Vec<Diagnostic>,
  ) {
    if batch.is_empty() {
      return;
    }

    let mut state = self.state.lock();
    for diagnostic in &batch {
      match diagnostic.severity {
        Severity::Error => state.errors += 1,
        Severity::Fatal => {
          state.errors += 1;
          state.fatals += 1;
        },
        Severity::Warning => {},
      }
    }
    state.diagnostics.extend(batch);
  }

  /// Errors and fatal errors reported so far.
  pub fn error_count(&self) -> usize {
    self.state.lock().errors
  }

  pub fn fatal_count(&self) -> usize {
    self.state.lock().fatals
  }

  pub fn has_fatal(&self) -> bool {
    self.fatal_count() > 0
  }

  pub fn len(&self) -> usize {
    self.state.lock().diagnostics.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn snapshot(&self) -> Vec<Diagnostic> {
    self.state.lock().diagnostics.clone()
  }

  pub fn into_diagnostics(self) -> Vec<Diagnostic> {
    self.state.into_inner().diagnostics
  }
}

#[cfg(test)]
mod tests {
  use rr_type::span::Span;

  use super::*;
  use crate::diagnostic_report::ErrorKind;

  fn diag(
    kind: ErrorKind,
    message: &str,
  ) -> Diagnostic {
    Diagnostic::new(kind.severity(), kind, message.to_string(), "RR0000".to_string(), Span::default())
  }

  #[test]
  fn counts_errors_and_fatals() {
    let sink = DiagnosticSink::new();
    sink.push(diag(ErrorKind::UnreachableCode, "w"));
    sink.push(diag(ErrorKind::TypeMismatch, "e"));
    sink.push(diag(ErrorKind::CfgInvariant, "f"));

    assert_eq!(sink.len(), 3);
    assert_eq!(sink.error_count(), 2);
    assert_eq!(sink.fatal_count(), 1);
  }

  #[test]
  fn concurrent_batches_stay_contiguous() {
    let sink = DiagnosticSink::new();

    std::thread::scope(|scope| {
      for unit in 0..8 {
        let sink = &sink;
        scope.spawn(move || {
          let batch = (0..50).map(|i| diag(ErrorKind::TypeMismatch, &format!("{}:{}", unit, i))).collect();
          sink.push_batch(batch);
        });
      }
    });

    let diagnostics = sink.into_diagnostics();
    assert_eq!(diagnostics.len(), 400);

    for chunk in diagnostics.chunks(50) {
      let unit = chunk[0].message.split(':').next().unwrap().to_string();
      for (i, d) in chunk.iter().enumerate() {
        assert_eq!(d.message, format!("{}:{}", unit, i));
      }
    }
  }
}
