use ascii_table::AsciiTable;
use rr_diagnostics::{diagnostic_report::Diagnostic, message::DiagnosticMessage};
use rr_type::span::Span;

/// What Tachyon did to one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionReport {
  pub function: String,
  pub span: Span,
  pub iterations: usize,
  /// False when the iteration bound stopped the fixpoint loop.
  pub converged: bool,
  pub instructions_before: usize,
  pub instructions_after: usize,
  pub blocks_before: usize,
  pub blocks_after: usize,
  /// Number of iterations in which each pass changed the function, in
  /// schedule order. Passes that never changed anything are absent.
  pub changes: Vec<(String, usize)>,
}

impl FunctionReport {
  pub fn new(
    function: String,
    span: Span,
    instructions: usize,
    blocks: usize,
  ) -> Self {
    Self {
      function,
      span,
      iterations: 0,
      converged: false,
      instructions_before: instructions,
      instructions_after: instructions,
      blocks_before: blocks,
      blocks_after: blocks,
      changes: Vec::new(),
    }
  }

  pub fn record(
    &mut self,
    pass: &str,
  ) {
    match self.changes.iter_mut().find(|(name, _)| name == pass) {
      Some((_, count)) => *count += 1,
      None => self.changes.push((pass.to_string(), 1)),
    }
  }

  pub fn changed(&self) -> bool {
    !self.changes.is_empty()
  }

  pub fn changes_by(
    &self,
    pass: &str,
  ) -> usize {
    self.changes.iter().find(|(name, _)| name == pass).map_or(0, |(_, count)| *count)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TachyonReport {
  pub functions: Vec<FunctionReport>,
}

impl TachyonReport {
  pub fn function(
    &self,
    name: &str,
  ) -> Option<&FunctionReport> {
    self.functions.iter().find(|f| f.function == name)
  }

  /// One `OptimizationNotConverged` warning per function that hit the bound.
  pub fn warnings(&self) -> Vec<Diagnostic> {
    self
      .functions
      .iter()
      .filter(|f| !f.converged)
      .map(|f| {
        DiagnosticMessage::OptimizationNotConverged {
          function: f.function.clone(),
          iterations: f.iterations,
          span: f.span.clone(),
        }
        .report()
      })
      .collect()
  }

  /// Summary table for verbose output.
  pub fn render(&self) -> String {
    let mut table = AsciiTable::default();
    table.column(0).set_header("Function");
    table.column(1).set_header("Iterations");
    table.column(2).set_header("Converged");
    table.column(3).set_header("Instructions");
    table.column(4).set_header("Blocks");
    table.column(5).set_header("Changed by");

    let rows: Vec<Vec<String>> = self
      .functions
      .iter()
      .map(|f| {
        let changes: Vec<String> = f.changes.iter().map(|(name, count)| format!("{} x{}", name, count)).collect();
        vec![
          f.function.clone(),
          f.iterations.to_string(),
          if f.converged { "yes" } else { "no" }.to_string(),
          format!("{} -> {}", f.instructions_before, f.instructions_after),
          format!("{} -> {}", f.blocks_before, f.blocks_after),
          if changes.is_empty() { "-".to_string() } else { changes.join(", ") },
        ]
      })
      .collect();

    table.format(rows)
  }
}
