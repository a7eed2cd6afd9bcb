pub mod diagnostic_report;
pub mod message;
pub mod sink;

use std::fmt::Write;

use colored::*;
use diagnostic_report::{Diagnostic, Severity};
use rr_type::file::SourceMap;

pub use diagnostic_report::ErrorKind;
pub use sink::DiagnosticSink;

/// Prints a diagnostic to stderr.
pub fn render(
  diag: &Diagnostic,
  sm: &SourceMap,
) {
  eprint!("{}", format_diagnostic(diag, sm));
}

pub fn render_batch(
  diagnostics: &[Diagnostic],
  sm: &SourceMap,
) {
  for diag in diagnostics {
    render(diag, sm);
  }
}

pub fn format_diagnostic(
  diag: &Diagnostic,
  sm: &SourceMap,
) -> String {
  let mut out = String::new();
  write_header(&mut out, diag);
  write_body(&mut out, diag, sm);

  for note in &diag.notes {
    let _ = writeln!(out, "  {} {}", "note:".cyan().bold(), note);
  }

  out.push('\n');
  out
}

fn write_header(
  out: &mut String,
  diag: &Diagnostic,
) {
  let message = diag.message.bold();
  let code = diag.error_code.bold();

  let _ = match diag.severity {
    Severity::Warning => writeln!(out, "{}[{}]: {}", "Warning".yellow().bold(), code.yellow(), message),
    Severity::Error => writeln!(out, "{}[{}]: {}", "Error".red().bold(), code.red().bold(), message),
    Severity::Fatal => writeln!(out, "{}[{}]: {}", "Internal error".magenta().bold(), code.magenta(), message),
  };
}

fn write_body(
  out: &mut String,
  diag: &Diagnostic,
  sm: &SourceMap,
) {
  // Spans of files the map does not know about degrade to the header alone.
  let Some(file) = sm.get(&diag.primary_span.file) else {
    return;
  };
  let Some((line, col)) = sm.line_col(&diag.primary_span.file, diag.primary_span.start) else {
    return;
  };
  let (end_line, end_col) = sm.line_col(&diag.primary_span.file, diag.primary_span.end).unwrap_or((line, col));

  let _ = writeln!(
    out,
    "{:2}{} {}:{}:{}",
    "",
    "-->".blue().bold(),
    file.path.display().to_string().bold(),
    line.to_string().bold(),
    col.to_string().bold(),
  );

  let pipe = "|".blue().bold();
  let _ = writeln!(out, "{:3}{:3}", "", pipe);

  if let Some(text) = sm.line_text(&diag.primary_span.file, line) {
    let _ = writeln!(out, "{:3}{:3}{}", line.to_string().blue().bold(), pipe, text);

    let span_len = if line == end_line {
      end_col.saturating_sub(col).max(1) as usize
    } else {
      (text.chars().count() + 1).saturating_sub(col as usize).max(1)
    };

    let caret = "^".repeat(span_len).red().bold();
    let _ = writeln!(out, "{:3}{:3}{}{}", "", pipe, " ".repeat(col.saturating_sub(1) as usize), caret);
  }

  for label in &diag.labels {
    let _ = writeln!(out, "  {} {}", "label:".yellow().bold(), label.message);

    let Some((label_line, label_col)) = sm.line_col(&label.span.file, label.span.start) else {
      continue;
    };

    if let Some(text) = sm.line_text(&label.span.file, label_line) {
      let _ = writeln!(out, "{:3}{:3}{}", label_line.to_string().blue().bold(), pipe, text);
      let _ = writeln!(
        out,
        "{:3}{:3}{}{}",
        "",
        pipe,
        " ".repeat(label_col.saturating_sub(1) as usize),
        "^".yellow().bold()
      );
    }
  }
}
