use std::fmt::Write;

use rr_config::{DebugTrace, RrConfig};
use rr_log::{log_trc, trace_dbg};
use rr_mir::{FunctionMir, MirProgram};

use crate::{
  EmitError,
  structure::{RStmt, Structurizer},
};

const INDENT: &str = "  ";

/// R source emitter for MIR programs.
pub struct REmitter<'a> {
  program: &'a MirProgram,
  config: &'a RrConfig,
  output: String,
}

impl<'a> REmitter<'a> {
  pub fn new(
    program: &'a MirProgram,
    config: &'a RrConfig,
  ) -> Self {
    Self {
      program,
      config,
      output: String::new(),
    }
  }

  /// User functions in declaration order, then the entry function and the
  /// call that runs it.
  pub fn emit(mut self) -> Result<String, EmitError> {
    let program = self.program;
    for (i, function) in program.functions.iter().enumerate() {
      if i > 0 {
        self.output.push('\n');
      }
      self.emit_function(function)?;
    }

    if let Some(entry) = program.entry_function() {
      let _ = writeln!(self.output, "\ninvisible({}())", entry.name);
    }
    Ok(self.output)
  }

  fn emit_function(
    &mut self,
    function: &FunctionMir,
  ) -> Result<(), EmitError> {
    trace_dbg!(self.config, DebugTrace::Codegen, "structuring '{}'", function.name);

    let params: Vec<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
    let body = Structurizer::new(self.program, function).structure()?;
    log_trc!(
      self.config,
      "'{}': {} blocks structured into {} top-level statements",
      function.name,
      function.live_blocks().count(),
      body.len()
    );

    let _ = writeln!(self.output, "{} <- function({}) {{", function.name, params.join(", "));
    write_block(&mut self.output, &body, 1);
    let _ = writeln!(self.output, "}}");
    Ok(())
  }
}

fn write_block(
  out: &mut String,
  statements: &[RStmt],
  depth: usize,
) {
  for statement in statements {
    write_statement(out, statement, depth);
  }
}

fn write_statement(
  out: &mut String,
  statement: &RStmt,
  depth: usize,
) {
  let pad = INDENT.repeat(depth);
  let _ = match statement {
    RStmt::Line(text) => writeln!(out, "{}{}", pad, text),
    RStmt::Break => writeln!(out, "{}break", pad),
    RStmt::Next => writeln!(out, "{}next", pad),
    RStmt::Return(Some(value)) => writeln!(out, "{}return({})", pad, value),
    RStmt::Return(None) => writeln!(out, "{}return(invisible(NULL))", pad),
    RStmt::Repeat(body) => {
      let _ = writeln!(out, "{}repeat {{", pad);
      write_block(out, body, depth + 1);
      writeln!(out, "{}}}", pad)
    },
    RStmt::If {
      condition,
      then_body,
      else_body,
      ..
    } => {
      let _ = writeln!(out, "{}if ({}) {{", pad, condition);
      write_block(out, then_body, depth + 1);
      if else_body.is_empty() {
        writeln!(out, "{}}}", pad)
      } else {
        let _ = writeln!(out, "{}}} else {{", pad);
        write_block(out, else_body, depth + 1);
        writeln!(out, "{}}}", pad)
      }
    },
  };
}
