use std::fmt::Write;

use rr_hir::operation::{BinaryOperation, UnaryOperation};

use crate::{BlockId, FunctionMir, Instr, MirProgram, Operand, Terminator};

pub fn binary_mnemonic(op: BinaryOperation) -> &'static str {
  match op {
    BinaryOperation::Add => "add",
    BinaryOperation::Sub => "sub",
    BinaryOperation::Mul => "mul",
    BinaryOperation::Div => "div",
    BinaryOperation::Mod => "mod",
    BinaryOperation::Pow => "pow",
    BinaryOperation::And => "and",
    BinaryOperation::Or => "or",
    BinaryOperation::Equal => "eq",
    BinaryOperation::NotEqual => "ne",
    BinaryOperation::LessThan => "lt",
    BinaryOperation::LessEqual => "le",
    BinaryOperation::GreaterThan => "gt",
    BinaryOperation::GreaterEqual => "ge",
  }
}

pub fn unary_mnemonic(op: UnaryOperation) -> &'static str {
  match op {
    UnaryOperation::Neg => "neg",
    UnaryOperation::Not => "not",
  }
}

/// Pretty printer for MIR programs. Removed blocks are skipped.
pub struct MirPrinter<'a> {
  program: &'a MirProgram,
  output: String,
}

impl<'a> MirPrinter<'a> {
  pub fn new(program: &'a MirProgram) -> Self {
    Self {
      program,
      output: String::new(),
    }
  }

  pub fn print(mut self) -> String {
    // Writing into a String cannot fail.
    let _ = self.print_program();
    self.output
  }

  fn print_program(&mut self) -> std::fmt::Result {
    writeln!(self.output, "=== MIR ===")?;

    let program = self.program;
    for function in &program.functions {
      writeln!(self.output)?;
      print_function(&mut self.output, function)?;
    }
    Ok(())
  }
}

/// Prints a single function.
pub fn format_function(function: &FunctionMir) -> String {
  let mut output = String::new();
  let _ = print_function(&mut output, function);
  output
}

fn print_function(
  out: &mut String,
  function: &FunctionMir,
) -> std::fmt::Result {
  let params: Vec<String> = function
    .params
    .iter()
    .map(|p| format!("{}: {}", p.name, p.ty))
    .collect();
  let flag = if function.is_entry { " [entry]" } else { "" };
  writeln!(
    out,
    "fn {}({}): {}{} {{",
    function.name,
    params.join(", "),
    function.return_type,
    flag
  )?;

  if !function.slots.is_empty() {
    writeln!(out, "  slots:")?;
    for (id, slot) in function.slots.iter() {
      writeln!(out, "    s{}: {}: {}", id.index(), slot.name, slot.ty)?;
    }
  }

  for (_, block) in function.live_blocks() {
    writeln!(out, "  {}:", block.label)?;
    for instr in &block.instructions {
      writeln!(out, "    {}", format_instr(function, instr))?;
    }
    writeln!(out, "    {}", format_terminator(function, &block.terminator))?;
  }

  writeln!(out, "}}")
}

pub fn format_operand(
  function: &FunctionMir,
  operand: &Operand,
) -> String {
  match operand {
    Operand::Param(i) => match function.params.get(*i as usize) {
      Some(param) => format!("${}", param.name),
      None => format!("$arg{}", i),
    },
    other => other.to_string(),
  }
}

fn label(
  function: &FunctionMir,
  block: BlockId,
) -> String {
  if function.blocks.contains(&block) {
    function.block(block).label.clone()
  } else {
    format!("<bb{}>", block.index())
  }
}

fn join_operands(
  function: &FunctionMir,
  operands: &[Operand],
) -> String {
  operands
    .iter()
    .map(|op| format_operand(function, op))
    .collect::<Vec<_>>()
    .join(", ")
}

pub fn format_instr(
  function: &FunctionMir,
  instr: &Instr,
) -> String {
  let op = |operand: &Operand| format_operand(function, operand);
  let def = |dest: crate::ValueId| format!("%{}: {}", dest.index(), function.value_type(dest));

  match instr {
    Instr::BinOp {
      dest,
      op: operation,
      left,
      right,
    } => format!("{} = {} {}, {}", def(*dest), binary_mnemonic(*operation), op(left), op(right)),
    Instr::UnaryOp {
      dest,
      op: operation,
      operand,
    } => format!("{} = {} {}", def(*dest), unary_mnemonic(*operation), op(operand)),
    Instr::Cast { dest, source, target } => format!("{} = cast {} to {}", def(*dest), op(source), target),
    Instr::Index { dest, base, index } => format!("{} = index {}[{}]", def(*dest), op(base), op(index)),
    Instr::Vector { dest, elements } => format!("{} = vector [{}]", def(*dest), join_operands(function, elements)),
    Instr::Phi { dest, incoming } => {
      let entries: Vec<String> = incoming
        .iter()
        .map(|(block, operand)| format!("{}: {}", label(function, *block), op(operand)))
        .collect();
      format!("{} = phi [{}]", def(*dest), entries.join(", "))
    },
    Instr::Call { dest, callee, args } => {
      let call = format!("call {}({})", callee, join_operands(function, args));
      match dest {
        Some(dest) => format!("{} = {}", def(*dest), call),
        None => call,
      }
    },
    Instr::Load { dest, slot } => format!("{} = load s{}", def(*dest), slot.index()),
    Instr::Store { slot, value } => format!("store s{}, {}", slot.index(), op(value)),
    Instr::StoreIndex { slot, index, value } => {
      format!("store s{}[{}], {}", slot.index(), op(index), op(value))
    },
  }
}

pub fn format_terminator(
  function: &FunctionMir,
  terminator: &Terminator,
) -> String {
  match terminator {
    Terminator::Goto(target) => format!("goto {}", label(function, *target)),
    Terminator::Branch {
      condition,
      then_block,
      else_block,
    } => format!(
      "branch {}, {}, {}",
      format_operand(function, condition),
      label(function, *then_block),
      label(function, *else_block)
    ),
    Terminator::Return(Some(value)) => format!("return {}", format_operand(function, value)),
    Terminator::Return(None) => "return".to_string(),
    Terminator::Unreachable => "unreachable".to_string(),
  }
}
