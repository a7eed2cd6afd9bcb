use rr_type::span::Span;

use crate::{BlockId, Instr, Operand, ValueId};

/// A basic block: phis first, then ordinary instructions, then one terminator.
#[derive(Debug, Clone)]
pub struct Block {
  pub label: String,
  pub instructions: Vec<Instr>,
  pub terminator: Terminator,
  pub span: Span,
  /// Pruned by an optimization. Removed blocks keep their id so other ids stay valid.
  pub removed: bool,
}

impl Block {
  pub fn new(label: String) -> Self {
    Self {
      label,
      instructions: Vec::new(),
      terminator: Terminator::Unreachable,
      span: Span::default(),
      removed: false,
    }
  }

  pub fn phis(&self) -> impl Iterator<Item = &Instr> {
    self.instructions.iter().take_while(|i| i.is_phi())
  }

  pub fn phi_count(&self) -> usize {
    self.instructions.iter().take_while(|i| i.is_phi()).count()
  }

  /// Removes the entry of `pred` from every phi of the block.
  pub fn remove_phi_incoming(
    &mut self,
    pred: BlockId,
  ) -> bool {
    let mut changed = false;
    for instr in &mut self.instructions {
      if let Instr::Phi { incoming, .. } = instr {
        let before = incoming.len();
        incoming.retain(|(block, _)| *block != pred);
        changed |= incoming.len() != before;
      }
    }
    changed
  }
}

/// How control leaves a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
  Goto(BlockId),

  Branch {
    condition: Operand,
    then_block: BlockId,
    else_block: BlockId,
  },

  Return(Option<Operand>),

  /// Not yet terminated. Never survives lowering in a live block.
  Unreachable,
}

impl Terminator {
  /// Successor blocks, duplicates preserved.
  pub fn successors(&self) -> Vec<BlockId> {
    match self {
      Terminator::Goto(target) => vec![*target],
      Terminator::Branch {
        then_block, else_block, ..
      } => vec![*then_block, *else_block],
      Terminator::Return(_) | Terminator::Unreachable => Vec::new(),
    }
  }

  pub fn operand(&self) -> Option<&Operand> {
    match self {
      Terminator::Branch { condition, .. } => Some(condition),
      Terminator::Return(value) => value.as_ref(),
      Terminator::Goto(_) | Terminator::Unreachable => None,
    }
  }

  pub fn operand_mut(&mut self) -> Option<&mut Operand> {
    match self {
      Terminator::Branch { condition, .. } => Some(condition),
      Terminator::Return(value) => value.as_mut(),
      Terminator::Goto(_) | Terminator::Unreachable => None,
    }
  }

  pub fn uses(
    &self,
    value: ValueId,
  ) -> bool {
    self.operand().is_some_and(|op| op.uses(value))
  }

  pub fn replace_uses(
    &mut self,
    value: ValueId,
    replacement: &Operand,
  ) -> bool {
    match self.operand_mut() {
      Some(op) if op.uses(value) => {
        *op = replacement.clone();
        true
      },
      _ => false,
    }
  }
}
