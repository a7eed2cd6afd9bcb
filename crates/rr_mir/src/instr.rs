use rr_hir::operation::{BinaryOperation, UnaryOperation};
use rr_type::types::Type;

use crate::{BlockId, Operand, SlotId, ValueId};

/// A single MIR instruction. Every `dest` is defined exactly once per function.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
  /// `dest = left op right`
  BinOp {
    dest: ValueId,
    op: BinaryOperation,
    left: Operand,
    right: Operand,
  },

  /// `dest = op operand`
  UnaryOp {
    dest: ValueId,
    op: UnaryOperation,
    operand: Operand,
  },

  /// `dest = source as target`
  Cast {
    dest: ValueId,
    source: Operand,
    target: Type,
  },

  /// `dest = base[index]`, 1-based.
  Index {
    dest: ValueId,
    base: Operand,
    index: Operand,
  },

  /// `dest = c(elements...)`
  Vector { dest: ValueId, elements: Vec<Operand> },

  /// Selects the operand of the predecessor control arrived from. Phis sit at
  /// the top of their block, incoming entries ordered by predecessor index.
  Phi {
    dest: ValueId,
    incoming: Vec<(BlockId, Operand)>,
  },

  /// `dest = callee(args...)`. Always effectful.
  Call {
    dest: Option<ValueId>,
    callee: String,
    args: Vec<Operand>,
  },

  /// `dest = *slot`
  Load { dest: ValueId, slot: SlotId },

  /// `*slot = value`
  Store { slot: SlotId, value: Operand },

  /// `(*slot)[index] = value`
  StoreIndex {
    slot: SlotId,
    index: Operand,
    value: Operand,
  },
}

impl Instr {
  pub fn dest(&self) -> Option<ValueId> {
    match self {
      Instr::BinOp { dest, .. }
      | Instr::UnaryOp { dest, .. }
      | Instr::Cast { dest, .. }
      | Instr::Index { dest, .. }
      | Instr::Vector { dest, .. }
      | Instr::Phi { dest, .. }
      | Instr::Load { dest, .. } => Some(*dest),
      Instr::Call { dest, .. } => *dest,
      Instr::Store { .. } | Instr::StoreIndex { .. } => None,
    }
  }

  /// No side effects and no dependence on mutable state: may be merged,
  /// folded or deleted when unused.
  pub fn is_pure(&self) -> bool {
    matches!(
      self,
      Instr::BinOp { .. }
        | Instr::UnaryOp { .. }
        | Instr::Cast { .. }
        | Instr::Index { .. }
        | Instr::Vector { .. }
        | Instr::Phi { .. }
    )
  }

  /// Must keep its relative order with every other effectful instruction.
  pub fn is_effectful(&self) -> bool {
    matches!(self, Instr::Call { .. } | Instr::Store { .. } | Instr::StoreIndex { .. })
  }

  pub fn is_phi(&self) -> bool {
    matches!(self, Instr::Phi { .. })
  }

  /// Operands read by the instruction, in evaluation order.
  pub fn operands(&self) -> Vec<&Operand> {
    match self {
      Instr::BinOp { left, right, .. } => vec![left, right],
      Instr::UnaryOp { operand, .. } => vec![operand],
      Instr::Cast { source, .. } => vec![source],
      Instr::Index { base, index, .. } => vec![base, index],
      Instr::Vector { elements, .. } => elements.iter().collect(),
      Instr::Phi { incoming, .. } => incoming.iter().map(|(_, op)| op).collect(),
      Instr::Call { args, .. } => args.iter().collect(),
      Instr::Load { .. } => Vec::new(),
      Instr::Store { value, .. } => vec![value],
      Instr::StoreIndex { index, value, .. } => vec![index, value],
    }
  }

  pub fn operands_mut(&mut self) -> Vec<&mut Operand> {
    match self {
      Instr::BinOp { left, right, .. } => vec![left, right],
      Instr::UnaryOp { operand, .. } => vec![operand],
      Instr::Cast { source, .. } => vec![source],
      Instr::Index { base, index, .. } => vec![base, index],
      Instr::Vector { elements, .. } => elements.iter_mut().collect(),
      Instr::Phi { incoming, .. } => incoming.iter_mut().map(|(_, op)| op).collect(),
      Instr::Call { args, .. } => args.iter_mut().collect(),
      Instr::Load { .. } => Vec::new(),
      Instr::Store { value, .. } => vec![value],
      Instr::StoreIndex { index, value, .. } => vec![index, value],
    }
  }

  pub fn uses(
    &self,
    value: ValueId,
  ) -> bool {
    self.operands().iter().any(|op| op.uses(value))
  }

  /// Rewrites every read of `value` to `replacement`. Returns whether anything changed.
  pub fn replace_uses(
    &mut self,
    value: ValueId,
    replacement: &Operand,
  ) -> bool {
    let mut changed = false;
    for op in self.operands_mut() {
      if op.uses(value) {
        *op = replacement.clone();
        changed = true;
      }
    }
    changed
  }
}
