use rr_type::{Store, span::Span, symbol::SymbolId, types::Type};

use crate::{Block, BlockId, Instr, Operand, SlotId, ValueId};

/// MIR of one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct MirProgram {
  /// Functions in declaration order. The entry function, if any, is last.
  pub functions: Vec<FunctionMir>,
  /// Index of the entry function in `functions`.
  pub entry: Option<usize>,
}

impl MirProgram {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn function(
    &self,
    name: &str,
  ) -> Option<&FunctionMir> {
    self.functions.iter().find(|f| f.name == name)
  }

  pub fn entry_function(&self) -> Option<&FunctionMir> {
    self.entry.and_then(|i| self.functions.get(i))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamData {
  pub name: String,
  pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueData {
  pub ty: Type,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotData {
  pub name: String,
  pub symbol: SymbolId,
  pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct FunctionMir {
  pub name: String,
  pub params: Vec<ParamData>,
  pub return_type: Type,
  pub values: Store<ValueData>,
  pub slots: Store<SlotData>,
  pub blocks: Store<Block>,
  pub entry_block: BlockId,
  /// Synthetic function holding the unit's top-level statements.
  pub is_entry: bool,
  pub span: Span,
}

impl FunctionMir {
  pub fn block(
    &self,
    id: BlockId,
  ) -> &Block {
    self.blocks.get(&id)
  }

  pub fn block_mut(
    &mut self,
    id: BlockId,
  ) -> &mut Block {
    self.blocks.get_mut(&id)
  }

  /// Blocks not pruned by an optimization, in index order.
  pub fn live_blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
    self.blocks.iter().filter(|(_, b)| !b.removed)
  }

  pub fn live_block_ids(&self) -> Vec<BlockId> {
    self.live_blocks().map(|(id, _)| id).collect()
  }

  pub fn value_type(
    &self,
    value: ValueId,
  ) -> Type {
    self.values.get(&value).ty
  }

  pub fn slot_type(
    &self,
    slot: SlotId,
  ) -> Type {
    self.slots.get(&slot).ty
  }

  pub fn operand_type(
    &self,
    operand: &Operand,
  ) -> Type {
    match operand {
      Operand::Value(v) => self.value_type(*v),
      Operand::Const(c) => c.ty(),
      Operand::Param(i) => self.params.get(*i as usize).map(|p| p.ty).unwrap_or(Type::Any),
    }
  }

  /// Number of reads of every value, indexed by value index. Only live blocks count.
  pub fn use_counts(&self) -> Vec<usize> {
    let mut counts = vec![0; self.values.len()];
    for (_, block) in self.live_blocks() {
      for instr in &block.instructions {
        for op in instr.operands() {
          if let Operand::Value(v) = op {
            counts[v.index() as usize] += 1;
          }
        }
      }
      if let Some(Operand::Value(v)) = block.terminator.operand() {
        counts[v.index() as usize] += 1;
      }
    }
    counts
  }

  /// Rewrites every read of `value` in live blocks. Returns whether anything changed.
  pub fn replace_all_uses(
    &mut self,
    value: ValueId,
    replacement: &Operand,
  ) -> bool {
    let mut changed = false;
    for (_, block) in self.blocks.iter_mut() {
      if block.removed {
        continue;
      }
      for instr in &mut block.instructions {
        changed |= instr.replace_uses(value, replacement);
      }
      changed |= block.terminator.replace_uses(value, replacement);
    }
    changed
  }

  /// Block and position of the instruction defining `value`.
  pub fn find_definition(
    &self,
    value: ValueId,
  ) -> Option<(BlockId, usize)> {
    self.live_blocks().find_map(|(id, block)| {
      block
        .instructions
        .iter()
        .position(|i| i.dest() == Some(value))
        .map(|pos| (id, pos))
    })
  }

  pub fn instruction_count(&self) -> usize {
    self.live_blocks().map(|(_, b)| b.instructions.len()).sum()
  }

  pub fn instructions(&self) -> impl Iterator<Item = (BlockId, &Instr)> {
    self
      .live_blocks()
      .flat_map(|(id, block)| block.instructions.iter().map(move |i| (id, i)))
  }

  /// Replaces every phi whose incoming operands (ignoring the phi itself) are
  /// all the same operand. Returns the number of phis removed.
  pub fn remove_trivial_phis(&mut self) -> usize {
    let mut removed = 0;

    loop {
      let Some((block, dest, replacement)) = self.find_trivial_phi() else {
        break;
      };

      self.block_mut(block).instructions.retain(|i| i.dest() != Some(dest));
      // A phi fed only by itself sits in a cycle nothing enters; it never holds a value.
      let replacement = replacement.unwrap_or(Operand::Const(rr_type::value::LiteralValue::Null));
      self.replace_all_uses(dest, &replacement);
      removed += 1;
    }

    removed
  }

  fn find_trivial_phi(&self) -> Option<(BlockId, ValueId, Option<Operand>)> {
    for (id, block) in self.live_blocks() {
      for instr in block.phis() {
        let Instr::Phi { dest, incoming } = instr else {
          continue;
        };

        let mut unique: Option<&Operand> = None;
        let mut trivial = true;
        for (_, op) in incoming {
          if op.uses(*dest) {
            continue;
          }
          match unique {
            None => unique = Some(op),
            Some(seen) if seen == op => {},
            Some(_) => {
              trivial = false;
              break;
            },
          }
        }

        if trivial {
          return Some((id, *dest, unique.cloned()));
        }
      }
    }
    None
  }
}
