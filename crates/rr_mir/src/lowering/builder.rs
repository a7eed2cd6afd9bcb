use rr_type::{Store, span::Span, types::Type};

use crate::{Block, BlockId, FunctionMir, Instr, ParamData, SlotData, SlotId, Terminator, ValueData, ValueId};

/// Builder for one function's MIR.
///
/// The builder tracks an insertion block. After a terminator is set there is
/// no insertion block until the lowering switches to another one; instructions
/// emitted in that state are dead and dropped.
pub struct FunctionBuilder {
  name: String,
  params: Vec<ParamData>,
  return_type: Type,
  is_entry: bool,
  span: Span,

  values: Store<ValueData>,
  slots: Store<SlotData>,
  blocks: Store<Block>,

  current_block: Option<BlockId>,
  block_counter: u32,
}

impl FunctionBuilder {
  pub fn new(
    name: String,
    params: Vec<ParamData>,
    return_type: Type,
    is_entry: bool,
    span: Span,
  ) -> Self {
    let mut builder = Self {
      name,
      params,
      return_type,
      is_entry,
      span,
      values: Store::new(),
      slots: Store::new(),
      blocks: Store::new(),
      current_block: None,
      block_counter: 0,
    };

    let entry = builder.create_block("entry");
    builder.switch_to_block(entry);

    builder
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn is_entry(&self) -> bool {
    self.is_entry
  }

  pub fn return_type(&self) -> Type {
    self.return_type
  }

  pub fn create_block(
    &mut self,
    prefix: &str,
  ) -> BlockId {
    let label = format!("{}_{}", prefix, self.block_counter);
    self.block_counter += 1;
    self.blocks.alloc(Block::new(label))
  }

  pub fn switch_to_block(
    &mut self,
    block: BlockId,
  ) {
    self.current_block = Some(block);
  }

  pub fn current_block(&self) -> Option<BlockId> {
    self.current_block
  }

  /// Control cannot reach the insertion point.
  pub fn is_dead(&self) -> bool {
    self.current_block.is_none()
  }

  /// Leaves the current block open without an insertion point. Used when a
  /// jump out of the block is patched in later.
  pub fn detach(&mut self) {
    self.current_block = None;
  }

  pub fn alloc_value(
    &mut self,
    ty: Type,
    span: Span,
  ) -> ValueId {
    self.values.alloc(ValueData { ty, span })
  }

  pub fn alloc_slot(
    &mut self,
    data: SlotData,
  ) -> SlotId {
    self.slots.alloc(data)
  }

  pub fn slot_type(
    &self,
    slot: SlotId,
  ) -> Type {
    self.slots.get(&slot).ty
  }

  pub fn emit(
    &mut self,
    instr: Instr,
  ) {
    if let Some(block) = self.current_block {
      self.blocks.get_mut(&block).instructions.push(instr);
    }
  }

  /// Terminates the current block; no insertion point remains.
  pub fn terminate(
    &mut self,
    terminator: Terminator,
  ) {
    if let Some(block) = self.current_block.take() {
      self.blocks.get_mut(&block).terminator = terminator;
    }
  }

  pub fn terminate_block(
    &mut self,
    block: BlockId,
    terminator: Terminator,
  ) {
    self.blocks.get_mut(&block).terminator = terminator;
  }

  /// Appends a phi after the existing phis of `block`.
  pub fn push_phi(
    &mut self,
    block: BlockId,
    phi: Instr,
  ) {
    let block = self.blocks.get_mut(&block);
    let at = block.phi_count();
    block.instructions.insert(at, phi);
  }

  /// Adds an incoming entry to the phi defining `dest` in `block`.
  pub fn add_phi_incoming(
    &mut self,
    block: BlockId,
    dest: ValueId,
    pred: BlockId,
    operand: crate::Operand,
  ) -> bool {
    for instr in &mut self.blocks.get_mut(&block).instructions {
      if let Instr::Phi { dest: d, incoming } = instr {
        if *d == dest {
          incoming.push((pred, operand));
          incoming.sort_by_key(|(b, _)| *b);
          return true;
        }
      }
    }
    false
  }

  pub fn set_block_span(
    &mut self,
    block: BlockId,
    span: Span,
  ) {
    self.blocks.get_mut(&block).span = span;
  }

  pub fn finish(self) -> FunctionMir {
    FunctionMir {
      name: self.name,
      params: self.params,
      return_type: self.return_type,
      values: self.values,
      slots: self.slots,
      blocks: self.blocks,
      entry_block: BlockId::new(0),
      is_entry: self.is_entry,
      span: self.span,
    }
  }
}
