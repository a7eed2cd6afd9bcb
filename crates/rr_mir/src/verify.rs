use std::collections::HashSet;

use crate::{BlockId, DominatorTree, FunctionMir, Instr, MirProgram, Operand, SlotId, Terminator, ValueId, cfg};

/// Structural or SSA violation found in a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
  EntryHasPredecessors { function: String },

  /// A live block the entry cannot reach.
  UnreachableBlock { function: String, block: BlockId },

  MissingTerminator { function: String, block: BlockId },

  /// Jump to a block that does not exist or was removed.
  InvalidBlockRef {
    function: String,
    block: BlockId,
    target: BlockId,
  },

  MultipleDefinitions { function: String, value: ValueId },

  UndefinedValue {
    function: String,
    block: BlockId,
    value: ValueId,
  },

  /// The definition does not dominate the use.
  UseNotDominated {
    function: String,
    block: BlockId,
    value: ValueId,
  },

  /// A phi after a non-phi instruction.
  MisplacedPhi { function: String, block: BlockId },

  /// Phi incoming blocks differ from the block's predecessors.
  PhiPredecessorMismatch {
    function: String,
    block: BlockId,
    value: ValueId,
  },

  InvalidParam {
    function: String,
    block: BlockId,
    index: u32,
  },

  InvalidSlot {
    function: String,
    block: BlockId,
    slot: SlotId,
  },
}

impl VerifyError {
  pub fn function(&self) -> &str {
    match self {
      VerifyError::EntryHasPredecessors { function }
      | VerifyError::UnreachableBlock { function, .. }
      | VerifyError::MissingTerminator { function, .. }
      | VerifyError::InvalidBlockRef { function, .. }
      | VerifyError::MultipleDefinitions { function, .. }
      | VerifyError::UndefinedValue { function, .. }
      | VerifyError::UseNotDominated { function, .. }
      | VerifyError::MisplacedPhi { function, .. }
      | VerifyError::PhiPredecessorMismatch { function, .. }
      | VerifyError::InvalidParam { function, .. }
      | VerifyError::InvalidSlot { function, .. } => function,
    }
  }

  pub fn block(&self) -> Option<BlockId> {
    match self {
      VerifyError::EntryHasPredecessors { .. } | VerifyError::MultipleDefinitions { .. } => None,
      VerifyError::UnreachableBlock { block, .. }
      | VerifyError::MissingTerminator { block, .. }
      | VerifyError::InvalidBlockRef { block, .. }
      | VerifyError::UndefinedValue { block, .. }
      | VerifyError::UseNotDominated { block, .. }
      | VerifyError::MisplacedPhi { block, .. }
      | VerifyError::PhiPredecessorMismatch { block, .. }
      | VerifyError::InvalidParam { block, .. }
      | VerifyError::InvalidSlot { block, .. } => Some(*block),
    }
  }
}

impl std::fmt::Display for VerifyError {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    match self {
      VerifyError::EntryHasPredecessors { .. } => write!(f, "entry block has predecessors"),
      VerifyError::UnreachableBlock { block, .. } => write!(f, "bb{} is not reachable from the entry", block.index()),
      VerifyError::MissingTerminator { block, .. } => write!(f, "bb{} has no terminator", block.index()),
      VerifyError::InvalidBlockRef { block, target, .. } => {
        write!(f, "bb{} jumps to missing block bb{}", block.index(), target.index())
      },
      VerifyError::MultipleDefinitions { value, .. } => write!(f, "%{} is defined more than once", value.index()),
      VerifyError::UndefinedValue { block, value, .. } => {
        write!(f, "bb{} reads %{} which is never defined", block.index(), value.index())
      },
      VerifyError::UseNotDominated { block, value, .. } => {
        write!(f, "use of %{} in bb{} is not dominated by its definition", value.index(), block.index())
      },
      VerifyError::MisplacedPhi { block, .. } => write!(f, "bb{} has a phi after an ordinary instruction", block.index()),
      VerifyError::PhiPredecessorMismatch { block, value, .. } => {
        write!(f, "phi %{} in bb{} does not match the block's predecessors", value.index(), block.index())
      },
      VerifyError::InvalidParam { block, index, .. } => {
        write!(f, "bb{} reads parameter {} which does not exist", block.index(), index)
      },
      VerifyError::InvalidSlot { block, slot, .. } => {
        write!(f, "bb{} uses slot {} which does not exist", block.index(), slot.index())
      },
    }
  }
}

pub type VerifyResult = Result<(), Vec<VerifyError>>;

pub fn verify_program(program: &MirProgram) -> VerifyResult {
  let mut errors = Vec::new();
  for function in &program.functions {
    if let Err(mut found) = verify_function(function) {
      errors.append(&mut found);
    }
  }

  if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn verify_function(function: &FunctionMir) -> VerifyResult {
  FunctionVerifier::new(function).verify()
}

struct FunctionVerifier<'a> {
  function: &'a FunctionMir,
  errors: Vec<VerifyError>,
  /// Defining block and position of every value.
  definitions: Vec<Option<(BlockId, usize)>>,
}

impl<'a> FunctionVerifier<'a> {
  fn new(function: &'a FunctionMir) -> Self {
    Self {
      function,
      errors: Vec::new(),
      definitions: vec![None; function.values.len()],
    }
  }

  fn name(&self) -> String {
    self.function.name.clone()
  }

  fn verify(mut self) -> VerifyResult {
    let function = self.function;
    let preds = cfg::predecessors(function);

    if !function.blocks.contains(&function.entry_block) || function.block(function.entry_block).removed {
      self.errors.push(VerifyError::UnreachableBlock {
        function: self.name(),
        block: function.entry_block,
      });
      return Err(self.errors);
    }
    if !preds[function.entry_block.index() as usize].is_empty() {
      self.errors.push(VerifyError::EntryHasPredecessors { function: self.name() });
    }

    self.check_edges();
    if !self.errors.is_empty() {
      // Dominance is meaningless over dangling edges.
      return Err(self.errors);
    }

    let reachable = cfg::reachable(function);
    for (id, _) in function.live_blocks() {
      if !reachable[id.index() as usize] {
        self.errors.push(VerifyError::UnreachableBlock {
          function: self.name(),
          block: id,
        });
      }
    }

    self.collect_definitions();

    let dominators = DominatorTree::compute(function);
    for (id, block) in function.live_blocks() {
      let mut seen_ordinary = false;
      for (position, instr) in block.instructions.iter().enumerate() {
        match instr {
          Instr::Phi { dest, incoming } => {
            if seen_ordinary {
              self.errors.push(VerifyError::MisplacedPhi {
                function: self.name(),
                block: id,
              });
            }
            self.check_phi(id, *dest, incoming, &preds[id.index() as usize], &dominators);
          },
          _ => {
            seen_ordinary = true;
            for operand in instr.operands() {
              self.check_use(id, position, operand, &dominators);
            }
            self.check_slot(id, instr);
          },
        }
      }

      if let Some(operand) = block.terminator.operand() {
        self.check_use(id, block.instructions.len(), operand, &dominators);
      }
    }

    if self.errors.is_empty() { Ok(()) } else { Err(self.errors) }
  }

  fn check_edges(&mut self) {
    let function = self.function;
    for (id, block) in function.live_blocks() {
      if matches!(block.terminator, Terminator::Unreachable) {
        self.errors.push(VerifyError::MissingTerminator {
          function: self.name(),
          block: id,
        });
      }
      for target in block.terminator.successors() {
        if !function.blocks.contains(&target) || function.block(target).removed {
          self.errors.push(VerifyError::InvalidBlockRef {
            function: self.name(),
            block: id,
            target,
          });
        }
      }
    }
  }

  fn collect_definitions(&mut self) {
    let function = self.function;
    for (id, block) in function.live_blocks() {
      for (position, instr) in block.instructions.iter().enumerate() {
        let Some(dest) = instr.dest() else {
          continue;
        };
        let index = dest.index() as usize;
        if index >= self.definitions.len() {
          self.errors.push(VerifyError::UndefinedValue {
            function: function.name.clone(),
            block: id,
            value: dest,
          });
        } else if self.definitions[index].is_some() {
          self.errors.push(VerifyError::MultipleDefinitions {
            function: function.name.clone(),
            value: dest,
          });
        } else {
          self.definitions[index] = Some((id, position));
        }
      }
    }
  }

  /// `position` is the index of the using instruction; terminators use the
  /// block length.
  fn check_use(
    &mut self,
    block: BlockId,
    position: usize,
    operand: &Operand,
    dominators: &DominatorTree,
  ) {
    match operand {
      Operand::Const(_) => {},
      Operand::Param(index) => {
        if *index as usize >= self.function.params.len() {
          self.errors.push(VerifyError::InvalidParam {
            function: self.name(),
            block,
            index: *index,
          });
        }
      },
      Operand::Value(value) => {
        let Some((def_block, def_position)) = self.definitions.get(value.index() as usize).copied().flatten() else {
          self.errors.push(VerifyError::UndefinedValue {
            function: self.name(),
            block,
            value: *value,
          });
          return;
        };

        let dominated = if def_block == block {
          def_position < position
        } else {
          dominators.dominates(def_block, block)
        };
        if !dominated {
          self.errors.push(VerifyError::UseNotDominated {
            function: self.name(),
            block,
            value: *value,
          });
        }
      },
    }
  }

  fn check_phi(
    &mut self,
    block: BlockId,
    dest: ValueId,
    incoming: &[(BlockId, Operand)],
    preds: &[BlockId],
    dominators: &DominatorTree,
  ) {
    let mut sources = HashSet::new();
    let mut duplicate = false;
    for (pred, _) in incoming {
      duplicate |= !sources.insert(*pred);
    }
    let expected: HashSet<BlockId> = preds.iter().copied().collect();
    if duplicate || sources != expected {
      self.errors.push(VerifyError::PhiPredecessorMismatch {
        function: self.name(),
        block,
        value: dest,
      });
    }

    // An incoming operand is read at the end of its predecessor.
    for (pred, operand) in incoming {
      if !self.function.blocks.contains(pred) || self.function.block(*pred).removed {
        continue;
      }
      let end = self.function.block(*pred).instructions.len();
      self.check_use(*pred, end, operand, dominators);
    }
  }

  fn check_slot(
    &mut self,
    block: BlockId,
    instr: &Instr,
  ) {
    let slot = match instr {
      Instr::Load { slot, .. } | Instr::Store { slot, .. } | Instr::StoreIndex { slot, .. } => *slot,
      _ => return,
    };
    if !self.function.slots.contains(&slot) {
      self.errors.push(VerifyError::InvalidSlot {
        function: self.name(),
        block,
        slot,
      });
    }
  }
}
