//! Dead code elimination.
//!
//! Marks values reachable from the roots (effectful instructions and
//! terminators) and deletes every pure instruction or load whose result
//! is never marked. Unmarked call results are dropped while the call stays.
//! Marking instead of counting uses also removes dead phi cycles.

use rr_mir::{FunctionMir, Instr, Operand, ValueId};

use crate::{AnalysisCache, Pass, PassDescriptor, TachyonError};

static DESCRIPTOR: PassDescriptor = PassDescriptor {
  name: "dce",
  description: "Removes side-effect-free instructions whose results are unused",
  requires: &[],
  provides: &[],
  invalidates: &[],
  runs_after: &["const-prop", "cse"],
};

#[derive(Debug, Default)]
pub struct DeadCodePass;

impl Pass for DeadCodePass {
  fn descriptor(&self) -> &'static PassDescriptor {
    &DESCRIPTOR
  }

  fn run(
    &self,
    function: &mut FunctionMir,
    _analyses: &mut AnalysisCache,
  ) -> Result<bool, TachyonError> {
    let live = live_values(function);
    let is_live = |operand: Option<ValueId>| operand.is_some_and(|v| live[v.index() as usize]);

    let mut changed = false;
    for block in function.live_block_ids() {
      let instructions = &mut function.block_mut(block).instructions;
      let before = instructions.len();
      instructions.retain(|instr| instr.is_effectful() || is_live(instr.dest()));
      changed |= instructions.len() != before;

      for instr in instructions.iter_mut() {
        if let Instr::Call { dest, .. } = instr {
          if dest.is_some() && !is_live(*dest) {
            *dest = None;
            changed = true;
          }
        }
      }
    }

    Ok(changed)
  }
}

fn mark(
  operand: &Operand,
  live: &mut [bool],
  worklist: &mut Vec<ValueId>,
) {
  if let Operand::Value(value) = operand {
    let index = value.index() as usize;
    if index < live.len() && !live[index] {
      live[index] = true;
      worklist.push(*value);
    }
  }
}

fn live_values(function: &FunctionMir) -> Vec<bool> {
  let mut live = vec![false; function.values.len()];
  let mut worklist = Vec::new();

  for (_, block) in function.live_blocks() {
    for instr in block.instructions.iter().filter(|i| i.is_effectful()) {
      for operand in instr.operands() {
        mark(operand, &mut live, &mut worklist);
      }
    }
    if let Some(operand) = block.terminator.operand() {
      mark(operand, &mut live, &mut worklist);
    }
  }

  let mut definitions: Vec<Option<&Instr>> = vec![None; function.values.len()];
  for (_, instr) in function.instructions() {
    if let Some(slot) = instr.dest().and_then(|dest| definitions.get_mut(dest.index() as usize)) {
      *slot = Some(instr);
    }
  }

  while let Some(value) = worklist.pop() {
    let Some(Some(instr)) = definitions.get(value.index() as usize) else {
      continue;
    };
    for operand in instr.operands() {
      mark(operand, &mut live, &mut worklist);
    }
  }

  live
}

#[cfg(test)]
mod tests {
  use rr_mir::{Block, BlockId, ParamData, Terminator, ValueData};
  use rr_type::{Store, span::Span, types::Type, value::LiteralValue};

  use super::*;

  fn function_with(
    instructions: Vec<Instr>,
    values: usize,
    terminator: Terminator,
  ) -> FunctionMir {
    let mut store = Store::new();
    for _ in 0..values {
      store.alloc(ValueData {
        ty: Type::Any,
        span: Span::default(),
      });
    }
    let mut blocks = Store::new();
    let mut block = Block::new("entry_0".to_string());
    block.instructions = instructions;
    block.terminator = terminator;
    blocks.alloc(block);

    FunctionMir {
      name: "f".to_string(),
      params: vec![ParamData {
        name: "x".to_string(),
        ty: Type::Any,
      }],
      return_type: Type::Any,
      values: store,
      slots: Store::new(),
      blocks,
      entry_block: BlockId::new(0),
      is_entry: false,
      span: Span::default(),
    }
  }

  #[test]
  fn keeps_calls_but_drops_their_unused_results() {
    let v = ValueId::new;
    let mut function = function_with(
      vec![
        Instr::Call {
          dest: Some(v(0)),
          callee: "print".to_string(),
          args: vec![Operand::Param(0)],
        },
        Instr::UnaryOp {
          dest: v(1),
          op: rr_hir::operation::UnaryOperation::Neg,
          operand: Operand::Param(0),
        },
      ],
      2,
      Terminator::Return(Some(Operand::Const(LiteralValue::Int(1)))),
    );

    let changed = DeadCodePass.run(&mut function, &mut AnalysisCache::new()).unwrap();
    assert!(changed);
    let block = function.block(BlockId::new(0));
    assert_eq!(block.instructions.len(), 1);
    assert!(matches!(block.instructions[0], Instr::Call { dest: None, .. }));
  }

  #[test]
  fn values_feeding_the_terminator_survive() {
    let v = ValueId::new;
    let mut function = function_with(
      vec![
        Instr::UnaryOp {
          dest: v(0),
          op: rr_hir::operation::UnaryOperation::Neg,
          operand: Operand::Param(0),
        },
        Instr::UnaryOp {
          dest: v(1),
          op: rr_hir::operation::UnaryOperation::Neg,
          operand: Operand::Value(v(0)),
        },
      ],
      2,
      Terminator::Return(Some(Operand::Value(v(1)))),
    );

    let changed = DeadCodePass.run(&mut function, &mut AnalysisCache::new()).unwrap();
    assert!(!changed);
    assert_eq!(function.instruction_count(), 2);
  }
}
