//! Branch simplification.
//!
//! Conditional branches on a constant, or with both arms on the same block,
//! become jumps. Blocks the entry no longer reaches are tombstoned and their
//! phi entries in surviving successors are dropped; phis left with a single
//! entry are forwarded.

use rr_mir::{BlockId, FunctionMir, Operand, Terminator, cfg};
use rr_type::value::LiteralValue;

use crate::{Analysis, AnalysisCache, Pass, PassDescriptor, TachyonError};

static DESCRIPTOR: PassDescriptor = PassDescriptor {
  name: "branch-simplify",
  description: "Resolves constant branches and prunes unreachable blocks",
  requires: &[],
  provides: &[],
  invalidates: &[Analysis::Dominance],
  runs_after: &["const-prop"],
};

#[derive(Debug, Default)]
pub struct BranchSimplifyPass;

impl Pass for BranchSimplifyPass {
  fn descriptor(&self) -> &'static PassDescriptor {
    &DESCRIPTOR
  }

  fn run(
    &self,
    function: &mut FunctionMir,
    _analyses: &mut AnalysisCache,
  ) -> Result<bool, TachyonError> {
    let mut changed = false;

    for block in function.live_block_ids() {
      let Some((target, dropped)) = resolve(&function.block(block).terminator) else {
        continue;
      };
      function.block_mut(block).terminator = Terminator::Goto(target);
      if let Some(dropped) = dropped {
        function.block_mut(dropped).remove_phi_incoming(block);
      }
      changed = true;
    }

    changed |= prune_unreachable(function) > 0;
    if changed {
      function.remove_trivial_phis();
    }

    Ok(changed)
  }
}

/// Whether a constant decides the branch the way R's `if` would.
pub fn constant_truth(value: &LiteralValue) -> Option<bool> {
  match value {
    LiteralValue::Bool(b) => Some(*b),
    LiteralValue::Int(i) => Some(*i != 0),
    LiteralValue::Float(f) if !f.0.is_nan() => Some(f.0 != 0.0),
    _ => None,
  }
}

/// The jump a branch collapses to and the successor that loses the edge.
fn resolve(terminator: &Terminator) -> Option<(BlockId, Option<BlockId>)> {
  let Terminator::Branch {
    condition,
    then_block,
    else_block,
  } = terminator
  else {
    return None;
  };

  if then_block == else_block {
    return Some((*then_block, None));
  }

  let Operand::Const(value) = condition else {
    return None;
  };
  match constant_truth(value)? {
    true => Some((*then_block, Some(*else_block))),
    false => Some((*else_block, Some(*then_block))),
  }
}

/// Tombstones live blocks the entry cannot reach. Returns how many were removed.
fn prune_unreachable(function: &mut FunctionMir) -> usize {
  let reachable = cfg::reachable(function);
  let dead: Vec<BlockId> = function
    .live_blocks()
    .filter(|(id, _)| !reachable[id.index() as usize])
    .map(|(id, _)| id)
    .collect();

  for block in &dead {
    for succ in function.block(*block).terminator.successors() {
      if function.blocks.contains(&succ) {
        function.block_mut(succ).remove_phi_incoming(*block);
      }
    }
  }
  for block in &dead {
    let block = function.block_mut(*block);
    block.removed = true;
    block.instructions.clear();
    block.terminator = Terminator::Unreachable;
  }

  dead.len()
}
