//! Immediate dominators with the Cooper-Harvey-Kennedy iterative algorithm.

use crate::{BlockId, FunctionMir, cfg};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominatorTree {
  /// Immediate dominator per block index. The entry maps to itself; blocks
  /// unreachable from the entry map to `None`.
  idom: Vec<Option<BlockId>>,
  /// Position of every reachable block in reverse postorder.
  rpo_index: Vec<Option<usize>>,
  rpo: Vec<BlockId>,
  children: Vec<Vec<BlockId>>,
  entry: BlockId,
}

impl DominatorTree {
  pub fn compute(function: &FunctionMir) -> Self {
    let count = function.blocks.len();
    let rpo = cfg::reverse_postorder(function);
    let preds = cfg::predecessors(function);

    let mut rpo_index = vec![None; count];
    for (i, block) in rpo.iter().enumerate() {
      rpo_index[block.index() as usize] = Some(i);
    }

    let entry = function.entry_block;
    let mut idom: Vec<Option<BlockId>> = vec![None; count];
    if !rpo.is_empty() {
      idom[entry.index() as usize] = Some(entry);
    }

    let mut changed = true;
    while changed {
      changed = false;
      for &block in rpo.iter().skip(1) {
        let mut new_idom: Option<BlockId> = None;
        for &pred in &preds[block.index() as usize] {
          if idom[pred.index() as usize].is_none() {
            continue;
          }
          new_idom = match new_idom {
            None => Some(pred),
            Some(current) => Some(intersect(&idom, &rpo_index, current, pred)),
          };
        }

        if new_idom.is_some() && idom[block.index() as usize] != new_idom {
          idom[block.index() as usize] = new_idom;
          changed = true;
        }
      }
    }

    let mut children = vec![Vec::new(); count];
    for &block in rpo.iter().skip(1) {
      if let Some(parent) = idom[block.index() as usize] {
        children[parent.index() as usize].push(block);
      }
    }

    Self {
      idom,
      rpo_index,
      rpo,
      children,
      entry,
    }
  }

  /// Immediate dominator; `None` for the entry and for unreachable blocks.
  pub fn idom(
    &self,
    block: BlockId,
  ) -> Option<BlockId> {
    match self.idom.get(block.index() as usize).copied().flatten() {
      Some(parent) if block != self.entry => Some(parent),
      _ => None,
    }
  }

  pub fn is_reachable(
    &self,
    block: BlockId,
  ) -> bool {
    self.rpo_index.get(block.index() as usize).copied().flatten().is_some()
  }

  /// Whether `a` dominates `b`. Every block dominates itself.
  pub fn dominates(
    &self,
    a: BlockId,
    b: BlockId,
  ) -> bool {
    if !self.is_reachable(a) || !self.is_reachable(b) {
      return false;
    }

    let mut current = b;
    loop {
      if current == a {
        return true;
      }
      match self.idom(current) {
        Some(parent) => current = parent,
        None => return false,
      }
    }
  }

  /// Dominator-tree children in reverse postorder.
  pub fn children(
    &self,
    block: BlockId,
  ) -> &[BlockId] {
    self.children.get(block.index() as usize).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn reverse_postorder(&self) -> &[BlockId] {
    &self.rpo
  }

  pub fn entry(&self) -> BlockId {
    self.entry
  }
}

fn intersect(
  idom: &[Option<BlockId>],
  rpo_index: &[Option<usize>],
  mut a: BlockId,
  mut b: BlockId,
) -> BlockId {
  let position = |block: BlockId| rpo_index[block.index() as usize].unwrap_or(usize::MAX);

  while a != b {
    while position(a) > position(b) {
      match idom[a.index() as usize] {
        Some(parent) => a = parent,
        None => return b,
      }
    }
    while position(b) > position(a) {
      match idom[b.index() as usize] {
        Some(parent) => b = parent,
        None => return a,
      }
    }
  }
  a
}
