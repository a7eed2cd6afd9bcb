//! Edge queries over a function's live blocks.

use crate::{BlockId, FunctionMir};

/// Predecessors of every block, indexed by block index, sorted by predecessor
/// index. A block branching twice to the same target is listed once.
pub fn predecessors(function: &FunctionMir) -> Vec<Vec<BlockId>> {
  let mut preds: Vec<Vec<BlockId>> = vec![Vec::new(); function.blocks.len()];
  for (id, block) in function.live_blocks() {
    for succ in block.terminator.successors() {
      let list = &mut preds[succ.index() as usize];
      if !list.contains(&id) {
        list.push(id);
      }
    }
  }
  for list in &mut preds {
    list.sort();
  }
  preds
}

/// Distinct successors in terminator order.
pub fn successors(
  function: &FunctionMir,
  block: BlockId,
) -> Vec<BlockId> {
  let mut out = Vec::new();
  for succ in function.block(block).terminator.successors() {
    if !out.contains(&succ) {
      out.push(succ);
    }
  }
  out
}

/// Live blocks reachable from the entry, in reverse postorder.
pub fn reverse_postorder(function: &FunctionMir) -> Vec<BlockId> {
  let mut visited = vec![false; function.blocks.len()];
  let mut postorder = Vec::new();
  // Iterative DFS; the stack holds (block, next successor position).
  let mut stack: Vec<(BlockId, usize)> = Vec::new();

  let entry = function.entry_block;
  if function.blocks.contains(&entry) && !function.block(entry).removed {
    visited[entry.index() as usize] = true;
    stack.push((entry, 0));
  }

  while let Some((block, next)) = stack.pop() {
    let succs = successors(function, block);
    if next < succs.len() {
      stack.push((block, next + 1));
      let succ = succs[next];
      let idx = succ.index() as usize;
      if idx < visited.len() && !visited[idx] && !function.block(succ).removed {
        visited[idx] = true;
        stack.push((succ, 0));
      }
    } else {
      postorder.push(block);
    }
  }

  postorder.reverse();
  postorder
}

/// Reachability from the entry, indexed by block index.
pub fn reachable(function: &FunctionMir) -> Vec<bool> {
  let mut seen = vec![false; function.blocks.len()];
  for block in reverse_postorder(function) {
    seen[block.index() as usize] = true;
  }
  seen
}
