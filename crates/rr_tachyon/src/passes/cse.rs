//! Common subexpression elimination over the dominator tree.
//!
//! A pure instruction whose key (operation plus operands) was already
//! computed in a dominating position is replaced by the earlier value. The
//! table is scoped: entries made in a block are dropped when the walk leaves
//! that block's dominator subtree.

use ahash::AHashMap;
use rr_hir::operation::{BinaryOperation, UnaryOperation};
use rr_mir::{BlockId, DominatorTree, FunctionMir, Instr, Operand, ValueId};
use rr_type::types::Type;

use crate::{Analysis, AnalysisCache, Pass, PassDescriptor, TachyonError};

static DESCRIPTOR: PassDescriptor = PassDescriptor {
  name: "cse",
  description: "Merges pure instructions recomputing a dominating value",
  requires: &[Analysis::Dominance],
  provides: &[],
  invalidates: &[],
  runs_after: &["const-prop"],
};

#[derive(Debug, Default)]
pub struct CsePass;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ExprKey {
  Binary(BinaryOperation, Operand, Operand),
  Unary(UnaryOperation, Operand),
  Cast(Operand, Type),
  Index(Operand, Operand),
  Vector(Vec<Operand>),
}

impl Pass for CsePass {
  fn descriptor(&self) -> &'static PassDescriptor {
    &DESCRIPTOR
  }

  fn run(
    &self,
    function: &mut FunctionMir,
    analyses: &mut AnalysisCache,
  ) -> Result<bool, TachyonError> {
    let dominators = analyses.dominators(DESCRIPTOR.name)?;
    let redundant = find_redundant(function, dominators);
    if redundant.is_empty() {
      return Ok(false);
    }

    for (dest, _) in &redundant {
      if let Some((block, position)) = function.find_definition(*dest) {
        function.block_mut(block).instructions.remove(position);
      }
    }
    for (dest, survivor) in &redundant {
      function.replace_all_uses(*dest, &Operand::Value(*survivor));
    }
    Ok(true)
  }
}

/// Pairs of (redundant value, dominating value computing the same thing),
/// in dominator-tree preorder.
fn find_redundant(
  function: &FunctionMir,
  dominators: &DominatorTree,
) -> Vec<(ValueId, ValueId)> {
  let mut table: AHashMap<ExprKey, ValueId> = AHashMap::new();
  let mut forwarded: AHashMap<ValueId, ValueId> = AHashMap::new();
  let mut redundant = Vec::new();

  enum Step {
    Enter(BlockId),
    Leave(Vec<ExprKey>),
  }
  let mut stack = vec![Step::Enter(dominators.entry())];

  while let Some(step) = stack.pop() {
    let block = match step {
      Step::Enter(block) => block,
      Step::Leave(keys) => {
        for key in keys {
          table.remove(&key);
        }
        continue;
      },
    };
    if !dominators.is_reachable(block) {
      continue;
    }

    let mut inserted = Vec::new();
    for instr in &function.block(block).instructions {
      let Some((dest, key)) = expression_key(instr, &forwarded) else {
        continue;
      };
      match table.get(&key) {
        Some(&survivor) => {
          forwarded.insert(dest, survivor);
          redundant.push((dest, survivor));
        },
        None => {
          table.insert(key.clone(), dest);
          inserted.push(key);
        },
      }
    }

    stack.push(Step::Leave(inserted));
    // Reversed so children are entered in reverse postorder.
    for child in dominators.children(block).iter().rev() {
      stack.push(Step::Enter(*child));
    }
  }

  redundant
}

fn forward(
  operand: &Operand,
  forwarded: &AHashMap<ValueId, ValueId>,
) -> Operand {
  match operand {
    Operand::Value(value) => match forwarded.get(value) {
      Some(survivor) => Operand::Value(*survivor),
      None => operand.clone(),
    },
    other => other.clone(),
  }
}

/// Total order used to put the operands of commutative operators in a fixed
/// position.
fn rank(operand: &Operand) -> (u8, u32, String) {
  match operand {
    Operand::Value(value) => (0, value.index(), String::new()),
    Operand::Param(index) => (1, *index, String::new()),
    Operand::Const(value) => (2, 0, format!("{:?}", value)),
  }
}

fn expression_key(
  instr: &Instr,
  forwarded: &AHashMap<ValueId, ValueId>,
) -> Option<(ValueId, ExprKey)> {
  let f = |operand: &Operand| forward(operand, forwarded);
  let key = match instr {
    Instr::BinOp { dest, op, left, right } => {
      let (mut left, mut right) = (f(left), f(right));
      if op.is_commutative() && rank(&left) > rank(&right) {
        std::mem::swap(&mut left, &mut right);
      }
      (*dest, ExprKey::Binary(*op, left, right))
    },
    Instr::UnaryOp { dest, op, operand } => (*dest, ExprKey::Unary(*op, f(operand))),
    Instr::Cast { dest, source, target } => (*dest, ExprKey::Cast(f(source), *target)),
    Instr::Index { dest, base, index } => (*dest, ExprKey::Index(f(base), f(index))),
    Instr::Vector { dest, elements } => (*dest, ExprKey::Vector(elements.iter().map(f).collect())),
    Instr::Phi { .. } | Instr::Call { .. } | Instr::Load { .. } | Instr::Store { .. } | Instr::StoreIndex { .. } => {
      return None;
    },
  };
  Some(key)
}
