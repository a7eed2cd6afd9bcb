//! Constant propagation and folding.
//!
//! Folds pure instructions whose operands are all constants and replaces
//! trivial phis. Every replacement is pushed into all uses right away. Sweeps
//! repeat until nothing folds, since a fold late in block order can make a
//! loop header's phi trivial; a second run is therefore always a no-op.

use rr_mir::{FunctionMir, Instr, Operand, ValueId, semantics};

use crate::{AnalysisCache, Pass, PassDescriptor, TachyonError};

static DESCRIPTOR: PassDescriptor = PassDescriptor {
  name: "const-prop",
  description: "Folds constant expressions and forwards trivial phis",
  requires: &[],
  provides: &[],
  invalidates: &[],
  runs_after: &[],
};

#[derive(Debug, Default)]
pub struct ConstPropPass;

impl Pass for ConstPropPass {
  fn descriptor(&self) -> &'static PassDescriptor {
    &DESCRIPTOR
  }

  fn run(
    &self,
    function: &mut FunctionMir,
    _analyses: &mut AnalysisCache,
  ) -> Result<bool, TachyonError> {
    let mut changed = false;
    while sweep(function) {
      changed = true;
    }
    Ok(changed)
  }
}

fn sweep(function: &mut FunctionMir) -> bool {
  let mut changed = false;
  for block in function.live_block_ids() {
    let mut position = 0;
    while position < function.block(block).instructions.len() {
      match fold_instruction(&function.block(block).instructions[position]) {
        Some((dest, replacement)) => {
          function.block_mut(block).instructions.remove(position);
          function.replace_all_uses(dest, &replacement);
          changed = true;
        },
        None => position += 1,
      }
    }
  }
  changed
}

/// The operand that can stand in for the instruction's result, if known.
pub fn fold_instruction(instr: &Instr) -> Option<(ValueId, Operand)> {
  let (dest, value) = match instr {
    Instr::BinOp { dest, op, left, right } => {
      (*dest, semantics::fold_binary(*op, left.as_const()?, right.as_const()?)?)
    },
    Instr::UnaryOp { dest, op, operand } => (*dest, semantics::fold_unary(*op, operand.as_const()?)?),
    Instr::Cast { dest, source, target } => (*dest, semantics::fold_cast(source.as_const()?, *target)?),
    Instr::Phi { dest, incoming } => return trivial_phi(*dest, incoming).map(|op| (*dest, op)),
    _ => return None,
  };
  Some((dest, Operand::Const(value)))
}

/// The single operand a phi forwards when every entry other than itself agrees.
fn trivial_phi(
  dest: ValueId,
  incoming: &[(rr_mir::BlockId, Operand)],
) -> Option<Operand> {
  let mut unique: Option<&Operand> = None;
  for (_, operand) in incoming {
    if operand.uses(dest) {
      continue;
    }
    match unique {
      None => unique = Some(operand),
      Some(seen) if seen == operand => {},
      Some(_) => return None,
    }
  }
  unique.cloned()
}

#[cfg(test)]
mod tests {
  use rr_hir::operation::BinaryOperation;
  use rr_mir::BlockId;
  use rr_type::{types::Type, value::LiteralValue};

  use super::*;

  fn int(value: i64) -> Operand {
    Operand::Const(LiteralValue::Int(value))
  }

  #[test]
  fn folds_constant_operands_only() {
    let dest = ValueId::new(0);
    let folded = fold_instruction(&Instr::BinOp {
      dest,
      op: BinaryOperation::Mul,
      left: int(6),
      right: int(7),
    });
    assert_eq!(folded, Some((dest, int(42))));

    let open = fold_instruction(&Instr::BinOp {
      dest,
      op: BinaryOperation::Mul,
      left: Operand::Param(0),
      right: int(7),
    });
    assert_eq!(open, None);
  }

  #[test]
  fn division_by_zero_is_left_alone() {
    let folded = fold_instruction(&Instr::BinOp {
      dest: ValueId::new(0),
      op: BinaryOperation::Div,
      left: int(1),
      right: int(0),
    });
    assert_eq!(folded, None);
  }

  #[test]
  fn phi_ignores_its_own_entries() {
    let dest = ValueId::new(3);
    let phi = Instr::Phi {
      dest,
      incoming: vec![(BlockId::new(0), int(1)), (BlockId::new(2), Operand::Value(dest))],
    };
    assert_eq!(fold_instruction(&phi), Some((dest, int(1))));

    let real = Instr::Phi {
      dest,
      incoming: vec![(BlockId::new(0), int(1)), (BlockId::new(2), int(2))],
    };
    assert_eq!(fold_instruction(&real), None);
  }

  #[test]
  fn casts_into_integer_storage_are_kept() {
    let cast = Instr::Cast {
      dest: ValueId::new(0),
      source: Operand::Const(LiteralValue::float(2e9)),
      target: Type::Int,
    };
    assert_eq!(fold_instruction(&cast), None);
  }
}
