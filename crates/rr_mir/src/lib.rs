pub mod block;
pub mod cfg;
pub mod display;
pub mod dominance;
pub mod eval;
pub mod instr;
pub mod lowering;
pub mod operand;
pub mod program;
pub mod semantics;
pub mod verify;

use rr_type::Id;

pub use block::{Block, Terminator};
pub use dominance::DominatorTree;
pub use instr::Instr;
pub use lowering::{LoweringError, MirLowering, lower_hir};
pub use operand::Operand;
pub use program::{FunctionMir, MirProgram, ParamData, SlotData, ValueData};
pub use verify::{VerifyError, verify_function, verify_program};

/// SSA register within a function.
pub type ValueId = Id<ValueData>;

/// Named, mutable storage for variables that are written through an index.
pub type SlotId = Id<SlotData>;

/// Basic block within a function.
pub type BlockId = Id<Block>;
