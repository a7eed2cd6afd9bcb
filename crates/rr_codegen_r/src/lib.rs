//! R code generation from optimized MIR.

mod emit;
mod error;
pub mod expr;
pub mod structure;

use rr_config::RrConfig;
use rr_mir::MirProgram;

pub use emit::REmitter;
pub use error::EmitError;
pub use structure::{RStmt, Structurizer};

/// Renders a whole program as R source.
pub fn emit_r(
  program: &MirProgram,
  config: &RrConfig,
) -> Result<String, EmitError> {
  REmitter::new(program, config).emit()
}
