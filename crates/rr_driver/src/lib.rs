//! Pipeline driver: runs units through HIR, MIR, Tachyon and the R emitter,
//! in parallel, sharing one diagnostic sink and abort policy.

mod output;
mod pipeline;
mod unit;

pub use output::{dump_file_name, write_outputs};
pub use pipeline::{Driver, RunOutcome, compile_unit, compile_units};
pub use unit::{CompilationUnit, Stage, UnitResult, UnitStatus};
