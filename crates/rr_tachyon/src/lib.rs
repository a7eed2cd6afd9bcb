//! Tachyon, the MIR optimizer.
//!
//! A [`Tachyon`] instance owns an ordered list of [`Pass`]es built from the
//! configuration and runs them over each function until nothing changes or
//! the iteration bound is reached.

mod analysis;
mod error;
mod manager;
mod pass;
pub mod passes;
mod report;

pub use analysis::AnalysisCache;
pub use error::TachyonError;
pub use manager::{Tachyon, schedule};
pub use pass::{Analysis, Pass, PassDescriptor};
pub use report::{FunctionReport, TachyonReport};
