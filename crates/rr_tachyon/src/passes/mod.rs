mod branch_simplify;
mod const_prop;
mod cse;
mod dce;
mod dominance;

pub use branch_simplify::{BranchSimplifyPass, constant_truth};
pub use const_prop::{ConstPropPass, fold_instruction};
pub use cse::CsePass;
pub use dce::DeadCodePass;
pub use dominance::DominancePass;

use crate::Pass;

/// Names of every pass Tachyon knows, in their natural order.
pub const KNOWN_PASSES: &[&str] = &["dominance", "const-prop", "dce", "cse", "branch-simplify"];

pub fn create_pass(name: &str) -> Option<Box<dyn Pass>> {
  let pass: Box<dyn Pass> = match name {
    "dominance" => Box::new(DominancePass),
    "const-prop" => Box::new(ConstPropPass),
    "dce" => Box::new(DeadCodePass),
    "cse" => Box::new(CsePass),
    "branch-simplify" => Box::new(BranchSimplifyPass),
    _ => return None,
  };
  Some(pass)
}
