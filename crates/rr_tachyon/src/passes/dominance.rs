use rr_mir::{DominatorTree, FunctionMir};

use crate::{Analysis, AnalysisCache, Pass, PassDescriptor, TachyonError};

static DESCRIPTOR: PassDescriptor = PassDescriptor {
  name: "dominance",
  description: "Computes immediate dominators",
  requires: &[],
  provides: &[Analysis::Dominance],
  invalidates: &[],
  runs_after: &[],
};

/// Read-only: refreshes the dominator tree when it is stale.
#[derive(Debug, Default)]
pub struct DominancePass;

impl Pass for DominancePass {
  fn descriptor(&self) -> &'static PassDescriptor {
    &DESCRIPTOR
  }

  fn run(
    &self,
    function: &mut FunctionMir,
    analyses: &mut AnalysisCache,
  ) -> Result<bool, TachyonError> {
    if !analyses.is_valid(Analysis::Dominance) {
      analyses.set_dominators(DominatorTree::compute(function));
    }
    Ok(false)
  }
}
