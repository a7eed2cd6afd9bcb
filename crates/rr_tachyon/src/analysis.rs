use rr_mir::DominatorTree;

use crate::{Analysis, TachyonError};

/// Analyses computed for the function currently being optimized.
#[derive(Debug, Default)]
pub struct AnalysisCache {
  dominators: Option<DominatorTree>,
}

impl AnalysisCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_valid(
    &self,
    analysis: Analysis,
  ) -> bool {
    match analysis {
      Analysis::Dominance => self.dominators.is_some(),
    }
  }

  pub fn invalidate(
    &mut self,
    analysis: Analysis,
  ) {
    match analysis {
      Analysis::Dominance => self.dominators = None,
    }
  }

  pub fn set_dominators(
    &mut self,
    tree: DominatorTree,
  ) {
    self.dominators = Some(tree);
  }

  /// The current dominator tree; `pass` names the consumer for the error.
  pub fn dominators(
    &self,
    pass: &str,
  ) -> Result<&DominatorTree, TachyonError> {
    self.dominators.as_ref().ok_or_else(|| TachyonError::MissingAnalysis {
      pass: pass.to_string(),
      analysis: Analysis::Dominance.name().to_string(),
    })
  }
}
