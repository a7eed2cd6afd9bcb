pub mod builder;
pub mod expressions;
pub mod statements;

use rr_type::{Id, Store, file::FileId, span::Span};

use crate::expressions::ASTExpression;
use crate::statements::ASTStatement;

pub type NodeId = Id<ASTNode>;

#[derive(Debug, PartialEq, Clone)]
pub enum ASTNode {
  Expression(ASTExpression),
  Statement(ASTStatement),
}

impl ASTNode {
  pub fn span(&self) -> &Span {
    match self {
      ASTNode::Expression(expr) => expr.span(),
      ASTNode::Statement(stmt) => stmt.span(),
    }
  }
}

/// One parsed compilation unit as handed over by the front-end.
///
/// Nodes reference each other through [`NodeId`]; `roots` are the top-level
/// statements in source order.
#[derive(Debug, Clone, Default)]
pub struct ASTProgram {
  pub file: FileId,
  pub nodes: Store<ASTNode>,
  pub roots: Vec<NodeId>,
}

impl ASTProgram {
  pub fn new(file: FileId) -> Self {
    Self {
      file,
      nodes: Store::new(),
      roots: Vec::new(),
    }
  }

  pub fn get(
    &self,
    id: &NodeId,
  ) -> &ASTNode {
    self.nodes.get(id)
  }
}
