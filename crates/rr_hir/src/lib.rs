pub mod display;
pub mod operation;

use rr_type::{
  Id, Store,
  span::Span,
  symbol::{SymbolId, SymbolTable},
  types::Type,
  value::LiteralValue,
};

pub type HIRId = Id<HIRNode>;

/// Name of the synthetic function holding a unit's top-level statements.
pub const ENTRY_FUNCTION: &str = ".rr_main";

/// Canonical node kinds. Compound assignment, `for`, `while` and `repeat` never
/// reach this level; the builder rewrites them into `Assign`, `Let` and `Loop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HIRKind {
  // Expression
  Literal(LiteralValue),
  Variable(SymbolId),
  Binary {
    operation: operation::BinaryOperation,
    left: HIRId,
    right: HIRId,
  },
  Unary {
    operation: operation::UnaryOperation,
    operand: HIRId,
  },
  Call {
    callee: SymbolId,
    args: Vec<HIRId>,
  },
  Index {
    base: HIRId,
    index: HIRId,
  },
  Vector {
    elements: Vec<HIRId>,
  },
  Cast {
    expression: HIRId,
    target: Type,
  },

  // Statement
  Let {
    symbol: SymbolId,
    value: Option<HIRId>,
  },
  Assign {
    target: SymbolId,
    value: HIRId,
  },
  IndexAssign {
    target: SymbolId,
    index: HIRId,
    value: HIRId,
  },
  Block {
    statements: Vec<HIRId>,
    expression: Option<HIRId>,
  },
  If {
    condition: HIRId,
    then_branch: HIRId,
    else_branch: Option<HIRId>,
  },
  /// `condition` is evaluated before every iteration. `update` runs after the
  /// body and on `Continue`.
  Loop {
    condition: HIRId,
    body: HIRId,
    update: Option<HIRId>,
  },
  Break,
  Continue,
  Return(Option<HIRId>),
  ExpressionStatement(HIRId),
  Function {
    symbol: SymbolId,
    params: Vec<SymbolId>,
    body: HIRId,
  },

  // Error recovery
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HIRNode {
  pub kind: HIRKind,
  pub span: Span,
  pub ty: Type,
}

/// HIR of one compilation unit.
#[derive(Debug, Clone)]
pub struct HIR {
  pub nodes: Store<HIRNode>,
  /// `Function` nodes in declaration order; the synthetic entry function is last.
  pub items: Vec<HIRId>,
  pub entry: Option<HIRId>,
  pub symbols: SymbolTable,
}

impl Default for HIR {
  fn default() -> Self {
    Self::new(SymbolTable::with_builtins())
  }
}

impl HIR {
  pub fn new(symbols: SymbolTable) -> Self {
    Self {
      nodes: Store::new(),
      items: Vec::new(),
      entry: None,
      symbols,
    }
  }

  pub fn alloc(
    &mut self,
    node: HIRNode,
  ) -> HIRId {
    self.nodes.alloc(node)
  }

  pub fn get(
    &self,
    id: HIRId,
  ) -> &HIRNode {
    self.nodes.get(&id)
  }

  pub fn get_mut(
    &mut self,
    id: HIRId,
  ) -> &mut HIRNode {
    self.nodes.get_mut(&id)
  }

  /// Function nodes in emission order, entry included.
  pub fn functions(&self) -> impl Iterator<Item = HIRId> + '_ {
    self.items.iter().copied()
  }

  pub fn function_name(
    &self,
    function: HIRId,
  ) -> &str {
    match &self.get(function).kind {
      HIRKind::Function { symbol, .. } => self.symbols.name(symbol),
      _ => "<not a function>",
    }
  }
}
