use crate::{Id, Store, span::Span, types::Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
  Variable,
  Parameter,
  Function { params: Vec<Type>, ret: Type },
  /// `arity: None` means variadic.
  Builtin { arity: Option<usize>, ret: Type },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
  pub name: String,
  pub ty: Type,
  /// Depth of the scope frame that declared the symbol. Builtins live at depth 0.
  pub depth: u32,
  pub mutable: bool,
  pub kind: SymbolKind,
  pub span: Option<Span>,
}

impl Symbol {
  pub fn is_callable(&self) -> bool {
    matches!(self.kind, SymbolKind::Function { .. } | SymbolKind::Builtin { .. })
  }

  pub fn is_builtin(&self) -> bool {
    matches!(self.kind, SymbolKind::Builtin { .. })
  }
}

pub type SymbolId = Id<Symbol>;

/// R functions RR code may call without declaring them.
pub const BUILTINS: &[(&str, Option<usize>, Type)] = &[
  ("print", Some(1), Type::Void),
  ("cat", None, Type::Void),
  ("paste", None, Type::Str),
  ("length", Some(1), Type::Int),
  ("c", None, Type::Vector),
  ("seq_len", Some(1), Type::Vector),
  ("sum", None, Type::Any),
  ("max", None, Type::Any),
  ("min", None, Type::Any),
  ("abs", Some(1), Type::Any),
  ("sqrt", Some(1), Type::Float),
  ("exp", Some(1), Type::Float),
  ("log", Some(1), Type::Float),
  ("floor", Some(1), Type::Float),
];

/// Every symbol declared in a compilation unit. Name lookup goes through the
/// analyzer's scope frames; this store only owns the symbol data.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
  symbols: Store<Symbol>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_builtins() -> Self {
    let mut table = Self::new();
    for (name, arity, ret) in BUILTINS {
      table.alloc(Symbol {
        name: (*name).to_string(),
        ty: *ret,
        depth: 0,
        mutable: false,
        kind: SymbolKind::Builtin { arity: *arity, ret: *ret },
        span: None,
      });
    }
    table
  }

  pub fn alloc(
    &mut self,
    symbol: Symbol,
  ) -> SymbolId {
    self.symbols.alloc(symbol)
  }

  pub fn get(
    &self,
    id: &SymbolId,
  ) -> &Symbol {
    self.symbols.get(id)
  }

  pub fn get_mut(
    &mut self,
    id: &SymbolId,
  ) -> &mut Symbol {
    self.symbols.get_mut(id)
  }

  pub fn name(
    &self,
    id: &SymbolId,
  ) -> &str {
    &self.symbols.get(id).name
  }

  pub fn builtins(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
    self.symbols.iter().filter(|(_, s)| s.is_builtin())
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtins_are_preloaded_at_depth_zero() {
    let table = SymbolTable::with_builtins();
    assert_eq!(table.builtins().count(), BUILTINS.len());
    assert!(table.builtins().all(|(_, s)| s.depth == 0 && !s.mutable));
  }
}
