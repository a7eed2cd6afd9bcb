use std::collections::HashMap;

use rr_type::{Id, Store, symbol::SymbolId};

pub type ScopeId = Id<Scope>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
  /// Builtins. Never popped.
  Global,
  /// Top-level function declarations of the unit.
  Module,
  Function,
  /// Body of the synthetic entry function. `return` is not allowed here.
  Entry,
  Block,
  Loop,
}

#[derive(Debug, Clone)]
pub struct Scope {
  pub parent: Option<ScopeId>,
  pub kind: ScopeKind,
  pub symbols: HashMap<String, SymbolId>,
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
  scopes: Store<Scope>,
  current: ScopeId,
}

impl Default for ScopeTree {
  fn default() -> Self {
    Self::new()
  }
}

impl ScopeTree {
  pub fn new() -> Self {
    let mut scopes = Store::new();
    let global = scopes.alloc(Scope {
      parent: None,
      kind: ScopeKind::Global,
      symbols: HashMap::new(),
    });

    Self {
      scopes,
      current: global,
    }
  }

  pub fn push(
    &mut self,
    kind: ScopeKind,
  ) -> ScopeId {
    let new = self.scopes.alloc(Scope {
      parent: Some(self.current),
      kind,
      symbols: HashMap::new(),
    });

    self.current = new;
    new
  }

  pub fn pop(&mut self) {
    if let Some(parent) = self.scopes.get(&self.current).parent {
      self.current = parent;
    }
  }

  /// Declares `name` in the current frame. Fails with the existing symbol when
  /// the frame already has one.
  pub fn define(
    &mut self,
    name: &str,
    symbol: SymbolId,
  ) -> Result<(), SymbolId> {
    let scope = self.scopes.get_mut(&self.current);

    match scope.symbols.get(name) {
      Some(existing) => Err(*existing),
      None => {
        scope.symbols.insert(name.to_string(), symbol);
        Ok(())
      },
    }
  }

  pub fn lookup(
    &self,
    name: &str,
  ) -> Option<SymbolId> {
    let mut current = Some(self.current);

    while let Some(id) = current {
      let scope = self.scopes.get(&id);
      if let Some(symbol) = scope.symbols.get(name) {
        return Some(*symbol);
      }
      current = scope.parent;
    }

    None
  }

  /// Number of frames between the current one and the global frame.
  pub fn depth(&self) -> u32 {
    let mut depth = 0;
    let mut current = self.scopes.get(&self.current).parent;

    while let Some(id) = current {
      depth += 1;
      current = self.scopes.get(&id).parent;
    }

    depth
  }

  pub fn current_kind(&self) -> ScopeKind {
    self.scopes.get(&self.current).kind
  }

  /// Walks outwards until the nearest function boundary looking for `kind`.
  fn enclosing(
    &self,
    wanted: ScopeKind,
  ) -> bool {
    let mut current = Some(self.current);

    while let Some(id) = current {
      let scope = self.scopes.get(&id);
      if scope.kind == wanted {
        return true;
      }
      if matches!(scope.kind, ScopeKind::Function | ScopeKind::Entry | ScopeKind::Module) {
        return false;
      }
      current = scope.parent;
    }

    false
  }

  pub fn in_loop(&self) -> bool {
    self.enclosing(ScopeKind::Loop)
  }

  pub fn in_function(&self) -> bool {
    self.enclosing(ScopeKind::Function)
  }
}
