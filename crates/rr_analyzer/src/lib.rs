//! HIR Builder: resolves names against scoped frames, type-checks and desugars
//! a unit's AST into canonical HIR.

mod lowering;
mod scope;
mod typeck;

use rr_ast::{ASTNode, ASTProgram, NodeId, statements::ASTStatement};
use rr_diagnostics::{diagnostic_report::Diagnostic, message::DiagnosticMessage};
use rr_hir::{ENTRY_FUNCTION, HIR, HIRId, HIRKind, HIRNode};
use rr_type::{
  span::Span,
  symbol::{Symbol, SymbolId, SymbolKind, SymbolTable},
  types::Type,
};

pub use scope::{ScopeId, ScopeKind, ScopeTree};

/// Builds the HIR of one unit.
///
/// All diagnostics of the unit are collected; the unit fails when any of them
/// is an error.
pub fn build_hir(
  ast: &ASTProgram,
  symbols: SymbolTable,
) -> Result<HIR, Vec<Diagnostic>> {
  HirBuilder::new(ast, symbols).build()
}

pub struct HirBuilder<'a> {
  ast: &'a ASTProgram,
  hir: HIR,
  scopes: ScopeTree,
  diagnostics: Vec<Diagnostic>,
  /// Declared return type of the function being lowered.
  return_type: Option<Type>,
  hidden_counter: u32,
}

impl<'a> HirBuilder<'a> {
  pub fn new(
    ast: &'a ASTProgram,
    symbols: SymbolTable,
  ) -> Self {
    let mut scopes = ScopeTree::new();
    for (id, symbol) in symbols.builtins() {
      // Builtin names are unique by construction.
      let _ = scopes.define(&symbol.name, id);
    }

    Self {
      ast,
      hir: HIR::new(symbols),
      scopes,
      diagnostics: Vec::new(),
      return_type: None,
      hidden_counter: 0,
    }
  }

  pub fn build(mut self) -> Result<HIR, Vec<Diagnostic>> {
    let ast = self.ast;
    self.scopes.push(ScopeKind::Module);

    let mut functions = Vec::new();
    let mut entry_statements = Vec::new();

    for root in &ast.roots {
      match ast.get(root) {
        ASTNode::Statement(ASTStatement::Function(function)) => {
          if let Some(symbol) = self.declare_function(function) {
            functions.push((*root, symbol));
          }
        },
        _ => entry_statements.push(*root),
      }
    }

    for (node, symbol) in functions {
      let id = self.lower_function(&node, symbol);
      self.hir.items.push(id);
    }

    if !entry_statements.is_empty() {
      let entry = self.lower_entry(&entry_statements);
      self.hir.items.push(entry);
      self.hir.entry = Some(entry);
    }

    if self.diagnostics.iter().any(|d| d.is_error()) {
      return Err(self.diagnostics);
    }

    Ok(self.hir)
  }

  fn report(
    &mut self,
    message: DiagnosticMessage,
  ) {
    self.diagnostics.push(message.report());
  }

  /// Runs `f` inside a fresh frame of `kind`. The frame is released on every
  /// path out of `f`.
  fn with_scope<R>(
    &mut self,
    kind: ScopeKind,
    f: impl FnOnce(&mut Self) -> R,
  ) -> R {
    self.scopes.push(kind);
    let result = f(self);
    self.scopes.pop();
    result
  }

  fn alloc(
    &mut self,
    kind: HIRKind,
    span: Span,
    ty: Type,
  ) -> HIRId {
    self.hir.alloc(HIRNode { kind, span, ty })
  }

  fn error_node(
    &mut self,
    span: Span,
  ) -> HIRId {
    self.alloc(HIRKind::Error, span, Type::Any)
  }

  /// Declares a symbol in the current frame, reporting re-declarations.
  fn declare(
    &mut self,
    name: &str,
    ty: Type,
    mutable: bool,
    kind: SymbolKind,
    span: &Span,
  ) -> SymbolId {
    let symbol = self.hir.symbols.alloc(Symbol {
      name: name.to_string(),
      ty,
      depth: self.scopes.depth(),
      mutable,
      kind,
      span: Some(span.clone()),
    });

    if let Err(existing) = self.scopes.define(name, symbol) {
      let previous_span = self.hir.symbols.get(&existing).span.clone();
      self.report(DiagnosticMessage::DuplicateDeclaration {
        name: name.to_string(),
        span: span.clone(),
        previous_span,
      });
    }

    symbol
  }

  /// Compiler-introduced local, invisible to user code.
  fn declare_hidden(
    &mut self,
    prefix: &str,
    ty: Type,
    mutable: bool,
    span: &Span,
  ) -> SymbolId {
    let name = format!(".{}_{}", prefix, self.hidden_counter);
    self.hidden_counter += 1;
    self.declare(&name, ty, mutable, SymbolKind::Variable, span)
  }

  fn declare_function(
    &mut self,
    function: &rr_ast::statements::ASTFunction,
  ) -> Option<SymbolId> {
    let params = function
      .parameters
      .iter()
      .map(|p| p.type_annotation.unwrap_or(Type::Any))
      .collect();
    let ret = function.return_type.unwrap_or(Type::Any);

    let before = self.diagnostics.len();
    let symbol = self.declare(&function.name, ret, false, SymbolKind::Function { params, ret }, &function.span);

    // A rejected duplicate keeps its diagnostic but is not lowered.
    if self.diagnostics.len() > before {
      return None;
    }
    Some(symbol)
  }

  fn lower_function(
    &mut self,
    node: &NodeId,
    symbol: SymbolId,
  ) -> HIRId {
    let ast = self.ast;
    let ASTNode::Statement(ASTStatement::Function(function)) = ast.get(node) else {
      return self.error_node(ast.get(node).span().clone());
    };

    let ret = function.return_type.unwrap_or(Type::Any);
    let saved_return = self.return_type.replace(ret);

    let (params, body) = self.with_scope(ScopeKind::Function, |this| {
      let params: Vec<SymbolId> = function
        .parameters
        .iter()
        .map(|p| {
          let ty = p.type_annotation.unwrap_or(Type::Any);
          this.declare(&p.name, ty, true, SymbolKind::Parameter, &p.span)
        })
        .collect();

      let body = this.lower_body(&function.body, ret != Type::Void);
      (params, body)
    });

    self.return_type = saved_return;

    self.alloc(HIRKind::Function { symbol, params, body }, function.span.clone(), ret)
  }

  fn lower_entry(
    &mut self,
    statements: &[NodeId],
  ) -> HIRId {
    let ast = self.ast;
    let span = match (statements.first(), statements.last()) {
      (Some(first), Some(last)) => Span::merge(ast.get(first).span(), ast.get(last).span()),
      _ => Span::default(),
    };

    let symbol = self.hir.symbols.alloc(Symbol {
      name: ENTRY_FUNCTION.to_string(),
      ty: Type::Void,
      depth: self.scopes.depth(),
      mutable: false,
      kind: SymbolKind::Function {
        params: Vec::new(),
        ret: Type::Void,
      },
      span: Some(span.clone()),
    });

    let saved_return = self.return_type.replace(Type::Void);
    let body = self.with_scope(ScopeKind::Entry, |this| {
      let lowered = this.lower_statements(statements);
      this.alloc(
        HIRKind::Block {
          statements: lowered,
          expression: None,
        },
        span.clone(),
        Type::Void,
      )
    });
    self.return_type = saved_return;

    self.alloc(
      HIRKind::Function {
        symbol,
        params: Vec::new(),
        body,
      },
      span,
      Type::Void,
    )
  }
}
