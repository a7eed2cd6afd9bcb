use std::fmt::{self, Write};

use rr_type::symbol::SymbolKind;

use crate::{HIR, HIRId, HIRKind};

/// Indented tree dump of a unit's HIR, used by `--dump hir` and golden tests.
pub struct HIRPrinter<'a> {
  hir: &'a HIR,
  indent: usize,
  output: String,
}

impl<'a> HIRPrinter<'a> {
  pub fn new(hir: &'a HIR) -> Self {
    Self {
      hir,
      indent: 0,
      output: String::new(),
    }
  }

  pub fn print(mut self) -> String {
    // Writing into a String cannot fail.
    let _ = self.print_unit();
    self.output
  }

  fn print_unit(&mut self) -> fmt::Result {
    writeln!(self.output, "=== HIR ===")?;

    for function in self.hir.functions() {
      writeln!(self.output)?;
      self.indent = 0;
      self.print_node(function)?;
    }

    Ok(())
  }

  fn write_indent(&mut self) -> fmt::Result {
    write!(self.output, "{:width$}", "", width = self.indent * 2)
  }

  fn child(
    &mut self,
    label: &str,
    id: HIRId,
  ) -> fmt::Result {
    self.indent += 1;
    self.write_indent()?;
    writeln!(self.output, "{}:", label)?;
    self.indent += 1;
    self.print_node(id)?;
    self.indent -= 2;
    Ok(())
  }

  fn children(
    &mut self,
    ids: &[HIRId],
  ) -> fmt::Result {
    self.indent += 1;
    for id in ids {
      self.print_node(*id)?;
    }
    self.indent -= 1;
    Ok(())
  }

  fn print_node(
    &mut self,
    id: HIRId,
  ) -> fmt::Result {
    let hir = self.hir;
    let node = hir.get(id);
    let ty = node.ty;

    self.write_indent()?;

    match &node.kind {
      HIRKind::Literal(lit) => writeln!(self.output, "Literal({}) : {}", lit, ty),
      HIRKind::Variable(symbol) => {
        let param = if matches!(hir.symbols.get(symbol).kind, SymbolKind::Parameter) {
          " [param]"
        } else {
          ""
        };
        writeln!(self.output, "Variable({}{}) : {}", hir.symbols.name(symbol), param, ty)
      },
      HIRKind::Binary { operation, left, right } => {
        writeln!(self.output, "Binary({:?}) : {}", operation, ty)?;
        self.child("left", *left)?;
        self.child("right", *right)
      },
      HIRKind::Unary { operation, operand } => {
        writeln!(self.output, "Unary({:?}) : {}", operation, ty)?;
        self.children(&[*operand])
      },
      HIRKind::Call { callee, args } => {
        let builtin = if hir.symbols.get(callee).is_builtin() { " [builtin]" } else { "" };
        writeln!(self.output, "Call({}{}) : {}", hir.symbols.name(callee), builtin, ty)?;
        self.children(args)
      },
      HIRKind::Index { base, index } => {
        writeln!(self.output, "Index : {}", ty)?;
        self.child("base", *base)?;
        self.child("index", *index)
      },
      HIRKind::Vector { elements } => {
        writeln!(self.output, "Vector : {}", ty)?;
        self.children(elements)
      },
      HIRKind::Cast { expression, target } => {
        writeln!(self.output, "Cast(as {}) : {}", target, ty)?;
        self.children(&[*expression])
      },
      HIRKind::Let { symbol, value } => {
        let sym = hir.symbols.get(symbol);
        let mutable = if sym.mutable { "mut " } else { "" };
        writeln!(self.output, "Let({}{}: {})", mutable, sym.name, sym.ty)?;
        match value {
          Some(value) => self.children(&[*value]),
          None => Ok(()),
        }
      },
      HIRKind::Assign { target, value } => {
        writeln!(self.output, "Assign({})", hir.symbols.name(target))?;
        self.children(&[*value])
      },
      HIRKind::IndexAssign { target, index, value } => {
        writeln!(self.output, "IndexAssign({})", hir.symbols.name(target))?;
        self.child("index", *index)?;
        self.child("value", *value)
      },
      HIRKind::Block { statements, expression } => {
        writeln!(self.output, "Block : {}", ty)?;
        self.children(statements)?;
        match expression {
          Some(expression) => self.child("value", *expression),
          None => Ok(()),
        }
      },
      HIRKind::If {
        condition,
        then_branch,
        else_branch,
      } => {
        writeln!(self.output, "If : {}", ty)?;
        self.child("condition", *condition)?;
        self.child("then", *then_branch)?;
        match else_branch {
          Some(else_branch) => self.child("else", *else_branch),
          None => Ok(()),
        }
      },
      HIRKind::Loop { condition, body, update } => {
        writeln!(self.output, "Loop")?;
        self.child("condition", *condition)?;
        self.child("body", *body)?;
        match update {
          Some(update) => self.child("update", *update),
          None => Ok(()),
        }
      },
      HIRKind::Break => writeln!(self.output, "Break"),
      HIRKind::Continue => writeln!(self.output, "Continue"),
      HIRKind::Return(value) => {
        writeln!(self.output, "Return")?;
        match value {
          Some(value) => self.children(&[*value]),
          None => Ok(()),
        }
      },
      HIRKind::ExpressionStatement(expression) => {
        writeln!(self.output, "ExpressionStatement")?;
        self.children(&[*expression])
      },
      HIRKind::Function { symbol, params, body } => {
        let params: Vec<String> = params
          .iter()
          .map(|p| {
            let sym = hir.symbols.get(p);
            format!("{}: {}", sym.name, sym.ty)
          })
          .collect();
        writeln!(self.output, "fn {}({}): {}", hir.symbols.name(symbol), params.join(", "), ty)?;
        self.print_node_at(*body, self.indent + 1)
      },
      HIRKind::Error => writeln!(self.output, "Error"),
    }
  }

  fn print_node_at(
    &mut self,
    id: HIRId,
    indent: usize,
  ) -> fmt::Result {
    let saved = self.indent;
    self.indent = indent;
    self.print_node(id)?;
    self.indent = saved;
    Ok(())
  }
}
