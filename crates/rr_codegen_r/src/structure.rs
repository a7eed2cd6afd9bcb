//! Rebuilds structured control flow from a reducible MIR CFG.
//!
//! Walks the CFG from the entry. A block with a single forward predecessor is
//! emitted in place at the jump that reaches it; a merge point is emitted once,
//! after the `if` of the block that dominates it. Loop headers open a
//! `repeat` whose follow block is emitted after it. Jumps resolve against the
//! stack of open constructs into fallthrough, `break` or `next`.

use rr_mir::{BlockId, DominatorTree, FunctionMir, Instr, MirProgram, Operand, Terminator, cfg};

use crate::{
  EmitError,
  expr::{ExprRenderer, Names},
};

/// Structured R statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RStmt {
  Line(String),
  If {
    condition: String,
    /// `!condition`, when negating cannot change which arm runs.
    negated: Option<String>,
    then_body: Vec<RStmt>,
    else_body: Vec<RStmt>,
  },
  Repeat(Vec<RStmt>),
  Break,
  Next,
  Return(Option<String>),
}

impl RStmt {
  fn is_abrupt(&self) -> bool {
    matches!(self, RStmt::Break | RStmt::Next | RStmt::Return(_))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
  /// The join of the innermost open `if`; reached by falling off an arm.
  Follow(BlockId),
  Loop { header: BlockId, follow: Option<BlockId> },
}

enum Exit {
  Fallthrough,
  Break,
  Next,
}

pub struct Structurizer<'a> {
  function: &'a FunctionMir,
  renderer: ExprRenderer<'a>,
  dominators: DominatorTree,
  preds: Vec<Vec<BlockId>>,
  frames: Vec<Frame>,
  emitted: Vec<bool>,
  temps: usize,
}

impl<'a> Structurizer<'a> {
  pub fn new(
    program: &MirProgram,
    function: &'a FunctionMir,
  ) -> Self {
    Self {
      function,
      renderer: ExprRenderer::new(program, function),
      dominators: DominatorTree::compute(function),
      preds: cfg::predecessors(function),
      frames: Vec::new(),
      emitted: vec![false; function.blocks.len()],
      temps: 0,
    }
  }

  /// The function body as structured statements.
  pub fn structure(mut self) -> Result<Vec<RStmt>, EmitError> {
    self.check_reducible()?;

    let mut body = self.declare_phis();
    self.emit_from(self.function.entry_block, &mut body)?;
    Ok(tidy(body))
  }

  fn unstructured(
    &self,
    detail: String,
  ) -> EmitError {
    EmitError::Unstructured {
      function: self.function.name.clone(),
      detail,
      span: self.function.span.clone(),
    }
  }

  fn label(
    &self,
    block: BlockId,
  ) -> &str {
    &self.function.block(block).label
  }

  fn check_reducible(&self) -> Result<(), EmitError> {
    let rpo = self.dominators.reverse_postorder();
    let mut position = vec![usize::MAX; self.function.blocks.len()];
    for (i, block) in rpo.iter().enumerate() {
      position[block.index() as usize] = i;
    }

    for &block in rpo {
      for succ in cfg::successors(self.function, block) {
        let retreating = position[succ.index() as usize] <= position[block.index() as usize];
        if retreating && !self.dominators.dominates(succ, block) {
          return Err(EmitError::Irreducible {
            function: self.function.name.clone(),
            block: self.label(succ).to_string(),
            span: self.function.block(succ).span.clone(),
          });
        }
      }
    }
    Ok(())
  }

  fn declare_phis(&self) -> Vec<RStmt> {
    let mut out = Vec::new();
    for &block in self.dominators.reverse_postorder() {
      for instr in self.function.block(block).phis() {
        if let Some(dest) = instr.dest() {
          out.push(RStmt::Line(format!("{} <- NULL", Names::value(dest))));
        }
      }
    }
    out
  }

  fn is_back_edge(
    &self,
    from: BlockId,
    to: BlockId,
  ) -> bool {
    self.dominators.dominates(to, from)
  }

  fn is_loop_header(
    &self,
    block: BlockId,
  ) -> bool {
    self.preds[block.index() as usize].iter().any(|&p| self.is_back_edge(p, block))
  }

  fn forward_preds(
    &self,
    block: BlockId,
  ) -> usize {
    self.preds[block.index() as usize]
      .iter()
      .filter(|&&p| self.dominators.is_reachable(p) && !self.is_back_edge(p, block))
      .count()
  }

  fn is_frame_target(
    &self,
    block: BlockId,
  ) -> bool {
    self.frames.iter().any(|frame| match *frame {
      Frame::Follow(join) => join == block,
      Frame::Loop { header, follow } => header == block || follow == Some(block),
    })
  }

  fn emit_from(
    &mut self,
    block: BlockId,
    out: &mut Vec<RStmt>,
  ) -> Result<(), EmitError> {
    let index = block.index() as usize;
    if self.emitted[index] {
      return Err(self.unstructured(format!("'{}' would be emitted twice", self.label(block))));
    }
    self.emitted[index] = true;

    if !self.is_loop_header(block) {
      return self.emit_block(block, out);
    }

    let follow = self.loop_follow(block)?;
    self.frames.push(Frame::Loop { header: block, follow });
    let mut body = Vec::new();
    let result = self.emit_block(block, &mut body);
    self.frames.pop();
    result?;

    strip_trailing_next(&mut body);
    out.push(RStmt::Repeat(body));

    match follow {
      Some(follow) => self.resume(follow, out),
      None => Ok(()),
    }
  }

  /// Continues after a construct whose successor is `target`.
  fn resume(
    &mut self,
    target: BlockId,
    out: &mut Vec<RStmt>,
  ) -> Result<(), EmitError> {
    match self.frame_exit(target)? {
      Some(exit) => {
        push_exit(exit, out);
        Ok(())
      },
      None => self.emit_from(target, out),
    }
  }

  fn emit_block(
    &mut self,
    block: BlockId,
    out: &mut Vec<RStmt>,
  ) -> Result<(), EmitError> {
    let function = self.function;
    let data = function.block(block);

    for instr in &data.instructions {
      self.emit_instruction(instr, out);
    }

    match &data.terminator {
      Terminator::Return(value) => {
        let value = value.as_ref().map(|v| self.renderer.operand(v).text);
        out.push(RStmt::Return(value));
        Ok(())
      },
      Terminator::Unreachable => {
        out.push(RStmt::Line("stop(\"unreachable code reached\")".to_string()));
        Ok(())
      },
      Terminator::Goto(target) => self.jump(block, *target, out),
      Terminator::Branch {
        condition,
        then_block,
        else_block,
      } => {
        let logical = self.renderer.is_logical(condition);
        let condition = self.renderer.operand(condition);
        let negated = logical.then(|| format!("!{}", condition.operand()));

        let join = self.join_of(block)?;
        if let Some(join) = join {
          self.frames.push(Frame::Follow(join));
        }
        let mut then_body = Vec::new();
        let mut else_body = Vec::new();
        let arms = self
          .jump(block, *then_block, &mut then_body)
          .and_then(|_| self.jump(block, *else_block, &mut else_body));
        if join.is_some() {
          self.frames.pop();
        }
        arms?;

        out.push(RStmt::If {
          condition: condition.text,
          negated,
          then_body,
          else_body,
        });

        match join {
          Some(join) => self.emit_from(join, out),
          None => Ok(()),
        }
      },
    }
  }

  fn emit_instruction(
    &mut self,
    instr: &Instr,
    out: &mut Vec<RStmt>,
  ) {
    match instr {
      Instr::Phi { .. } => {},
      Instr::Store { slot, value } => {
        let value = self.renderer.operand(value).text;
        out.push(RStmt::Line(format!("{} <- {}", self.renderer.names().slot(*slot), value)));
      },
      Instr::StoreIndex { slot, index, value } => {
        let index = self.renderer.operand(index).text;
        let value = self.renderer.operand(value).text;
        out.push(RStmt::Line(format!(
          "{}[{}] <- {}",
          self.renderer.names().slot(*slot),
          index,
          value
        )));
      },
      _ => {
        let Some(expr) = self.renderer.instruction(instr) else {
          return;
        };
        match instr.dest() {
          Some(dest) if self.renderer.is_inlined(dest) => self.renderer.defer(dest, expr),
          Some(dest) => out.push(RStmt::Line(format!("{} <- {}", Names::value(dest), expr.text))),
          None => out.push(RStmt::Line(expr.text)),
        }
      },
    }
  }

  /// The merge point emitted after the `if` ending `block`, if any.
  fn join_of(
    &self,
    block: BlockId,
  ) -> Result<Option<BlockId>, EmitError> {
    let joins: Vec<BlockId> = self
      .dominators
      .children(block)
      .iter()
      .copied()
      .filter(|&child| self.forward_preds(child) >= 2 && !self.is_frame_target(child))
      .collect();

    match joins.as_slice() {
      [] => Ok(None),
      [join] => Ok(Some(*join)),
      _ => Err(self.unstructured(format!("branch in '{}' has several join points", self.label(block)))),
    }
  }

  fn jump(
    &mut self,
    from: BlockId,
    to: BlockId,
    out: &mut Vec<RStmt>,
  ) -> Result<(), EmitError> {
    self.edge_copies(from, to, out);

    if let Some(exit) = self.frame_exit(to)? {
      push_exit(exit, out);
      return Ok(());
    }

    if self.is_back_edge(from, to) {
      return Err(self.unstructured(format!("'{}' jumps back into a loop it is not part of", self.label(from))));
    }
    if self.forward_preds(to) != 1 {
      return Err(self.unstructured(format!("'{}' is entered from several places", self.label(to))));
    }
    self.emit_from(to, out)
  }

  fn frame_exit(
    &self,
    target: BlockId,
  ) -> Result<Option<Exit>, EmitError> {
    let mut crossed_follow = false;
    let mut crossed_loop = false;

    for frame in self.frames.iter().rev() {
      match *frame {
        Frame::Follow(join) if join == target => {
          if crossed_follow || crossed_loop {
            return Err(self.unstructured(format!("jump to '{}' skips code after it", self.label(target))));
          }
          return Ok(Some(Exit::Fallthrough));
        },
        Frame::Follow(_) => crossed_follow = true,
        Frame::Loop { header, follow } if header == target || follow == Some(target) => {
          if crossed_loop {
            return Err(self.unstructured(format!(
              "jump to '{}' leaves more than one loop",
              self.label(target)
            )));
          }
          return Ok(Some(if header == target { Exit::Next } else { Exit::Break }));
        },
        Frame::Loop { .. } => crossed_loop = true,
      }
    }
    Ok(None)
  }

  fn natural_loop(
    &self,
    header: BlockId,
  ) -> Vec<bool> {
    let mut body = vec![false; self.function.blocks.len()];
    body[header.index() as usize] = true;

    let mut worklist: Vec<BlockId> = self.preds[header.index() as usize]
      .iter()
      .copied()
      .filter(|&p| self.is_back_edge(p, header))
      .collect();
    while let Some(block) = worklist.pop() {
      let index = block.index() as usize;
      if body[index] {
        continue;
      }
      body[index] = true;
      worklist.extend(self.preds[index].iter().copied());
    }
    body
  }

  /// The block control reaches when the loop at `header` ends normally.
  ///
  /// Exit blocks with a single predecessor are emitted inside the loop at
  /// the exiting jump; the walk continues through them to the first merge.
  fn loop_follow(
    &self,
    header: BlockId,
  ) -> Result<Option<BlockId>, EmitError> {
    let body = self.natural_loop(header);
    let in_body = |block: BlockId| body[block.index() as usize];

    let mut exits: Vec<BlockId> = Vec::new();
    for &block in self.dominators.reverse_postorder() {
      if !in_body(block) {
        continue;
      }
      for succ in cfg::successors(self.function, block) {
        if !in_body(succ) && !exits.contains(&succ) {
          exits.push(succ);
        }
      }
    }

    if exits.len() <= 1 {
      return Ok(exits.first().copied());
    }

    let mut follows: Vec<BlockId> = Vec::new();
    let mut seen: Vec<BlockId> = Vec::new();
    let mut worklist = exits;
    while let Some(block) = worklist.pop() {
      if seen.contains(&block) {
        continue;
      }
      seen.push(block);

      let merges = self.forward_preds(block) != 1 || self.is_loop_header(block) || self.is_frame_target(block);
      if merges {
        if !follows.contains(&block) {
          follows.push(block);
        }
        continue;
      }
      for succ in cfg::successors(self.function, block) {
        if !in_body(succ) {
          worklist.push(succ);
        }
      }
    }

    match follows.as_slice() {
      [] => Ok(None),
      [follow] => Ok(Some(*follow)),
      _ => Err(self.unstructured(format!("loop at '{}' leaves to several blocks", self.label(header)))),
    }
  }

  /// Assigns the phis of `to` for the edge from `from` as one parallel copy.
  fn edge_copies(
    &mut self,
    from: BlockId,
    to: BlockId,
    out: &mut Vec<RStmt>,
  ) {
    let function = self.function;
    let mut pending: Vec<(String, String, Option<String>)> = Vec::new();
    for instr in function.block(to).phis() {
      let Instr::Phi { dest, incoming } = instr else {
        continue;
      };
      let Some((_, operand)) = incoming.iter().find(|(block, _)| *block == from) else {
        continue;
      };

      let dest = Names::value(*dest);
      let reads = operand.as_value().map(Names::value);
      if reads.as_deref() == Some(dest.as_str()) {
        continue;
      }
      let source = match operand {
        Operand::Value(value) => Names::value(*value),
        other => self.renderer.operand(other).text,
      };
      pending.push((dest, source, reads));
    }

    while !pending.is_empty() {
      let ready = (0..pending.len()).find(|&i| {
        let dest = &pending[i].0;
        pending
          .iter()
          .enumerate()
          .all(|(j, (_, _, reads))| j == i || reads.as_deref() != Some(dest.as_str()))
      });

      match ready {
        Some(i) => {
          let (dest, source, _) = pending.remove(i);
          out.push(RStmt::Line(format!("{} <- {}", dest, source)));
        },
        None => {
          // Every remaining copy overwrites a value another one still reads.
          let saved = pending[0].0.clone();
          let temp = format!(".t{}", self.temps);
          self.temps += 1;
          out.push(RStmt::Line(format!("{} <- {}", temp, saved)));
          for (_, source, reads) in pending.iter_mut() {
            if reads.as_deref() == Some(saved.as_str()) {
              *source = temp.clone();
              *reads = None;
            }
          }
        },
      }
    }
  }
}

fn push_exit(
  exit: Exit,
  out: &mut Vec<RStmt>,
) {
  match exit {
    Exit::Fallthrough => {},
    Exit::Break => out.push(RStmt::Break),
    Exit::Next => out.push(RStmt::Next),
  }
}

/// Falling off the end of a `repeat` body already starts the next iteration.
fn strip_trailing_next(body: &mut Vec<RStmt>) {
  while matches!(body.last(), Some(RStmt::Next)) {
    body.pop();
  }
  if let Some(RStmt::If {
    then_body, else_body, ..
  }) = body.last_mut()
  {
    strip_trailing_next(then_body);
    strip_trailing_next(else_body);
  }
}

/// Flattens `if` statements with an abrupt arm into guard clauses.
fn tidy(statements: Vec<RStmt>) -> Vec<RStmt> {
  let mut out = Vec::with_capacity(statements.len());
  for statement in statements {
    match statement {
      RStmt::If {
        condition,
        negated,
        then_body,
        else_body,
      } => {
        let then_body = tidy(then_body);
        let else_body = tidy(else_body);
        let abrupt = |body: &[RStmt]| body.len() == 1 && body[0].is_abrupt();

        if !else_body.is_empty() && abrupt(then_body.as_slice()) {
          out.push(RStmt::If {
            condition,
            negated,
            then_body,
            else_body: Vec::new(),
          });
          out.extend(else_body);
          continue;
        }

        match negated {
          Some(inverse) if abrupt(else_body.as_slice()) || (then_body.is_empty() && !else_body.is_empty()) => {
            out.push(RStmt::If {
              condition: inverse,
              negated: Some(condition),
              then_body: else_body,
              else_body: Vec::new(),
            });
            out.extend(then_body);
          },
          negated => out.push(RStmt::If {
            condition,
            negated,
            then_body,
            else_body,
          }),
        }
      },
      RStmt::Repeat(body) => out.push(RStmt::Repeat(tidy(body))),
      other => out.push(other),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn if_(
    then_body: Vec<RStmt>,
    else_body: Vec<RStmt>,
  ) -> RStmt {
    RStmt::If {
      condition: "c".to_string(),
      negated: Some("!c".to_string()),
      then_body,
      else_body,
    }
  }

  fn line(text: &str) -> RStmt {
    RStmt::Line(text.to_string())
  }

  #[test]
  fn abrupt_then_arm_becomes_a_guard() {
    let tidied = tidy(vec![if_(vec![RStmt::Break], vec![line("x")])]);
    assert_eq!(tidied, vec![if_(vec![RStmt::Break], vec![]), line("x")]);
  }

  #[test]
  fn abrupt_else_arm_is_negated() {
    let tidied = tidy(vec![if_(vec![line("x")], vec![RStmt::Break])]);
    assert_eq!(
      tidied,
      vec![
        RStmt::If {
          condition: "!c".to_string(),
          negated: Some("c".to_string()),
          then_body: vec![RStmt::Break],
          else_body: vec![],
        },
        line("x"),
      ]
    );
  }

  #[test]
  fn conditions_of_unknown_type_are_not_negated() {
    let statement = RStmt::If {
      condition: "c".to_string(),
      negated: None,
      then_body: vec![line("x")],
      else_body: vec![RStmt::Break],
    };
    assert_eq!(tidy(vec![statement.clone()]), vec![statement]);
  }

  #[test]
  fn trailing_next_is_dropped_through_ifs() {
    let mut body = vec![line("x"), if_(vec![line("y"), RStmt::Next], vec![RStmt::Next])];
    strip_trailing_next(&mut body);
    assert_eq!(body, vec![line("x"), if_(vec![line("y")], vec![])]);
  }
}
