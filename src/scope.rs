//! Stack-slot assignment for the locals of one function.
//!
//! There is no block scoping: every name used anywhere in a function shares
//! one flat namespace. Parameters come first, in declaration order, then the
//! body is walked once in source order and each new name takes the next slot.
//! Names never seen before are declared silently; there is no "undefined
//! variable" diagnostic.

use std::collections::HashMap;

use crate::parser::{AstNode, Function, Stmt};

/// Size of one stack slot.
pub const WORD_SIZE: i64 = 8;

/// Frames are padded so `rsp` stays 16-byte aligned after the prologue.
const FRAME_ALIGN: i64 = 16;

#[derive(Debug, Clone, Default)]
pub struct Scope {
  names: Vec<String>,
  slots: HashMap<String, usize>,
}

impl Scope {
  pub fn of(function: &Function) -> Self {
    let mut scope = Self::default();
    for param in &function.params {
      scope.declare(param);
    }
    for stmt in &function.body {
      scope.collect_stmt(stmt);
    }
    scope
  }

  /// Declare `name` if it is new and return its offset below `rbp`.
  pub fn declare(&mut self, name: &str) -> i64 {
    let slot = match self.slots.get(name) {
      Some(&slot) => slot,
      None => {
        let slot = self.names.len();
        self.names.push(name.to_string());
        self.slots.insert(name.to_string(), slot);
        slot
      }
    };
    slot_offset(slot)
  }

  /// Positive distance below `rbp`; the first slot is at 8 so no local ever
  /// overlaps the saved base pointer.
  pub fn offset(&self, name: &str) -> Option<i64> {
    self.slots.get(name).copied().map(slot_offset)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// Names in slot order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }

  /// Bytes reserved by the prologue.
  pub fn frame_size(&self) -> i64 {
    let bytes = self.names.len() as i64 * WORD_SIZE;
    (bytes + FRAME_ALIGN - 1) / FRAME_ALIGN * FRAME_ALIGN
  }

  fn collect_stmt(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::Expr(expr) | Stmt::Return(expr) => self.collect_expr(expr),
      Stmt::If {
        cond,
        then,
        otherwise,
      } => {
        self.collect_expr(cond);
        self.collect_stmt(then);
        if let Some(otherwise) = otherwise {
          self.collect_stmt(otherwise);
        }
      }
      Stmt::While { cond, body } => {
        self.collect_expr(cond);
        self.collect_stmt(body);
      }
      Stmt::For {
        init,
        cond,
        step,
        body,
      } => {
        self.collect_expr(init);
        self.collect_expr(cond);
        self.collect_expr(step);
        self.collect_stmt(body);
      }
      Stmt::Block(stmts) => {
        for stmt in stmts {
          self.collect_stmt(stmt);
        }
      }
    }
  }

  fn collect_expr(&mut self, expr: &AstNode) {
    match expr {
      AstNode::Num { .. } => {}
      AstNode::Var { name } => {
        self.declare(name);
      }
      AstNode::Pos { operand }
      | AstNode::Neg { operand }
      | AstNode::Addr { operand }
      | AstNode::Deref { operand } => self.collect_expr(operand),
      AstNode::Binary { lhs, rhs, .. } | AstNode::Assign { lhs, rhs } => {
        self.collect_expr(lhs);
        self.collect_expr(rhs);
      }
      AstNode::Call { args, .. } => {
        for arg in args {
          self.collect_expr(arg);
        }
      }
    }
  }
}

fn slot_offset(slot: usize) -> i64 {
  (slot as i64 + 1) * WORD_SIZE
}
