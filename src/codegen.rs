//! Code generation: lower the parsed program into Intel-syntax x86-64
//! assembly.
//!
//! The emitter is a stack machine: every expression leaves exactly one value
//! on the stack and every statement leaves the stack as it found it. Locals
//! live in the frame below `rbp` at the offsets assigned by [`Scope`].

use tracing::{debug, trace};

use crate::dump;
use crate::error::{CompileError, CompileResult};
use crate::parser::{AstNode, BinaryOp, Function, MAX_ARGS, Program, Stmt};
use crate::scope::Scope;

/// Integer argument registers, in argument order.
const ARG_REGS: [&str; MAX_ARGS] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

/// Emit the assembly translation unit for a whole program.
pub fn generate(program: &Program) -> CompileResult<String> {
  let mut codegen = Codegen::default();
  codegen.asm.push_str(".intel_syntax noprefix\n");
  codegen.asm.push_str(".global main\n");
  for function in &program.functions {
    codegen.emit_function(function)?;
  }
  Ok(codegen.asm)
}

#[derive(Debug, Clone, Copy)]
enum LabelKind {
  If,
  IfElse,
  While,
  For,
}

/// Hands out label numbers, one sequence per construct kind. A fresh
/// allocator starts every compilation at zero.
#[derive(Debug, Default)]
struct LabelAllocator {
  counters: [u32; 4],
}

impl LabelAllocator {
  fn next(&mut self, kind: LabelKind) -> u32 {
    let counter = &mut self.counters[kind as usize];
    let id = *counter;
    *counter += 1;
    trace!(?kind, id, "allocated label");
    id
  }
}

#[derive(Debug, Default)]
struct Codegen {
  asm: String,
  labels: LabelAllocator,
  scope: Scope,
  /// Values currently pushed above the frame, used to keep `rsp` 16-byte
  /// aligned at calls.
  depth: usize,
}

impl Codegen {
  fn emit(&mut self, instruction: &str) {
    self.asm.push_str("  ");
    self.asm.push_str(instruction);
    self.asm.push('\n');
  }

  fn label(&mut self, name: &str) {
    self.asm.push_str(name);
    self.asm.push_str(":\n");
  }

  fn push(&mut self, operand: &str) {
    self.emit(&format!("push {operand}"));
    self.depth += 1;
  }

  fn pop(&mut self, register: &str) {
    self.emit(&format!("pop {register}"));
    self.depth -= 1;
  }

  fn epilogue(&mut self) {
    self.emit("mov rsp, rbp");
    self.emit("pop rbp");
    self.emit("ret");
  }

  fn emit_function(&mut self, function: &Function) -> CompileResult<()> {
    if function.params.len() > MAX_ARGS {
      return Err(CompileError::semantic(format!(
        "function \"{}\" takes {} parameters, at most {MAX_ARGS} are supported",
        function.name,
        function.params.len()
      )));
    }

    self.scope = Scope::of(function);
    self.depth = 0;
    let frame_size = self.scope.frame_size();
    debug!(
      name = %function.name,
      locals = self.scope.len(),
      frame_size,
      "emitting function"
    );

    self.label(&function.name);
    self.emit("push rbp");
    self.emit("mov rbp, rsp");
    if frame_size > 0 {
      self.emit(&format!("sub rsp, {frame_size}"));
    }

    for (param, register) in function.params.iter().zip(ARG_REGS) {
      let offset = self.local_offset(param)?;
      self.emit(&format!("mov [rbp-{offset}], {register}"));
    }

    for stmt in &function.body {
      self.emit_stmt(stmt)?;
    }

    self.epilogue();
    Ok(())
  }

  fn emit_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
    match stmt {
      Stmt::Expr(expr) => {
        self.emit_expr(expr)?;
        self.pop("rax");
      }
      Stmt::Return(expr) => {
        self.emit_expr(expr)?;
        self.pop("rax");
        self.epilogue();
      }
      Stmt::If {
        cond,
        then,
        otherwise: None,
      } => {
        let id = self.labels.next(LabelKind::If);
        let end = format!(".Lifend{id}");
        self.emit_cond(cond, &end)?;
        self.emit_stmt(then)?;
        self.label(&end);
      }
      Stmt::If {
        cond,
        then,
        otherwise: Some(otherwise),
      } => {
        let id = self.labels.next(LabelKind::IfElse);
        let else_label = format!(".Lifelseelse{id}");
        let end = format!(".Lifelseend{id}");
        self.emit_cond(cond, &else_label)?;
        self.emit_stmt(then)?;
        self.emit(&format!("jmp {end}"));
        self.label(&else_label);
        self.emit_stmt(otherwise)?;
        self.label(&end);
      }
      Stmt::While { cond, body } => {
        let id = self.labels.next(LabelKind::While);
        let begin = format!(".Lwhilebegin{id}");
        let end = format!(".Lwhileend{id}");
        self.label(&begin);
        self.emit_cond(cond, &end)?;
        self.emit_stmt(body)?;
        self.emit(&format!("jmp {begin}"));
        self.label(&end);
      }
      Stmt::For {
        init,
        cond,
        step,
        body,
      } => {
        let id = self.labels.next(LabelKind::For);
        let begin = format!(".Lforbegin{id}");
        let end = format!(".Lforend{id}");
        self.emit_expr(init)?;
        self.pop("rax");
        self.label(&begin);
        self.emit_cond(cond, &end)?;
        self.emit_stmt(body)?;
        self.emit_expr(step)?;
        self.pop("rax");
        self.emit(&format!("jmp {begin}"));
        self.label(&end);
      }
      Stmt::Block(stmts) => {
        for stmt in stmts {
          self.emit_stmt(stmt)?;
        }
      }
    }
    Ok(())
  }

  /// Evaluate a condition and jump to `target` when it is zero.
  fn emit_cond(&mut self, cond: &AstNode, target: &str) -> CompileResult<()> {
    self.emit_expr(cond)?;
    self.pop("rax");
    self.emit("cmp rax, 0");
    self.emit(&format!("je {target}"));
    Ok(())
  }

  fn emit_expr(&mut self, node: &AstNode) -> CompileResult<()> {
    match node {
      AstNode::Num { value } => {
        if i32::try_from(*value).is_ok() {
          self.push(&value.to_string());
        } else {
          self.emit(&format!("mov rax, {value}"));
          self.push("rax");
        }
      }
      AstNode::Var { .. } => {
        self.emit_addr(node, "cannot load from")?;
        self.load();
      }
      AstNode::Pos { operand } => self.emit_expr(operand)?,
      AstNode::Neg { operand } => {
        self.emit_expr(operand)?;
        self.pop("rax");
        self.emit("neg rax");
        self.push("rax");
      }
      AstNode::Addr { operand } => self.emit_addr(operand, "cannot take the address of")?,
      AstNode::Deref { operand } => {
        self.emit_expr(operand)?;
        self.load();
      }
      AstNode::Binary { op, lhs, rhs } => {
        self.emit_expr(lhs)?;
        self.emit_expr(rhs)?;
        self.pop("rdi");
        self.pop("rax");
        self.emit_binary(*op);
        self.push("rax");
      }
      AstNode::Assign { lhs, rhs } => {
        self.emit_addr(lhs, "left-hand side of assignment is not an lvalue:")?;
        self.emit_expr(rhs)?;
        self.pop("rdi");
        self.pop("rax");
        self.emit("mov [rax], rdi");
        self.push("rdi");
      }
      AstNode::Call { name, args } => self.emit_call(name, args)?,
    }
    Ok(())
  }

  /// Replace the address on top of the stack with the value it points to.
  fn load(&mut self) {
    self.pop("rax");
    self.emit("mov rax, [rax]");
    self.push("rax");
  }

  /// Push the address of an lvalue. `what` prefixes the diagnostic for
  /// anything else.
  fn emit_addr(&mut self, node: &AstNode, what: &str) -> CompileResult<()> {
    match node {
      AstNode::Var { name } => {
        let offset = self.local_offset(name)?;
        self.emit("mov rax, rbp");
        self.emit(&format!("sub rax, {offset}"));
        self.push("rax");
        Ok(())
      }
      AstNode::Deref { operand } => self.emit_expr(operand),
      _ => Err(CompileError::semantic(format!(
        "{what} {}",
        dump::expression(node)
      ))),
    }
  }

  /// Left operand in `rax`, right in `rdi`; the result replaces `rax`.
  fn emit_binary(&mut self, op: BinaryOp) {
    match op {
      BinaryOp::Add => self.emit("add rax, rdi"),
      BinaryOp::Sub => self.emit("sub rax, rdi"),
      BinaryOp::Mul => self.emit("imul rax, rdi"),
      BinaryOp::Div => {
        self.emit("cqo");
        self.emit("idiv rdi");
      }
      BinaryOp::Eq => self.emit_compare("sete"),
      BinaryOp::Ne => self.emit_compare("setne"),
      BinaryOp::Lt => self.emit_compare("setl"),
      BinaryOp::Le => self.emit_compare("setle"),
      BinaryOp::Gt => self.emit_compare("setg"),
      BinaryOp::Ge => self.emit_compare("setge"),
    }
  }

  /// Result is exactly 0 or 1.
  fn emit_compare(&mut self, set: &str) {
    self.emit("cmp rax, rdi");
    self.emit(&format!("{set} al"));
    self.emit("movzx rax, al");
  }

  /// Arguments are evaluated right to left so popping them left to right
  /// fills the registers in declaration order.
  fn emit_call(&mut self, name: &str, args: &[AstNode]) -> CompileResult<()> {
    if args.len() > MAX_ARGS {
      return Err(CompileError::semantic(format!(
        "call to \"{name}\" passes {} arguments, at most {MAX_ARGS} are supported",
        args.len()
      )));
    }

    for arg in args.iter().rev() {
      self.emit_expr(arg)?;
    }
    for register in ARG_REGS.iter().take(args.len()) {
      self.pop(register);
    }

    if self.depth % 2 == 1 {
      self.emit("sub rsp, 8");
      self.emit(&format!("call {name}"));
      self.emit("add rsp, 8");
    } else {
      self.emit(&format!("call {name}"));
    }
    self.push("rax");
    Ok(())
  }

  fn local_offset(&self, name: &str) -> CompileResult<i64> {
    self
      .scope
      .offset(name)
      .ok_or_else(|| CompileError::semantic(format!("no stack slot for \"{name}\"")))
  }
}
