//! Read-only textual views of the token stream and the AST, written out by
//! the driver for debugging.
//!
//! The AST outline puts one construct per line, indents two spaces per level
//! and spells operators in prefix form, e.g. `(+ a 1)`.

use crate::parser::{AstNode, Function, Program, Stmt};
use crate::tokenizer::Token;

/// `{tok, tok, ...}` in source order.
pub fn tokens(tokens: &[Token]) -> String {
  let texts: Vec<&str> = tokens.iter().map(|token| token.text.as_str()).collect();
  format!("{{{}}}", texts.join(", "))
}

/// Single-line prefix rendering of an expression, used in diagnostics.
pub fn expression(node: &AstNode) -> String {
  match node {
    AstNode::Num { value } => value.to_string(),
    AstNode::Var { name } => name.clone(),
    AstNode::Pos { operand }
    | AstNode::Neg { operand }
    | AstNode::Addr { operand }
    | AstNode::Deref { operand } => format!("({} {})", operator(node), expression(operand)),
    AstNode::Binary { lhs, rhs, .. } | AstNode::Assign { lhs, rhs } => format!(
      "({} {} {})",
      operator(node),
      expression(lhs),
      expression(rhs)
    ),
    AstNode::Call { name, args } => {
      let args: Vec<String> = args.iter().map(expression).collect();
      format!("{name}({})", args.join(", "))
    }
  }
}

/// Indented outline of the whole program.
pub fn program(program: &Program) -> String {
  let mut printer = Printer::default();
  for function in &program.functions {
    printer.function(function);
  }
  printer.out
}

fn operator(node: &AstNode) -> &'static str {
  match node {
    AstNode::Pos { .. } => "+",
    AstNode::Neg { .. } => "-",
    AstNode::Addr { .. } => "&",
    AstNode::Deref { .. } => "*",
    AstNode::Assign { .. } => "=",
    AstNode::Binary { op, .. } => op.symbol(),
    AstNode::Num { .. } | AstNode::Var { .. } | AstNode::Call { .. } => "",
  }
}

#[derive(Default)]
struct Printer {
  out: String,
  depth: usize,
}

impl Printer {
  fn line(&mut self, text: &str) {
    self.out.push_str(&"  ".repeat(self.depth));
    self.out.push_str(text);
    self.out.push('\n');
  }

  fn nested(&mut self, f: impl FnOnce(&mut Self)) {
    self.depth += 1;
    f(self);
    self.depth -= 1;
  }

  fn function(&mut self, function: &Function) {
    self.line(&format!("{}({}) {{", function.name, function.params.join(", ")));
    self.nested(|p| {
      for stmt in &function.body {
        p.stmt(stmt);
      }
    });
    self.line("}");
  }

  fn stmt(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::Expr(expr) => self.expr(expr),
      Stmt::Return(expr) if expr.is_leaf() => {
        self.line(&format!("return {};", expression(expr)));
      }
      Stmt::Return(expr) => {
        self.line("return (");
        self.nested(|p| p.expr(expr));
        self.line(");");
      }
      Stmt::If {
        cond,
        then,
        otherwise,
      } => {
        self.line("if (");
        self.nested(|p| p.expr(cond));
        self.line(") {");
        self.nested(|p| p.stmt(then));
        if let Some(otherwise) = otherwise {
          self.line("} else {");
          self.nested(|p| p.stmt(otherwise));
        }
        self.line("}");
      }
      Stmt::While { cond, body } => {
        self.line("while (");
        self.nested(|p| p.expr(cond));
        self.line(") {");
        self.nested(|p| p.stmt(body));
        self.line("}");
      }
      Stmt::For {
        init,
        cond,
        step,
        body,
      } => {
        self.line("for (");
        self.nested(|p| {
          p.expr(init);
          p.expr(cond);
          p.expr(step);
        });
        self.line(") {");
        self.nested(|p| p.stmt(body));
        self.line("}");
      }
      Stmt::Block(stmts) => {
        self.line("{");
        self.nested(|p| {
          for stmt in stmts {
            p.stmt(stmt);
          }
        });
        self.line("}");
      }
    }
  }

  fn expr(&mut self, node: &AstNode) {
    match node {
      AstNode::Num { .. } | AstNode::Var { .. } => self.line(&expression(node)),
      AstNode::Pos { operand }
      | AstNode::Neg { operand }
      | AstNode::Addr { operand }
      | AstNode::Deref { operand } => {
        let op = operator(node);
        if operand.is_leaf() {
          self.line(&format!("{op}{}", expression(operand)));
        } else {
          self.line(&format!("{op}("));
          self.nested(|p| p.expr(operand));
          self.line(")");
        }
      }
      AstNode::Binary { lhs, rhs, .. } | AstNode::Assign { lhs, rhs } => {
        if lhs.is_leaf() && rhs.is_leaf() {
          self.line(&expression(node));
        } else {
          self.line(&format!("({}", operator(node)));
          self.nested(|p| {
            p.expr(lhs);
            p.expr(rhs);
          });
          self.line(")");
        }
      }
      AstNode::Call { name, args } => {
        if args.iter().all(AstNode::is_leaf) {
          self.line(&expression(node));
        } else {
          self.line(&format!("{name}("));
          self.nested(|p| {
            for arg in args {
              p.expr(arg);
            }
          });
          self.line(")");
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::{Dialect, parse};
  use crate::tokenizer::tokenize;

  fn outline(source: &str, dialect: Dialect) -> String {
    program(&parse(tokenize(source).unwrap(), source, dialect).unwrap())
  }

  #[test]
  fn token_dump_is_braced_list() {
    assert_eq!(tokens(&tokenize("a = 1;").unwrap()), "{a, =, 1, ;}");
    assert_eq!(tokens(&[]), "{}");
  }

  #[test]
  fn expression_is_prefix_notation() {
    let source = "a = -(1 + b) * f(2, &c)";
    let program = parse(tokenize(source).unwrap(), source, Dialect::Expression).unwrap();
    let Stmt::Return(expr) = &program.functions[0].body[0] else {
      panic!("expected return");
    };
    assert_eq!(expression(expr), "(= a (* (- (+ 1 b)) f(2, (& c))))");
  }

  #[test]
  fn nested_binary_spans_lines() {
    assert_eq!(
      outline("1 + 2 * 3", Dialect::Expression),
      "main() {\n  return (\n    (+\n      1\n      (* 2 3)\n    )\n  );\n}\n"
    );
  }

  #[test]
  fn statements_outline() {
    let text = outline(
      "f(n) { if (n < 2) return n; else { return -n; } while (n) n = n - 1; }",
      Dialect::Functions,
    );
    assert_eq!(
      text,
      "f(n) {\n\
       \x20 if (\n\
       \x20   (< n 2)\n\
       \x20 ) {\n\
       \x20   return n;\n\
       \x20 } else {\n\
       \x20   {\n\
       \x20     return (\n\
       \x20       -n\n\
       \x20     );\n\
       \x20   }\n\
       \x20 }\n\
       \x20 while (\n\
       \x20   n\n\
       \x20 ) {\n\
       \x20   (=\n\
       \x20     n\n\
       \x20     (- n 1)\n\
       \x20   )\n\
       \x20 }\n\
       }\n"
    );
  }

  #[test]
  fn for_lists_its_clauses() {
    let text = outline("for (;i;) g(i + 1);", Dialect::Statements);
    assert_eq!(
      text,
      "main() {\n  for (\n    1\n    i\n    1\n  ) {\n    g(\n      (+ i 1)\n    )\n  }\n}\n"
    );
  }
}
