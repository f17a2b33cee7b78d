//! Recursive-descent parser producing function definitions over a statement
//! and expression AST.
//!
//! Every precedence level is one function that parses the next tighter level
//! and then folds its own operators in a loop, which makes them
//! left-associative. Assignment is the exception: it recurses on its right
//! side and so associates to the right.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, source_lines};

/// Argument registers of the calling convention; calls and definitions are
/// limited to this many.
pub const MAX_ARGS: usize = 6;

/// Which top-level shape the input is parsed as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
  /// A single expression whose value `main` returns.
  Expression,
  /// A statement list forming the body of `main`.
  Statements,
  /// A sequence of function definitions.
  #[default]
  Functions,
}

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
      BinaryOp::Lt => "<",
      BinaryOp::Le => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::Ge => ">=",
    }
  }
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
  Num {
    value: i64,
  },
  Var {
    name: String,
  },
  Pos {
    operand: Box<AstNode>,
  },
  Neg {
    operand: Box<AstNode>,
  },
  Addr {
    operand: Box<AstNode>,
  },
  Deref {
    operand: Box<AstNode>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
  Assign {
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
  Call {
    name: String,
    args: Vec<AstNode>,
  },
}

impl AstNode {
  pub fn number(value: i64) -> Self {
    Self::Num { value }
  }

  pub fn var(name: impl Into<String>) -> Self {
    Self::Var { name: name.into() }
  }

  pub fn unary_pos(operand: AstNode) -> Self {
    Self::Pos {
      operand: Box::new(operand),
    }
  }

  pub fn unary_neg(operand: AstNode) -> Self {
    Self::Neg {
      operand: Box::new(operand),
    }
  }

  pub fn addr(operand: AstNode) -> Self {
    Self::Addr {
      operand: Box::new(operand),
    }
  }

  pub fn deref(operand: AstNode) -> Self {
    Self::Deref {
      operand: Box::new(operand),
    }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn assign(lhs: AstNode, rhs: AstNode) -> Self {
    Self::Assign {
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn call(name: impl Into<String>, args: Vec<AstNode>) -> Self {
    Self::Call {
      name: name.into(),
      args,
    }
  }

  /// Leaves carry a literal or a name and have no children.
  pub fn is_leaf(&self) -> bool {
    matches!(self, AstNode::Num { .. } | AstNode::Var { .. })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
  Expr(AstNode),
  Return(AstNode),
  If {
    cond: AstNode,
    then: Box<Stmt>,
    otherwise: Option<Box<Stmt>>,
  },
  While {
    cond: AstNode,
    body: Box<Stmt>,
  },
  /// Missing clauses are filled with the constant `1`.
  For {
    init: AstNode,
    cond: AstNode,
    step: AstNode,
    body: Box<Stmt>,
  },
  Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
  pub name: String,
  pub params: Vec<String>,
  pub body: Vec<Stmt>,
}

impl Function {
  /// Wrap a statement list as the body of a parameterless `main`.
  pub fn main(body: Vec<Stmt>) -> Self {
    Self {
      name: "main".to_string(),
      params: Vec::new(),
      body,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
  pub functions: Vec<Function>,
}

/// Parse the whole token stream in the given dialect.
pub fn parse(tokens: Vec<Token>, source: &str, dialect: Dialect) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens, source);

  let functions = match dialect {
    Dialect::Expression => {
      let expr = parse_expr(&mut stream)?;
      vec![Function::main(vec![Stmt::Return(expr)])]
    }
    Dialect::Statements => {
      let mut body = Vec::new();
      while !stream.is_eof() {
        body.push(parse_stmt(&mut stream)?);
      }
      vec![Function::main(body)]
    }
    Dialect::Functions => {
      let mut functions = Vec::new();
      while !stream.is_eof() {
        functions.push(parse_function(&mut stream)?);
      }
      functions
    }
  };

  if let Some(token) = stream.peek() {
    return Err(stream.error_at(token, format!("extra characters: \"{}\"", token.text)));
  }

  Ok(Program { functions })
}

fn parse_function(stream: &mut TokenStream) -> CompileResult<Function> {
  let name_token = stream.get_ident()?;

  let mut params = Vec::new();
  stream.skip("(")?;
  if !stream.equal(")") {
    params.push(stream.get_ident()?.text);
    while stream.equal(",") {
      params.push(stream.get_ident()?.text);
    }
    stream.skip(")")?;
  }
  if params.len() > MAX_ARGS {
    return Err(stream.error_at(
      &name_token,
      format!(
        "too many parameters in \"{}\" (at most {MAX_ARGS})",
        name_token.text
      ),
    ));
  }

  stream.skip("{")?;
  let body = parse_block_body(stream)?;

  debug!(name = %name_token.text, params = params.len(), "parsed function");
  Ok(Function {
    name: name_token.text,
    params,
    body,
  })
}

/// Statements up to and including the closing brace.
fn parse_block_body(stream: &mut TokenStream) -> CompileResult<Vec<Stmt>> {
  let mut body = Vec::new();
  while !stream.equal("}") {
    if stream.is_eof() {
      return Err(stream.error_here("expected \"}\", but reached end of input"));
    }
    body.push(parse_stmt(stream)?);
  }
  Ok(body)
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Stmt> {
  if stream.equal("{") {
    return Ok(Stmt::Block(parse_block_body(stream)?));
  }

  if stream.equal("return") {
    let expr = parse_expr(stream)?;
    stream.skip(";")?;
    return Ok(Stmt::Return(expr));
  }

  if stream.equal("if") {
    stream.skip("(")?;
    let cond = parse_expr(stream)?;
    stream.skip(")")?;
    let then = Box::new(parse_stmt(stream)?);
    let otherwise = if stream.equal("else") {
      Some(Box::new(parse_stmt(stream)?))
    } else {
      None
    };
    return Ok(Stmt::If {
      cond,
      then,
      otherwise,
    });
  }

  if stream.equal("for") {
    stream.skip("(")?;
    let init = parse_for_clause(stream, ";")?;
    let cond = parse_for_clause(stream, ";")?;
    let step = parse_for_clause(stream, ")")?;
    let body = Box::new(parse_stmt(stream)?);
    return Ok(Stmt::For {
      init,
      cond,
      step,
      body,
    });
  }

  if stream.equal("while") {
    stream.skip("(")?;
    let cond = parse_expr(stream)?;
    stream.skip(")")?;
    let body = Box::new(parse_stmt(stream)?);
    return Ok(Stmt::While { cond, body });
  }

  let expr = parse_expr(stream)?;
  stream.skip(";")?;
  Ok(Stmt::Expr(expr))
}

/// An optional `for` clause followed by its terminator; an empty clause is
/// the always-true constant `1`.
fn parse_for_clause(stream: &mut TokenStream, terminator: &str) -> CompileResult<AstNode> {
  if stream.equal(terminator) {
    return Ok(AstNode::number(1));
  }
  let expr = parse_expr(stream)?;
  stream.skip(terminator)?;
  Ok(expr)
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_assign(stream)
}

fn parse_assign(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let node = parse_equality(stream)?;

  if stream.equal("=") {
    let rhs = parse_assign(stream)?;
    return Ok(AstNode::assign(node, rhs));
  }

  Ok(node)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_relational(stream)?;

  while let Some(op) = stream.equal_any(&[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)]) {
    let rhs = parse_relational(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_add(stream)?;

  while let Some(op) = stream.equal_any(&[
    (">=", BinaryOp::Ge),
    ("<=", BinaryOp::Le),
    (">", BinaryOp::Gt),
    ("<", BinaryOp::Lt),
  ]) {
    let rhs = parse_add(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_mul(stream)?;

  while let Some(op) = stream.equal_any(&[("+", BinaryOp::Add), ("-", BinaryOp::Sub)]) {
    let rhs = parse_mul(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_unary(stream)?;

  while let Some(op) = stream.equal_any(&[("*", BinaryOp::Mul), ("/", BinaryOp::Div)]) {
    let rhs = parse_unary(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.equal("+") {
    return Ok(AstNode::unary_pos(parse_unary(stream)?));
  }

  if stream.equal("-") {
    return Ok(AstNode::unary_neg(parse_unary(stream)?));
  }

  parse_address(stream)
}

fn parse_address(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.equal("&") {
    return Ok(AstNode::addr(parse_address(stream)?));
  }

  if stream.equal("*") {
    return Ok(AstNode::deref(parse_address(stream)?));
  }

  parse_primary(stream)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.equal("(") {
    let node = parse_expr(stream)?;
    stream.skip(")")?;
    return Ok(node);
  }

  if stream.peek().is_some_and(|token| is_identifier(&token.text)) {
    let name_token = stream.get_ident()?;
    if !stream.equal("(") {
      return Ok(AstNode::var(name_token.text));
    }

    let mut args = Vec::new();
    if !stream.equal(")") {
      args.push(parse_expr(stream)?);
      while stream.equal(",") {
        args.push(parse_expr(stream)?);
      }
      stream.skip(")")?;
    }
    if args.len() > MAX_ARGS {
      return Err(stream.error_at(
        &name_token,
        format!(
          "too many arguments in call to \"{}\" (at most {MAX_ARGS})",
          name_token.text
        ),
      ));
    }
    return Ok(AstNode::call(name_token.text, args));
  }

  Ok(AstNode::number(stream.get_number()?))
}

/// A letter or underscore followed by letters, digits and underscores.
fn is_identifier(text: &str) -> bool {
  let mut chars = text.chars();
  chars
    .next()
    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Front-consumed queue of tokens with one token of lookahead.
struct TokenStream<'a> {
  tokens: VecDeque<Token>,
  lines: Vec<&'a str>,
  /// Most recently consumed token, for end-of-input diagnostics.
  last: Option<Token>,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens: tokens.into(),
      lines: source_lines(source),
      last: None,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.front()
  }

  fn is_eof(&self) -> bool {
    self.tokens.is_empty()
  }

  fn pop(&mut self) -> Option<Token> {
    let token = self.tokens.pop_front()?;
    self.last = Some(token.clone());
    Some(token)
  }

  /// Consume the current token if its text is `op`.
  fn equal(&mut self, op: &str) -> bool {
    if self.peek().is_some_and(|token| token.text == op) {
      self.pop();
      return true;
    }
    false
  }

  /// Consume the first operator from `table` that matches the current token.
  fn equal_any<T: Copy>(&mut self, table: &[(&str, T)]) -> Option<T> {
    let (_, value) = table.iter().find(|(op, _)| self.equal(op))?;
    Some(*value)
  }

  fn skip(&mut self, op: &str) -> CompileResult<()> {
    if self.equal(op) {
      return Ok(());
    }
    Err(self.expected(&format!("\"{op}\"")))
  }

  /// Parse the current token as an integer literal.
  fn get_number(&mut self) -> CompileResult<i64> {
    let Some(token) = self.peek() else {
      return Err(self.expected("a number"));
    };
    if !token.text.bytes().all(|b| b.is_ascii_digit()) {
      return Err(self.expected("a number"));
    }
    let value = token
      .text
      .parse::<i64>()
      .map_err(|err| self.error_at(token, format!("invalid number \"{}\": {err}", token.text)))?;
    self.pop();
    Ok(value)
  }

  /// Parse the current token as an identifier, returning the whole token so
  /// callers can point at it later.
  fn get_ident(&mut self) -> CompileResult<Token> {
    if self.peek().is_some_and(|token| is_identifier(&token.text))
      && let Some(token) = self.pop()
    {
      return Ok(token);
    }
    Err(self.expected("an identifier"))
  }

  fn expected(&self, what: &str) -> CompileError {
    match self.peek() {
      Some(token) => self.error_at(token, format!("expected {what}, but got \"{}\"", token.text)),
      None => self.error_here(format!("expected {what}, but reached end of input")),
    }
  }

  fn line(&self, index: usize) -> &str {
    self.lines.get(index).copied().unwrap_or_default()
  }

  fn error_at(&self, token: &Token, message: impl Into<String>) -> CompileError {
    CompileError::syntax(self.line(token.line), token.pos, message)
  }

  /// Error at the current token, or just past the last consumed one once the
  /// stream is exhausted.
  fn error_here(&self, message: impl Into<String>) -> CompileError {
    match (self.peek(), &self.last) {
      (Some(token), _) => self.error_at(token, message),
      (None, Some(last)) => CompileError::syntax(self.line(last.line), last.end(), message),
      (None, None) => CompileError::syntax(self.line(0), 0, message),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::tokenize;

  fn parse_in(source: &str, dialect: Dialect) -> CompileResult<Program> {
    parse(tokenize(source)?, source, dialect)
  }

  fn expr(source: &str) -> AstNode {
    let mut program = parse_in(source, Dialect::Expression).unwrap();
    match program.functions.remove(0).body.remove(0) {
      Stmt::Return(expr) => expr,
      other => panic!("expected return, got {other:?}"),
    }
  }

  fn num(value: i64) -> AstNode {
    AstNode::number(value)
  }

  #[test]
  fn multiplication_binds_tighter() {
    assert_eq!(
      expr("2+3*4"),
      AstNode::binary(
        BinaryOp::Add,
        num(2),
        AstNode::binary(BinaryOp::Mul, num(3), num(4))
      )
    );
  }

  #[test]
  fn subtraction_is_left_associative() {
    assert_eq!(
      expr("2-3-4"),
      AstNode::binary(
        BinaryOp::Sub,
        AstNode::binary(BinaryOp::Sub, num(2), num(3)),
        num(4)
      )
    );
  }

  #[test]
  fn assignment_is_right_associative() {
    assert_eq!(
      expr("a=b=1"),
      AstNode::assign(
        AstNode::var("a"),
        AstNode::assign(AstNode::var("b"), num(1))
      )
    );
  }

  #[test]
  fn comparison_below_additive() {
    assert_eq!(
      expr("1+1<=2==1"),
      AstNode::binary(
        BinaryOp::Eq,
        AstNode::binary(
          BinaryOp::Le,
          AstNode::binary(BinaryOp::Add, num(1), num(1)),
          num(2)
        ),
        num(1)
      )
    );
  }

  #[test]
  fn unary_sign_wraps_address_operators() {
    assert_eq!(
      expr("-*&x"),
      AstNode::unary_neg(AstNode::deref(AstNode::addr(AstNode::var("x"))))
    );
    assert_eq!(expr("+5"), AstNode::unary_pos(num(5)));
  }

  #[test]
  fn calls_keep_argument_order() {
    assert_eq!(
      expr("f(1, x, g())"),
      AstNode::call("f", vec![num(1), AstNode::var("x"), AstNode::call("g", vec![])])
    );
  }

  #[test]
  fn for_fills_missing_clauses_with_one() {
    let program = parse_in("for (;;) x = 1;", Dialect::Statements).unwrap();
    let Stmt::For {
      init, cond, step, ..
    } = &program.functions[0].body[0]
    else {
      panic!("expected for");
    };
    assert_eq!((init, cond, step), (&num(1), &num(1), &num(1)));
  }

  #[test]
  fn else_binds_to_nearest_if() {
    let program = parse_in("if (a) if (b) 1; else 2;", Dialect::Statements).unwrap();
    let Stmt::If {
      then, otherwise, ..
    } = &program.functions[0].body[0]
    else {
      panic!("expected if");
    };
    assert!(otherwise.is_none());
    assert!(matches!(**then, Stmt::If { otherwise: Some(_), .. }));
  }

  #[test]
  fn parses_function_definitions() {
    let program = parse_in(
      "add(a, b) { return a + b; }\nmain() { return add(1, 2); }",
      Dialect::Functions,
    )
    .unwrap();
    let names: Vec<_> = program.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["add", "main"]);
    assert_eq!(program.functions[0].params, ["a", "b"]);
  }

  #[test]
  fn statements_become_main() {
    let program = parse_in("a=3; b=5*6-8; return a+b;", Dialect::Statements).unwrap();
    assert_eq!(program.functions.len(), 1);
    assert_eq!(program.functions[0].name, "main");
    assert_eq!(program.functions[0].body.len(), 3);
  }

  #[test]
  fn dangling_operator_points_past_last_token() {
    let err = parse_in("1+", Dialect::Expression).unwrap_err();
    assert_eq!(
      err.to_string(),
      "1+\n  ^ expected a number, but reached end of input"
    );
  }

  #[test]
  fn trailing_tokens_are_extra_characters() {
    let err = parse_in("1 2", Dialect::Expression).unwrap_err();
    assert_eq!(err.to_string(), "1 2\n  ^ extra characters: \"2\"");
  }

  #[test]
  fn missing_semicolon_reports_expected_token() {
    let err = parse_in("a = 1\nb = 2;", Dialect::Statements).unwrap_err();
    assert_eq!(err.to_string(), "b = 2;\n^ expected \";\", but got \"b\"");
  }

  #[test]
  fn unclosed_function_body() {
    let err = parse_in("main() { return 1;", Dialect::Functions).unwrap_err();
    assert!(err.to_string().contains("expected \"}\", but reached end of input"));
  }

  #[test]
  fn rejects_seventh_argument() {
    let err = parse_in("f(1,2,3,4,5,6,7)", Dialect::Expression).unwrap_err();
    assert!(err.to_string().contains("too many arguments in call to \"f\""));
    assert!(parse_in("f(1,2,3,4,5,6)", Dialect::Expression).is_ok());
  }

  #[test]
  fn rejects_seventh_parameter() {
    let err = parse_in("f(a,b,c,d,e,g,h) { return 0; }", Dialect::Functions).unwrap_err();
    assert!(err.to_string().contains("too many parameters in \"f\""));
  }

  #[test]
  fn number_overflow_is_reported() {
    let err = parse_in("99999999999999999999", Dialect::Expression).unwrap_err();
    assert!(err.to_string().contains("invalid number"));
  }

  #[test]
  fn function_name_must_be_identifier() {
    let err = parse_in("1() {}", Dialect::Functions).unwrap_err();
    assert_eq!(
      err.to_string(),
      "1() {}\n^ expected an identifier, but got \"1\""
    );
  }
}
