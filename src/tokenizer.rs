//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The input is split into physical lines first and every line is scanned on
//! its own, so each token remembers the line it came from and diagnostics can
//! echo that line. Keywords are ordinary identifiers here; the parser tells
//! them apart by their text.

use tracing::debug;

use crate::error::{CompileError, CompileResult};

/// Operators, longest first: the first candidate that matches wins, so `==`
/// must come before `=` and `<=` before `<`.
const PUNCTUATORS: [&str; 18] = [
  "==", "!=", ">=", "<=", ">", "<", "+", "-", "*", "/", "(", ")", "{", "}", ";", ",", "=", "&",
];

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Reserved,
  Number,
  Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  /// Zero-based index of the physical line.
  pub line: usize,
  /// Byte offset within that line.
  pub pos: usize,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, pos: usize) -> Self {
    Self {
      kind,
      text: text.into(),
      line,
      pos,
    }
  }

  /// Byte offset just past the end of the token.
  pub fn end(&self) -> usize {
    self.pos + self.text.len()
  }
}

/// Physical lines of the source, as the tokenizer sees them.
pub fn source_lines(source: &str) -> Vec<&str> {
  source.split('\n').collect()
}

/// Lex the whole input. The end of the returned vector is the end of input.
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  for (index, line) in source_lines(source).into_iter().enumerate() {
    tokenize_line(line, index, &mut tokens)?;
  }
  debug!(count = tokens.len(), "tokenized source");
  Ok(tokens)
}

fn tokenize_line(line: &str, index: usize, tokens: &mut Vec<Token>) -> CompileResult<()> {
  let bytes = line.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if matches!(c, b' ' | b'\t' | b'\r') {
      i += 1;
      continue;
    }

    if let Some(op) = PUNCTUATORS.into_iter().find(|op| line[i..].starts_with(op)) {
      tokens.push(Token::new(TokenKind::Reserved, op, index, i));
      i += op.len();
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      tokens.push(Token::new(TokenKind::Number, &line[start..i], index, start));
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      tokens.push(Token::new(TokenKind::Identifier, &line[start..i], index, start));
      continue;
    }

    let invalid_char = line[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::lexical(
      line,
      i,
      format!("invalid token: '{invalid_char}'"),
    ));
  }

  Ok(())
}
