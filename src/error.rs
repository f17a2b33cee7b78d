//! Shared error utilities used across the compilation pipeline.
//!
//! Lexical and syntax diagnostics echo the offending source line and put a
//! caret under the byte that caused them. Semantic errors come from the
//! generator, which no longer has positions, so they name the expression
//! instead.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{line}\n{marker} {message}"))]
  Lexical {
    line: String,
    marker: String,
    message: String,
  },

  #[snafu(display("{line}\n{marker} {message}"))]
  Syntax {
    line: String,
    marker: String,
    message: String,
  },

  #[snafu(display("{message}"))]
  Semantic { message: String },
}

impl CompileError {
  /// Unrecognised input character at byte offset `pos` of `line`.
  pub fn lexical(line: &str, pos: usize, message: impl Into<String>) -> Self {
    let (line, marker) = locate(line, pos);
    Self::Lexical {
      line,
      marker,
      message: message.into(),
    }
  }

  /// Missing or unexpected token at byte offset `pos` of `line`.
  pub fn syntax(line: &str, pos: usize, message: impl Into<String>) -> Self {
    let (line, marker) = locate(line, pos);
    Self::Syntax {
      line,
      marker,
      message: message.into(),
    }
  }

  pub fn semantic(message: impl Into<String>) -> Self {
    Self::Semantic {
      message: message.into(),
    }
  }
}

/// Render the echoed line and the caret marker for a byte offset.
///
/// Offsets past the end of the line are allowed: end-of-input diagnostics
/// point just after the last consumed token.
fn locate(line: &str, pos: usize) -> (String, String) {
  let line = line.trim_end_matches('\r');
  let column = match line.get(..pos) {
    Some(prefix) => prefix.chars().count(),
    None if pos >= line.len() => line.chars().count() + (pos - line.len()),
    None => line[..floor_char_boundary(line, pos)].chars().count(),
  };
  (line.to_string(), format!("{}^", " ".repeat(column)))
}

fn floor_char_boundary(line: &str, mut pos: usize) -> usize {
  while !line.is_char_boundary(pos) {
    pos -= 1;
  }
  pos
}
