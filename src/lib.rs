//! Crate root: wires together the compilation pipeline.
//!
//! Data only flows forward:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the program AST.
//! - `scope` assigns every local of a function its stack slot.
//! - `codegen` lowers the AST into x86-64 Intel-syntax assembly.
//! - `dump` renders tokens and the AST for debugging.
//! - `error` centralises reporting utilities shared by the other modules.

pub mod codegen;
pub mod dump;
pub mod error;
pub mod parser;
pub mod scope;
pub mod tokenizer;

pub use error::{CompileError, CompileResult};
pub use parser::{Dialect, Program};
pub use tokenizer::Token;

/// Knobs for one compilation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
  pub dialect: Dialect,
}

/// Everything one run produced, kept around so the driver can dump the
/// intermediate stages.
#[derive(Debug)]
pub struct Compilation {
  pub tokens: Vec<Token>,
  pub program: Program,
  pub assembly: String,
}

/// Compile a program made of function definitions into assembly.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  Ok(compile_with(source, CompileOptions::default())?.assembly)
}

/// Run every stage and keep the intermediate results.
pub fn compile_with(source: &str, options: CompileOptions) -> CompileResult<Compilation> {
  let tokens = tokenizer::tokenize(source)?;
  let program = parser::parse(tokens.clone(), source, options.dialect)?;
  let assembly = codegen::generate(&program)?;
  Ok(Compilation {
    tokens,
    program,
    assembly,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_dialect_is_functions() {
    let asm = generate_assembly("main() { return 0; }").unwrap();
    assert!(asm.starts_with(".intel_syntax noprefix\n.global main\nmain:\n"));
  }

  #[test]
  fn keeps_intermediate_stages() {
    let options = CompileOptions {
      dialect: Dialect::Statements,
    };
    let compilation = compile_with("a = 1; return a;", options).unwrap();
    assert_eq!(compilation.tokens.len(), 7);
    assert_eq!(compilation.program.functions[0].name, "main");
    assert!(compilation.assembly.contains("main:"));
  }

  #[test]
  fn errors_stop_the_pipeline() {
    let options = CompileOptions {
      dialect: Dialect::Expression,
    };
    assert!(matches!(
      compile_with("1 ? 2", options),
      Err(CompileError::Lexical { .. })
    ));
    assert!(matches!(
      compile_with("(1", options),
      Err(CompileError::Syntax { .. })
    ));
    assert!(matches!(
      compile_with("1 = 2", options),
      Err(CompileError::Semantic { .. })
    ));
  }
}
