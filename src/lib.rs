//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `locals` hands out stack-frame offsets for single-letter variables.
//! - `parser` owns all syntactic knowledge and returns the statement list.
//! - `codegen` lowers the program into Intel-syntax x86-64 assembly.
//! - `error` centralises reporting utilities shared by the other modules.
//!
//! The whole pipeline is a pure function from source text to assembly text;
//! no state survives between calls.

pub mod error;
pub mod locals;
pub mod parser;
pub mod tokenizer;

mod codegen;

pub use error::{CompileError, CompileResult};

/// Compile a source string into Intel-syntax assembly.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source)?;
  let program = parser::parse(tokens, source)?;

  // A program with no statements has no result value to return.
  if program.is_empty() {
    return Err(CompileError::syntax(source, 0, "program is empty"));
  }

  codegen::generate(&program, source)
}
