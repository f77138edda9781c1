//! Code generation: lower the parsed program into Intel-syntax x86-64
//! assembly.
//!
//! The emitter uses a simple stack machine: every expression leaves a
//! single value on the stack and statements pop intermediate results as we
//! chain them. Locals live on the stack frame and are addressed relative to
//! `rbp`; the prologue always reserves the full fixed frame, which is safe
//! because the locals table refuses offsets beyond it.
//!
//! Arithmetic is 64-bit two's-complement and wraps on overflow. Division
//! sign-extends `rax` into `rdx:rax` (`cqo`) before `idiv`; division by
//! zero is left to the hardware, as in the reference compilers this
//! follows.

use crate::error::{CompileError, CompileResult};
use crate::locals::FRAME_SIZE;
use crate::parser::{AstNode, BinaryOp, Program};

/// Deepest expression nesting the emitter will walk before giving up,
/// keeping native stack usage bounded.
const MAX_NESTING: usize = 256;

/// Emit assembly for a whole program.
pub fn generate(program: &Program, source: &str) -> CompileResult<String> {
  let mut asm = String::new();
  asm.push_str(".intel_syntax noprefix\n");
  asm.push_str(".globl main\n");
  asm.push_str("main:\n");

  // Prologue: reserve the full fixed frame regardless of how many locals
  // the program actually uses.
  asm.push_str(" push rbp\n");
  asm.push_str(" mov rbp, rsp\n");
  asm.push_str(&format!(" sub rsp, {FRAME_SIZE}\n"));

  for (i, stmt) in program.body.iter().enumerate() {
    emit_expr(stmt, &mut asm, 0, source)?;

    // Each statement leaves one residual value; discard all but the last,
    // which the epilogue turns into the return value.
    if i + 1 < program.len() {
      asm.push_str(" pop rax\n");
    }
  }

  // Epilogue.
  asm.push_str(" pop rax\n");
  asm.push_str(" mov rsp, rbp\n");
  asm.push_str(" pop rbp\n");
  asm.push_str(" ret\n");

  Ok(asm)
}

/// Emit stack-based code for a single expression node.
fn emit_expr(node: &AstNode, asm: &mut String, depth: usize, source: &str) -> CompileResult<()> {
  if depth > MAX_NESTING {
    return Err(CompileError::capacity(
      source,
      0,
      format!("expression nesting exceeds the supported depth of {MAX_NESTING}"),
    ));
  }

  match node {
    AstNode::Num { value } => {
      asm.push_str(&format!(" push {value}\n"));
    }
    AstNode::Var { .. } => {
      emit_addr(node, asm, source)?;
      asm.push_str(" pop rax\n");
      asm.push_str(" mov rax, [rax]\n");
      asm.push_str(" push rax\n");
    }
    AstNode::Binary { op, lhs, rhs } => {
      emit_expr(lhs, asm, depth + 1, source)?;
      emit_expr(rhs, asm, depth + 1, source)?;
      asm.push_str(" pop rdi\n");
      asm.push_str(" pop rax\n");
      match op {
        BinaryOp::Add => asm.push_str(" add rax, rdi\n"),
        BinaryOp::Sub => asm.push_str(" sub rax, rdi\n"),
        BinaryOp::Mul => asm.push_str(" imul rax, rdi\n"),
        BinaryOp::Div => {
          asm.push_str(" cqo\n");
          asm.push_str(" idiv rdi\n");
        }
      }
      asm.push_str(" push rax\n");
    }
    AstNode::Assign { target, value } => {
      emit_addr(target, asm, source)?;
      emit_expr(value, asm, depth + 1, source)?;
      asm.push_str(" pop rdi\n");
      asm.push_str(" pop rax\n");
      asm.push_str(" mov [rax], rdi\n");
      // Assignment is itself value-producing.
      asm.push_str(" push rdi\n");
    }
  }

  Ok(())
}

/// Push the address of an lvalue. Only variables denote storage.
fn emit_addr(node: &AstNode, asm: &mut String, source: &str) -> CompileResult<()> {
  match node {
    AstNode::Var { offset } => {
      asm.push_str(" mov rax, rbp\n");
      asm.push_str(&format!(" sub rax, {offset}\n"));
      asm.push_str(" push rax\n");
      Ok(())
    }
    _ => Err(CompileError::semantic(
      source,
      0,
      "assignment target is not a variable",
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use crate::tokenizer::tokenize;

  fn compile(source: &str) -> String {
    let program = parse(tokenize(source).unwrap(), source).unwrap();
    generate(&program, source).unwrap()
  }

  #[test]
  fn header_prologue_and_epilogue_frame_the_output() {
    let asm = compile("42;");
    let lines: Vec<&str> = asm.lines().collect();
    assert_eq!(
      &lines[..6],
      &[
        ".intel_syntax noprefix",
        ".globl main",
        "main:",
        " push rbp",
        " mov rbp, rsp",
        " sub rsp, 208",
      ]
    );
    assert_eq!(
      &lines[lines.len() - 4..],
      &[" pop rax", " mov rsp, rbp", " pop rbp", " ret"]
    );
  }

  #[test]
  fn every_instruction_line_has_one_leading_space() {
    let asm = compile("a = 1; a * (2 + 3);");
    for line in asm.lines().skip(3) {
      assert!(line.starts_with(' '), "unindented instruction: {line:?}");
      assert!(!line.starts_with("  "), "over-indented instruction: {line:?}");
    }
  }

  #[test]
  fn intermediate_statement_results_are_popped() {
    let one = compile("1;");
    let three = compile("1; 2; 3;");
    let count = |asm: &str| asm.lines().filter(|l| *l == " pop rax").count();
    // Two extra pops for the two discarded intermediate results.
    assert_eq!(count(&three), count(&one) + 2);
  }

  #[test]
  fn division_sign_extends_before_idiv() {
    let asm = compile("8 / 2;");
    let lines: Vec<&str> = asm.lines().collect();
    let idiv = lines.iter().position(|l| *l == " idiv rdi").unwrap();
    assert_eq!(lines[idiv - 1], " cqo");
  }

  #[test]
  fn variable_load_goes_through_its_frame_address() {
    let asm = compile("a = 5; a;");
    assert!(asm.contains(" mov rax, rbp\n sub rax, 8\n push rax\n"));
    assert!(asm.contains(" mov rax, [rax]\n"));
  }

  #[test]
  fn assignment_stores_then_repushes_the_value() {
    let asm = compile("a = 5;");
    assert!(asm.contains(" mov [rax], rdi\n push rdi\n"));
  }

  #[test]
  fn deeply_nested_expressions_hit_the_emitter_bound() {
    let depth = MAX_NESTING + 8;
    let source = format!("{}1{};", "-(".repeat(depth), ")".repeat(depth));
    let program = parse(tokenize(&source).unwrap(), &source).unwrap();
    let err = generate(&program, &source).unwrap_err();
    assert!(matches!(err, CompileError::Capacity { .. }));
  }

  #[test]
  fn moderate_nesting_is_accepted() {
    let depth = MAX_NESTING / 2;
    let source = format!("{}1{};", "-(".repeat(depth), ")".repeat(depth));
    let program = parse(tokenize(&source).unwrap(), &source).unwrap();
    assert!(generate(&program, &source).is_ok());
  }
}
