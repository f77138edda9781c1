//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics are kept lightweight on purpose – these routines format
//! messages in a style reminiscent of chibicc, pointing at the offending
//! byte with a caret. Every error is fatal to the whole compile; there is
//! no recovery or multi-error batching.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// Unrecognized character or unparseable literal.
  #[snafu(display("{source_line}\n{marker} {message}"))]
  Lex {
    source_line: String,
    marker: String,
    message: String,
    loc: usize,
  },
  /// Token stream does not match the grammar at the current position.
  #[snafu(display("{source_line}\n{marker} {message}"))]
  Syntax {
    source_line: String,
    marker: String,
    message: String,
    loc: usize,
  },
  /// Grammatically valid but meaningless, e.g. assignment to a non-variable.
  #[snafu(display("{source_line}\n{marker} {message}"))]
  Semantic {
    source_line: String,
    marker: String,
    message: String,
    loc: usize,
  },
  /// A fixed implementation bound was exceeded (frame slots, nesting depth).
  #[snafu(display("{source_line}\n{marker} {message}"))]
  Capacity {
    source_line: String,
    marker: String,
    message: String,
    loc: usize,
  },
}

/// Render the caret line for an error anchored at `loc` bytes into `expr`.
fn render(expr: &str, loc: usize) -> (String, String) {
  let safe_loc = loc.min(expr.len());
  let marker = format!("{}^", " ".repeat(safe_loc));
  (expr.to_string(), marker)
}

impl CompileError {
  pub fn lex(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let (source_line, marker) = render(expr, loc);
    Self::Lex {
      source_line,
      marker,
      message: message.into(),
      loc,
    }
  }

  pub fn syntax(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let (source_line, marker) = render(expr, loc);
    Self::Syntax {
      source_line,
      marker,
      message: message.into(),
      loc,
    }
  }

  pub fn semantic(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let (source_line, marker) = render(expr, loc);
    Self::Semantic {
      source_line,
      marker,
      message: message.into(),
      loc,
    }
  }

  pub fn capacity(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let (source_line, marker) = render(expr, loc);
    Self::Capacity {
      source_line,
      marker,
      message: message.into(),
      loc,
    }
  }

  /// Byte offset into the source where the error was detected.
  pub fn offset(&self) -> usize {
    match self {
      Self::Lex { loc, .. }
      | Self::Syntax { loc, .. }
      | Self::Semantic { loc, .. }
      | Self::Capacity { loc, .. } => *loc,
    }
  }
}
