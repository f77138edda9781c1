//! Recursive-descent parser producing a statement list and expression AST.
//!
//! The parser mirrors the classic chibicc structure: a precedence-ordered
//! set of helpers, one per grammar level, threaded through an explicit
//! `Parser` context that owns the token cursor and the local-variable
//! table. Nothing here is global; one `parse` call is one compilation.
//!
//! ```text
//! program := stmt* Eof
//! stmt    := expr ";"
//! expr    := assign
//! assign  := add ( "=" assign )?            right-associative
//! add     := mul ( ("+"|"-") mul )*         left-associative
//! mul     := unary ( ("*"|"/") unary )*     left-associative
//! unary   := ("+"|"-")? primary
//! primary := Num | Ident | "(" expr ")"
//! ```

use crate::error::{CompileError, CompileResult};
use crate::locals::{Locals, MAX_LOCALS};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

/// Expression tree produced by the parser. Ownership of subtrees is
/// exclusive; a node never aliases another.
#[derive(Debug, Clone)]
pub enum AstNode {
  Num {
    value: i64,
  },
  /// A local variable, already bound to its frame offset in bytes.
  Var {
    offset: i64,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
  /// `target` is always a `Var`; the parser rejects anything else.
  Assign {
    target: Box<AstNode>,
    value: Box<AstNode>,
  },
}

impl AstNode {
  pub fn number(value: i64) -> Self {
    Self::Num { value }
  }

  pub fn var(offset: i64) -> Self {
    Self::Var { offset }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn assign(target: AstNode, value: AstNode) -> Self {
    Self::Assign {
      target: Box::new(target),
      value: Box::new(value),
    }
  }
}

/// An ordered sequence of statement expressions in source order. The last
/// statement's value becomes the program result.
#[derive(Debug, Clone, Default)]
pub struct Program {
  pub body: Vec<AstNode>,
}

impl Program {
  pub fn is_empty(&self) -> bool {
    self.body.is_empty()
  }

  pub fn len(&self) -> usize {
    self.body.len()
  }
}

/// Parse a token stream into a `Program`. An empty input yields an empty
/// program; the pipeline entry point decides whether that is acceptable.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut parser = Parser::new(tokens, source);
  let mut body = Vec::new();

  while !parser.is_eof() {
    body.push(parser.stmt()?);
  }

  Ok(Program { body })
}

/// Explicit parser context: token cursor plus the locals table, scoped to
/// one compilation.
struct Parser<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
  locals: Locals,
}

impl<'a> Parser<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
      locals: Locals::new(),
    }
  }

  // Grammar productions, highest level first.

  fn stmt(&mut self) -> CompileResult<AstNode> {
    let expr = self.expr()?;
    self.skip(";")?;
    Ok(expr)
  }

  fn expr(&mut self) -> CompileResult<AstNode> {
    self.assign()
  }

  fn assign(&mut self) -> CompileResult<AstNode> {
    let target_loc = self.current_loc();
    let node = self.add()?;

    if self.equal("=") {
      if !matches!(node, AstNode::Var { .. }) {
        return Err(CompileError::semantic(
          self.source,
          target_loc,
          "assignment target is not a variable",
        ));
      }
      let value = self.assign()?;
      return Ok(AstNode::assign(node, value));
    }

    Ok(node)
  }

  fn add(&mut self) -> CompileResult<AstNode> {
    let mut node = self.mul()?;

    loop {
      let op_str = match self
        .peek()
        .filter(|token| token.kind == TokenKind::Punctuator)
        .map(|token| token_text(token, self.source))
      {
        Some(symbol @ "+") => symbol,
        Some(symbol @ "-") => symbol,
        _ => break,
      };

      let op = match op_str {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        _ => unreachable!(),
      };

      self.skip(op_str)?;
      let rhs = self.mul()?;
      node = AstNode::binary(op, node, rhs);
    }

    Ok(node)
  }

  fn mul(&mut self) -> CompileResult<AstNode> {
    let mut node = self.unary()?;

    loop {
      let op_str = match self
        .peek()
        .filter(|token| token.kind == TokenKind::Punctuator)
        .map(|token| token_text(token, self.source))
      {
        Some(symbol @ "*") => symbol,
        Some(symbol @ "/") => symbol,
        _ => break,
      };

      let op = match op_str {
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        _ => unreachable!(),
      };

      self.skip(op_str)?;
      let rhs = self.unary()?;
      node = AstNode::binary(op, node, rhs);
    }

    Ok(node)
  }

  fn unary(&mut self) -> CompileResult<AstNode> {
    if self.equal("+") {
      return self.primary();
    }

    // Unary minus desugars to `0 - operand`.
    if self.equal("-") {
      let operand = self.primary()?;
      return Ok(AstNode::binary(BinaryOp::Sub, AstNode::number(0), operand));
    }

    self.primary()
  }

  fn primary(&mut self) -> CompileResult<AstNode> {
    if self.equal("(") {
      let node = self.expr()?;
      self.skip(")")?;
      return Ok(node);
    }

    if matches!(self.peek().map(|token| token.kind), Some(TokenKind::Ident)) {
      let (name, loc) = self.get_ident()?;
      let offset = self.locals.resolve(name).ok_or_else(|| {
        CompileError::capacity(
          self.source,
          loc,
          format!("too many locals: the frame holds at most {MAX_LOCALS} distinct variables"),
        )
      })?;
      return Ok(AstNode::var(offset));
    }

    let (value, _) = self.get_number()?;
    Ok(AstNode::number(value))
  }

  // Cursor helpers.

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  /// Byte offset of the current token, or the end of input.
  fn current_loc(&self) -> usize {
    match self.peek() {
      Some(token) => token.loc,
      None => self.source.len(),
    }
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Punctuator
      && token.len == op.len()
      && token_text(token, self.source) == op
    {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      let (loc, got) = match self.peek() {
        Some(token) => (token.loc, describe_token(Some(token), self.source)),
        None => (self.source.len(), "EOF".to_string()),
      };
      Err(CompileError::syntax(
        self.source,
        loc,
        format!("expected \"{s}\", but got \"{got}\""),
      ))
    }
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(i64, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Num
    {
      let loc = token.loc;
      let value = token.value.ok_or_else(|| {
        CompileError::syntax(
          self.source,
          loc,
          "internal error: numeric token missing value",
        )
      })?;
      self.pos += 1;
      return Ok((value, loc));
    }

    let (loc, got) = match self.peek() {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    };
    Err(CompileError::syntax(
      self.source,
      loc,
      format!("expected a number, but got \"{got}\""),
    ))
  }

  /// Parse the current token as a single-letter identifier.
  fn get_ident(&mut self) -> CompileResult<(char, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Ident
    {
      let loc = token.loc;
      let name = token_text(token, self.source).chars().next().ok_or_else(|| {
        CompileError::syntax(self.source, loc, "identifier is missing characters")
      })?;
      self.pos += 1;
      return Ok((name, loc));
    }

    let (loc, got) = match self.peek() {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    };
    Err(CompileError::syntax(
      self.source,
      loc,
      format!("expected an identifier, but got \"{got}\""),
    ))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof))
  }
}
