//! Local-variable table: maps single-letter names to stack-frame offsets.
//!
//! Offsets are handed out in first-seen order, starting at `SLOT_SIZE` and
//! growing downwards from `%rbp`. The table lives for exactly one
//! compilation; there is no scoping and no deletion.

/// Maximum number of distinct locals the fixed stack frame can hold.
pub const MAX_LOCALS: usize = 26;

/// Bytes reserved per local.
pub const SLOT_SIZE: i64 = 8;

/// Bytes the prologue reserves below `%rbp`. The resolver refuses to hand
/// out offsets beyond this, so codegen can reserve it unconditionally.
pub const FRAME_SIZE: i64 = MAX_LOCALS as i64 * SLOT_SIZE;

#[derive(Debug, Clone)]
struct Local {
  name: char,
  offset: i64,
}

/// First-seen-order table of locals for one compilation unit.
#[derive(Debug, Default)]
pub struct Locals {
  entries: Vec<Local>,
}

impl Locals {
  pub fn new() -> Self {
    Self::default()
  }

  /// Return the offset bound to `name`, allocating the next slot on first
  /// sight. `None` means the fixed frame is full.
  pub fn resolve(&mut self, name: char) -> Option<i64> {
    if let Some(local) = self.entries.iter().find(|local| local.name == name) {
      return Some(local.offset);
    }

    if self.entries.len() >= MAX_LOCALS {
      return None;
    }

    let offset = (self.entries.len() as i64 + 1) * SLOT_SIZE;
    self.entries.push(Local { name, offset });
    Some(offset)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
