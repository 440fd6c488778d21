//! Allocator-level errors. Kept deliberately small and dependency-free: a
//! two-variant enum with a hand-written `Display` is the idiomatic match
//! for a crate this size.

use std::fmt;

pub use crate::heap::HeapError;

/// Failure returned by [`crate::SegAllocator::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
  /// The host heap provider refused the initial heap layout.
  Heap(HeapError),
}

impl fmt::Display for InitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      InitError::Heap(e) => write!(f, "failed to initialize heap: {e}"),
    }
  }
}

impl std::error::Error for InitError {}

impl From<HeapError> for InitError {
  fn from(e: HeapError) -> Self {
    InitError::Heap(e)
  }
}
