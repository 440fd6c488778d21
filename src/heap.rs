//! The host heap provider.
//!
//! The allocation engine never calls `sbrk` directly; it talks to whatever
//! implements [`HeapProvider`]. This keeps the placement/reclamation logic
//! testable against a fake heap: the host is just a collaborator that
//! extends the high watermark by N bytes or signals failure, and reports
//! the current low/high bounds.

use std::fmt;

use libc::{c_void, intptr_t, sbrk};

/// Failure returned by a [`HeapProvider`] when it cannot extend the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  /// The host refused to grow the heap (out of memory, rlimit, etc).
  OutOfMemory,
}

impl fmt::Display for HeapError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HeapError::OutOfMemory => write!(f, "host heap provider refused to extend the heap"),
    }
  }
}

impl std::error::Error for HeapError {}

/// A growable, contiguous byte range that can only be extended at its high
/// end. Implementors must never move or shrink previously returned memory.
pub trait HeapProvider {
  /// Extends the heap by `n` bytes (`n` is always a multiple of 8) and
  /// returns the address of the old high watermark, the start of the
  /// newly available region.
  fn extend(&mut self, n: usize) -> Result<*mut u8, HeapError>;

  /// The lowest address ever handed out by this provider.
  fn heap_lo(&self) -> *mut u8;

  /// The current high watermark (one past the last valid byte).
  fn heap_hi(&self) -> *mut u8;

  /// `heap_hi() - heap_lo()` in bytes.
  fn heap_size(&self) -> usize {
    (self.heap_hi() as usize).saturating_sub(self.heap_lo() as usize)
  }
}

/// A [`HeapProvider`] backed by the real process break, via `sbrk(2)`.
///
/// Same failure sentinel as a plain libc binding (`sbrk` returning
/// `(void*)-1`), same `intptr_t` request size. Unix-only.
pub struct SbrkHeap {
  lo: Option<*mut u8>,
  hi: *mut u8,
}

impl SbrkHeap {
  pub fn new() -> Self {
    Self {
      lo: None,
      hi: std::ptr::null_mut(),
    }
  }
}

impl Default for SbrkHeap {
  fn default() -> Self {
    Self::new()
  }
}

impl HeapProvider for SbrkHeap {
  fn extend(&mut self, n: usize) -> Result<*mut u8, HeapError> {
    let raw = unsafe { sbrk(n as intptr_t) };
    if raw == usize::MAX as *mut c_void {
      return Err(HeapError::OutOfMemory);
    }

    let old = raw as *mut u8;
    if self.lo.is_none() {
      self.lo = Some(old);
    }
    self.hi = unsafe { old.add(n) };
    Ok(old)
  }

  fn heap_lo(&self) -> *mut u8 {
    self.lo.unwrap_or(std::ptr::null_mut())
  }

  fn heap_hi(&self) -> *mut u8 {
    self.hi
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extend_tracks_lo_and_hi() {
    let mut heap = SbrkHeap::new();
    assert!(heap.heap_lo().is_null());

    let first = heap.extend(64).expect("extend should succeed");
    assert_eq!(heap.heap_lo(), first);
    assert_eq!(heap.heap_hi(), unsafe { first.add(64) });

    let second = heap.extend(32).expect("extend should succeed");
    assert_eq!(second, unsafe { first.add(64) });
    assert_eq!(heap.heap_lo(), first, "lo is fixed after the first extend");
    assert_eq!(heap.heap_hi(), unsafe { first.add(96) });
    assert_eq!(heap.heap_size(), 96);
  }
}
