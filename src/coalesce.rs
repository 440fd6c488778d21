//! Coalescing free neighbors and growing the heap when no size class has a
//! fit.

use crate::block::{self};
use crate::free_list::{self, Heads};
use crate::heap::{HeapError, HeapProvider};

/// Fuses `bp` with any free physical neighbor, left and/or right.
///
/// Precondition: `bp` is already linked into its class list (callers insert
/// before coalescing). Returns the payload address of the (possibly merged)
/// free block, re-inserted into its class, which may have changed.
///
/// # Safety
/// `bp` must be a free block with valid neighbors on both sides (guaranteed
/// by the prologue/epilogue sentinels).
pub unsafe fn coalesce(base: *mut u8, heads: &mut Heads, bp: *mut u8) -> *mut u8 {
  let left = unsafe { block::left(bp) };
  let right = unsafe { block::right(bp) };
  let left_alloc = unsafe { block::alloc_at(block::header(left)) };
  let right_alloc = unsafe { block::alloc_at(block::header(right)) };
  let mut size = unsafe { block::size_at(block::header(bp)) };

  let merged = match (left_alloc, right_alloc) {
    (true, true) => return bp,
    (true, false) => {
      unsafe {
        free_list::delete(base, heads, bp);
        free_list::delete(base, heads, right);
      }
      size += unsafe { block::size_at(block::header(right)) };
      unsafe { block::write_header_footer(bp, size, false) };
      bp
    }
    (false, true) => {
      unsafe {
        free_list::delete(base, heads, bp);
        free_list::delete(base, heads, left);
      }
      size += unsafe { block::size_at(block::header(left)) };
      unsafe { block::write_header_footer(left, size, false) };
      left
    }
    (false, false) => {
      unsafe {
        free_list::delete(base, heads, bp);
        free_list::delete(base, heads, left);
        free_list::delete(base, heads, right);
      }
      size += unsafe { block::size_at(block::header(left)) } + unsafe { block::size_at(block::header(right)) };
      unsafe { block::write_header_footer(left, size, false) };
      left
    }
  };

  unsafe { free_list::insert(base, heads, merged, size) };
  merged
}

/// Extends the heap by at least `n` bytes, installs a fresh epilogue, and
/// folds the new free block into the index (coalescing it with the
/// previous tail block if that was free).
///
/// # Safety
/// `base`, if already established, must be the true heap base; `heads` must
/// be the allocator's live index.
pub unsafe fn extend_heap(
  heap: &mut dyn HeapProvider,
  base: *mut u8,
  heads: &mut Heads,
  n: usize,
) -> Result<*mut u8, HeapError> {
  let asize = crate::align8!(n);
  // The host returns the old high watermark, which is exactly where the new
  // block's payload starts: its header retroactively overwrites the 4 bytes
  // the old epilogue used to occupy, one word further back.
  let bp = heap.extend(asize)?;

  unsafe {
    block::write_header_footer(bp, asize, false);
    block::put(block::header(block::right(bp)), 1); // fresh epilogue {0, 1}
    free_list::insert(base, heads, bp, asize);
  }

  Ok(unsafe { coalesce(base, heads, bp) })
}
