//! Heap consistency checker.
//!
//! Walks both the free-list index and the physical block chain and reports
//! the first violated invariant. Grounded on the six numbered checks
//! sketched (commented out) in the original `mm_check`: free blocks really
//! marked free, no two adjacent free blocks escaped coalescing, every free
//! block is reachable from the index and vice versa, list pointers point
//! into the heap, allocated blocks don't overlap, and header/footer agree.
//!
//! Not part of the public allocation contract: callers use this for tests
//! and debugging, not for driving allocation decisions.

use crate::block::{self, LEN};
use crate::free_list::{self, Heads};
use crate::heap::HeapProvider;

/// The first invariant violation a [`check`] run found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
  /// A block reachable from a class list has its allocated flag set.
  FreeListBlockMarkedAllocated,
  /// A block's header and footer disagree.
  HeaderFooterMismatch,
  /// Two physically adjacent blocks are both free, meaning coalescing
  /// escaped one.
  AdjacentFreeBlocks,
  /// A block reachable from class `k` does not actually belong to class
  /// `k`.
  WrongClass,
  /// A list's sizes are not non-decreasing from head to tail.
  ClassNotSorted,
  /// `succ(pred(b)) != b` or `pred(succ(b)) != b` for some block.
  BrokenLinkage,
  /// A free block counted from the index was never reached while walking
  /// the physical heap, or vice versa.
  FreeCountMismatch,
  /// A header/footer address fell outside `[heap_lo, heap_hi)`.
  OutOfBounds,
}

/// Walks the heap starting from `heap_listp` (the prologue payload, i.e.
/// the first real block is `right(heap_listp)`) through to the epilogue
/// (`size == 0`), and the free-list index, cross-checking every invariant
/// that doesn't require knowledge of live user pointers.
///
/// # Safety
/// `heap_listp` must be the allocator's prologue anchor and `heads` its
/// live index; both must describe a heap bounded by `heap`'s current
/// `heap_lo`/`heap_size`.
pub unsafe fn check(
  base: *mut u8,
  heap_listp: *mut u8,
  heads: &Heads,
  heap: &dyn HeapProvider,
) -> Result<(), Violation> {
  let heap_lo = heap.heap_lo();
  let heap_hi = unsafe { heap_lo.add(heap.heap_size()) };
  let mut listed_free = 0usize;

  for idx in 0..LEN {
    let mut prev_size: Option<usize> = None;
    let mut cur = heads[idx];
    while let Some(bp) = cur {
      let header = block::header(bp);
      if (header as usize) < heap_lo as usize || (header as usize) >= heap_hi as usize {
        return Err(Violation::OutOfBounds);
      }
      if unsafe { block::alloc_at(header) } {
        return Err(Violation::FreeListBlockMarkedAllocated);
      }
      let size = unsafe { block::size_at(header) };
      if unsafe { block::get(header) } != unsafe { block::get(block::footer_of_size(bp, size)) } {
        return Err(Violation::HeaderFooterMismatch);
      }
      if free_list::class(size) != idx {
        return Err(Violation::WrongClass);
      }
      if let Some(prev) = prev_size {
        if size < prev {
          return Err(Violation::ClassNotSorted);
        }
      }
      prev_size = Some(size);

      if let Some(p) = unsafe { block::pred(base, bp) } {
        if unsafe { block::succ(base, p) } != Some(bp) {
          return Err(Violation::BrokenLinkage);
        }
      }
      if let Some(s) = unsafe { block::succ(base, bp) } {
        if unsafe { block::pred(base, s) } != Some(bp) {
          return Err(Violation::BrokenLinkage);
        }
      }

      listed_free += 1;
      cur = unsafe { block::succ(base, bp) };
    }
  }

  let mut walked_free = 0usize;
  let mut bp = unsafe { block::right(heap_listp) };
  loop {
    let header = block::header(bp);
    let size = unsafe { block::size_at(header) };
    if size == 0 {
      break; // epilogue
    }

    let alloc = unsafe { block::alloc_at(header) };
    if !alloc {
      walked_free += 1;
      let right = unsafe { block::right(bp) };
      if !unsafe { block::alloc_at(block::header(right)) } {
        return Err(Violation::AdjacentFreeBlocks);
      }
    }

    bp = unsafe { block::right(bp) };
  }

  if listed_free != walked_free {
    return Err(Violation::FreeCountMismatch);
  }

  Ok(())
}
