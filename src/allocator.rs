//! Public operations: `init`, `malloc`, `free`, `realloc`.
//!
//! Bundles what a global-allocator-style implementation would otherwise
//! keep as process-wide statics (the class-head array and the prologue
//! anchor) into a single struct, so multiple allocators can coexist and
//! nothing here needs `unsafe impl Sync`. Generic over [`HeapProvider`] so
//! the engine can run against a fake heap in tests without touching the
//! real process break.

use crate::block::{self, CHUNKSIZE, DSIZE};
use crate::coalesce;
use crate::error::InitError;
use crate::free_list::{self, Heads};
use crate::heap::HeapProvider;
use crate::placement;

#[cfg(feature = "trace")]
macro_rules! trace {
  ($($arg:tt)*) => { eprintln!($($arg)*) };
}
#[cfg(not(feature = "trace"))]
macro_rules! trace {
  ($($arg:tt)*) => {};
}

/// A segregated-fit allocator over a single contiguous, growable heap.
///
/// `base` doubles as both "is this allocator initialized" and the origin
/// address free-list links are stored as offsets from (see `block.rs`).
pub struct SegAllocator<H: HeapProvider> {
  heap: H,
  base: Option<*mut u8>,
  heap_listp: Option<*mut u8>,
  heads: Heads,
}

impl<H: HeapProvider> SegAllocator<H> {
  /// Creates an allocator over `heap`, uninitialized until the first
  /// `malloc` or an explicit [`init`](Self::init) call.
  pub fn new(heap: H) -> Self {
    Self {
      heap,
      base: None,
      heap_listp: None,
      heads: free_list::new_heads(),
    }
  }

  /// Lays out the prologue/epilogue sentinels and performs the first heap
  /// extension. Safe to call once; `malloc` calls it lazily if needed.
  pub fn init(&mut self) -> Result<(), InitError> {
    let region = self.heap.extend(2 * DSIZE)?;
    self.base = Some(region);

    unsafe {
      block::put(region, 0); // alignment padding
      block::put(region.add(block::WSIZE), block::pack(DSIZE, true)); // prologue header
      block::put(region.add(2 * block::WSIZE), block::pack(DSIZE, true)); // prologue footer
      block::put(region.add(3 * block::WSIZE), block::pack(0, true)); // epilogue header
    }
    self.heap_listp = Some(unsafe { region.add(2 * block::WSIZE) });

    let base = self.base.unwrap();
    unsafe { coalesce::extend_heap(&mut self.heap, base, &mut self.heads, CHUNKSIZE) }?;
    trace!("init: base={:p}", base);
    Ok(())
  }

  fn ensure_init(&mut self) -> Option<()> {
    if self.base.is_none() {
      self.init().ok()?;
    }
    Some(())
  }

  /// Allocates `size` bytes, double-word aligned. Returns `None`, not an
  /// error, for `size == 0` or on out-of-memory.
  pub fn malloc(&mut self, size: usize) -> Option<*mut u8> {
    if size == 0 {
      return None;
    }
    self.ensure_init()?;
    let base = self.base.unwrap();

    let asize = if size <= DSIZE {
      2 * DSIZE
    } else {
      crate::align8!(size + DSIZE)
    };

    let bp = match unsafe { free_list::search(base, &self.heads, asize) } {
      Some(bp) => bp,
      None => {
        let extend_size = asize.max(CHUNKSIZE);
        let bp = unsafe {
          coalesce::extend_heap(&mut self.heap, base, &mut self.heads, extend_size)
        }
        .ok()?;
        trace!("malloc: extended heap for {asize} bytes");
        bp
      }
    };

    unsafe { placement::place(base, &mut self.heads, bp, asize) };
    trace!("malloc({size}) -> {bp:p} (asize={asize})");
    Some(bp)
  }

  /// Frees a block previously returned by `malloc`/`realloc`. A no-op on
  /// `null`, matching libc `free` semantics; passing a pointer this
  /// allocator didn't return is undefined behavior.
  ///
  /// # Safety
  /// `bp` must be null or a payload address this allocator returned, not
  /// already freed.
  pub unsafe fn free(&mut self, bp: *mut u8) {
    if bp.is_null() {
      return;
    }
    let base = self.base.expect("free called before any allocation");

    let size = unsafe { block::size_at(block::header(bp)) };
    unsafe {
      block::write_header_footer(bp, size, false);
      free_list::insert(base, &mut self.heads, bp, size);
      coalesce::coalesce(base, &mut self.heads, bp);
    }
    trace!("free({bp:p}) size={size}");
  }

  /// Resizes a block in place where possible, absorbing a free right
  /// neighbor or growing the heap when `bp` sits at its current high end,
  /// falling back to malloc+copy+free otherwise.
  ///
  /// # Safety
  /// `bp` must be null or a payload address this allocator returned.
  pub unsafe fn realloc(&mut self, bp: *mut u8, size: usize) -> Option<*mut u8> {
    if bp.is_null() {
      return self.malloc(size);
    }
    if size == 0 {
      unsafe { self.free(bp) };
      return None;
    }

    let base = self.base.expect("realloc called before any allocation");
    let cur = unsafe { block::size_at(block::header(bp)) };

    if cur >= DSIZE && size < cur - DSIZE {
      return Some(bp);
    }

    let right = unsafe { block::right(bp) };
    let right_header = block::header(right);
    let right_alloc = unsafe { block::alloc_at(right_header) };
    let right_size = unsafe { block::size_at(right_header) };
    let combined = cur + right_size;

    if !right_alloc && combined >= DSIZE && size <= combined - DSIZE {
      unsafe {
        free_list::delete(base, &mut self.heads, right);
        block::write_header_footer(bp, combined, true);
      }
      trace!("realloc: absorbed free right neighbor, new size={combined}");
      return Some(bp);
    }

    if right_size == 0 {
      // bp is the last real block; right is the epilogue sentinel. Grow
      // the heap in place rather than relocating.
      let need = (size + DSIZE) as isize - cur as isize;
      if need > 0 {
        let extend_amount = (need as usize).max(CHUNKSIZE);
        unsafe { coalesce::extend_heap(&mut self.heap, base, &mut self.heads, extend_amount) }
          .ok()?;
      }

      let grown_right = unsafe { block::right(bp) };
      let grown_size = unsafe { block::size_at(block::header(grown_right)) };
      if grown_size > 0 {
        unsafe { free_list::delete(base, &mut self.heads, grown_right) };
      }
      let new_size = cur + grown_size;
      unsafe { block::write_header_footer(bp, new_size, true) };
      trace!("realloc: grew in place at heap end, new size={new_size}");
      return Some(bp);
    }

    let new_bp = self.malloc(size)?;
    let copy_len = size.min(cur - DSIZE);
    unsafe { std::ptr::copy_nonoverlapping(bp, new_bp, copy_len) };
    unsafe { self.free(bp) };
    trace!("realloc: relocated {bp:p} -> {new_bp:p}");
    Some(new_bp)
  }

  /// Runs the invariant checker over the current heap state.
  pub fn check(&self) -> Result<(), crate::check::Violation> {
    let (Some(base), Some(heap_listp)) = (self.base, self.heap_listp) else {
      return Ok(()); // nothing allocated yet
    };
    unsafe { crate::check::check(base, heap_listp, &self.heads, &self.heap) }
  }
}

impl<H: HeapProvider + Default> Default for SegAllocator<H> {
  fn default() -> Self {
    Self::new(H::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::{HeapError, HeapProvider};
  use std::cell::RefCell;
  use std::rc::Rc;

  struct VecHeap {
    buf: Rc<RefCell<Vec<u8>>>,
    lo: *mut u8,
  }

  impl VecHeap {
    fn new(capacity: usize) -> Self {
      let buf = Rc::new(RefCell::new(Vec::with_capacity(capacity)));
      let lo = buf.borrow().as_ptr() as *mut u8;
      Self { buf, lo }
    }
  }

  impl HeapProvider for VecHeap {
    fn extend(&mut self, n: usize) -> Result<*mut u8, HeapError> {
      let mut buf = self.buf.borrow_mut();
      if buf.len() + n > buf.capacity() {
        return Err(HeapError::OutOfMemory);
      }
      let old_len = buf.len();
      buf.resize(old_len + n, 0);
      Ok(unsafe { buf.as_mut_ptr().add(old_len) })
    }

    fn heap_lo(&self) -> *mut u8 {
      self.lo
    }

    fn heap_hi(&self) -> *mut u8 {
      unsafe { self.lo.add(self.buf.borrow().len()) }
    }
  }

  fn fresh(capacity: usize) -> SegAllocator<VecHeap> {
    let mut allocator = SegAllocator::new(VecHeap::new(capacity));
    allocator.init().expect("init should succeed");
    allocator
  }

  #[test]
  fn malloc_zero_returns_none() {
    let mut allocator = fresh(1 << 16);
    assert_eq!(allocator.malloc(0), None);
  }

  #[test]
  fn free_then_coalesce_then_malloc_reuses_merged_space() {
    let mut allocator = fresh(1 << 16);

    let a = allocator.malloc(1).unwrap();
    let b = allocator.malloc(1).unwrap();
    unsafe {
      allocator.free(a);
      allocator.free(b);
    }

    let c = allocator.malloc(120).unwrap();
    assert!(!c.is_null());
    allocator.check().expect("heap should be consistent");
  }

  #[test]
  fn freeing_three_adjacent_blocks_coalesces_into_one() {
    let mut allocator = fresh(1 << 16);

    let a = allocator.malloc(64).unwrap();
    let b = allocator.malloc(64).unwrap();
    let c = allocator.malloc(64).unwrap();
    unsafe {
      allocator.free(a);
      allocator.free(c);
      allocator.free(b);
    }

    allocator.check().expect("heap should be consistent");

    let size_a = unsafe { block::size_at(block::header(a)) };
    let class = free_list::class(size_a);
    let mut count = 0;
    let mut cur = allocator.heads[class];
    let base = allocator.base.unwrap();
    while let Some(bp) = cur {
      count += 1;
      cur = unsafe { block::succ(base, bp) };
    }
    assert_eq!(count, 1);
  }

  #[test]
  fn realloc_shrink_returns_same_pointer() {
    let mut allocator = fresh(1 << 16);
    let a = allocator.malloc(24).unwrap();
    let r = unsafe { allocator.realloc(a, 8) };
    assert_eq!(r, Some(a));
  }

  #[test]
  fn realloc_absorbs_free_right_neighbor() {
    let mut allocator = fresh(1 << 16);
    let a = allocator.malloc(24).unwrap();
    let b = allocator.malloc(24).unwrap();
    unsafe { allocator.free(b) };

    let r = unsafe { allocator.realloc(a, 40) };
    assert_eq!(r, Some(a));
    let new_size = unsafe { block::size_at(block::header(a)) };
    assert!(new_size >= 48);
  }

  #[test]
  fn realloc_to_much_larger_size_relocates_and_copies() {
    let mut allocator = fresh(1 << 22);
    let a = allocator.malloc(16).unwrap();
    unsafe {
      std::ptr::write_bytes(a, 0xAB, 8);
    }

    let r = unsafe { allocator.realloc(a, 1 << 20) }.unwrap();
    assert_ne!(r, a);
    for i in 0..8 {
      assert_eq!(unsafe { *r.add(i) }, 0xAB);
    }
  }

  #[test]
  fn realloc_null_is_malloc_and_zero_size_is_free() {
    let mut allocator = fresh(1 << 16);
    let a = unsafe { allocator.realloc(std::ptr::null_mut(), 16) };
    assert!(a.is_some());

    let freed = unsafe { allocator.realloc(a.unwrap(), 0) };
    assert_eq!(freed, None);
  }
}
