//! Deciding whether to split a free block's remainder off as a new free
//! block, or hand the whole thing to the caller.

use crate::block::{self, MIN_BLOCK_SIZE};
use crate::free_list::{self, Heads};

/// Marks `bp` (currently free, of size `>= asize`, and linked into the
/// index) allocated for `asize` bytes, splitting the remainder into a new
/// free block when it is at least [`MIN_BLOCK_SIZE`].
///
/// # Safety
/// `bp` must currently be linked into `heads` at the class matching its
/// size.
pub unsafe fn place(base: *mut u8, heads: &mut Heads, bp: *mut u8, asize: usize) {
  let csize = unsafe { block::size_at(block::header(bp)) };
  let remainder = csize - asize;

  unsafe { free_list::delete(base, heads, bp) };

  if remainder >= MIN_BLOCK_SIZE {
    unsafe { block::write_header_footer(bp, asize, true) };
    let next = unsafe { block::right(bp) };
    unsafe {
      block::write_header_footer(next, remainder, false);
      free_list::insert(base, heads, next, remainder);
    }
  } else {
    unsafe { block::write_header_footer(bp, csize, true) };
  }
}
