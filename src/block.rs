//! In-band block metadata: header/footer encoding, neighbor navigation, and
//! the free-list predecessor/successor link words.
//!
//! A block's header and footer both encode the same 32-bit word: the size
//! (a multiple of 8) in the upper bits, the allocated flag in bit 0. Free
//! blocks additionally store, inside their payload, a predecessor and a
//! successor link for their segregated-list class.
//!
//! Predecessor/successor links are stored as `u32` byte offsets from the
//! heap's base address rather than absolute pointers, so a link word stays
//! `WSIZE` wide no matter how far the heap has grown. Offset `0` is the null
//! sentinel; it can never collide with a real free block because offset 0
//! lands inside the permanently allocated prologue.

pub const WSIZE: usize = 4;
pub const DSIZE: usize = 8;
pub const CHUNKSIZE: usize = 64;
pub const LEN: usize = 20;
pub const MIN_BLOCK_SIZE: usize = 2 * DSIZE;

const ALLOC_FLAG: u32 = 0x1;
const SIZE_MASK: u32 = !0x7;

/// Packs a size and allocated flag into the word format headers/footers use.
pub fn pack(size: usize, alloc: bool) -> u32 {
  size as u32 | if alloc { ALLOC_FLAG } else { 0 }
}

/// Reads the 32-bit word at `addr`.
///
/// # Safety
/// `addr` must be a valid header/footer word inside the heap.
pub unsafe fn get(addr: *mut u8) -> u32 {
  unsafe { (addr as *mut u32).read_unaligned() }
}

/// Writes the 32-bit word at `addr`.
///
/// # Safety
/// `addr` must be a valid header/footer word inside the heap.
pub unsafe fn put(addr: *mut u8, value: u32) {
  unsafe { (addr as *mut u32).write_unaligned(value) }
}

/// Reads the size encoded in the word at `addr`.
///
/// # Safety
/// Same as [`get`].
pub unsafe fn size_at(addr: *mut u8) -> usize {
  (unsafe { get(addr) } & SIZE_MASK) as usize
}

/// Reads the allocated flag encoded in the word at `addr`.
///
/// # Safety
/// Same as [`get`].
pub unsafe fn alloc_at(addr: *mut u8) -> bool {
  (unsafe { get(addr) } & ALLOC_FLAG) != 0
}

/// The header address for a payload pointer `bp`.
pub fn header(bp: *mut u8) -> *mut u8 {
  unsafe { bp.sub(WSIZE) }
}

/// The footer address for a payload pointer `bp`, given its own block size.
pub fn footer_of_size(bp: *mut u8, size: usize) -> *mut u8 {
  unsafe { bp.add(size - DSIZE) }
}

/// The footer address for a payload pointer `bp`, reading its size from the
/// header first.
///
/// # Safety
/// `bp`'s header must be valid.
pub unsafe fn footer(bp: *mut u8) -> *mut u8 {
  let size = unsafe { size_at(header(bp)) };
  footer_of_size(bp, size)
}

/// Writes matching header and footer words `{size, alloc}` for the block at
/// `bp`.
///
/// # Safety
/// `bp`'s header and footer positions (determined by `size`) must lie
/// inside the heap.
pub unsafe fn write_header_footer(bp: *mut u8, size: usize, alloc: bool) {
  let word = pack(size, alloc);
  unsafe {
    put(header(bp), word);
    put(footer_of_size(bp, size), word);
  }
}

/// The payload address of the block physically to the right of `bp`.
///
/// # Safety
/// `bp`'s header must be valid and the right neighbor (possibly the
/// epilogue) must lie inside the heap.
pub unsafe fn right(bp: *mut u8) -> *mut u8 {
  unsafe { bp.add(size_at(header(bp))) }
}

/// The payload address of the block physically to the left of `bp`.
///
/// Valid only because every block, including the prologue, carries a
/// footer: the word immediately before `bp`'s header is always the left
/// neighbor's footer.
///
/// # Safety
/// `bp` must not be the heap's first payload (the prologue itself).
pub unsafe fn left(bp: *mut u8) -> *mut u8 {
  let left_footer = unsafe { bp.sub(DSIZE) };
  let left_size = unsafe { size_at(left_footer) };
  unsafe { bp.sub(left_size) }
}

/// The slot holding the stored predecessor offset (the first payload word).
pub fn pred_slot(bp: *mut u8) -> *mut u8 {
  bp
}

/// The slot holding the stored successor offset (the second payload word).
pub fn succ_slot(bp: *mut u8) -> *mut u8 {
  unsafe { bp.add(WSIZE) }
}

fn offset_of(base: *mut u8, bp: *mut u8) -> u32 {
  (bp as usize - base as usize) as u32
}

fn addr_of(base: *mut u8, offset: u32) -> *mut u8 {
  unsafe { base.add(offset as usize) }
}

/// Reads a link slot, decoding the null sentinel (offset 0) to `None`.
///
/// # Safety
/// `slot` must be a valid link word inside a free block's payload.
pub unsafe fn link_get(base: *mut u8, slot: *mut u8) -> Option<*mut u8> {
  let raw = unsafe { get(slot) };
  if raw == 0 { None } else { Some(addr_of(base, raw)) }
}

/// Writes a link slot, encoding `None` as the null sentinel (offset 0).
///
/// # Safety
/// `slot` must be a valid link word inside a free block's payload.
pub unsafe fn link_set(base: *mut u8, slot: *mut u8, value: Option<*mut u8>) {
  let raw = match value {
    Some(ptr) => offset_of(base, ptr),
    None => 0,
  };
  unsafe { put(slot, raw) }
}

/// The stored predecessor of a free block.
///
/// # Safety
/// `bp` must currently be a free block holding valid link words.
pub unsafe fn pred(base: *mut u8, bp: *mut u8) -> Option<*mut u8> {
  unsafe { link_get(base, pred_slot(bp)) }
}

/// The stored successor of a free block.
///
/// # Safety
/// `bp` must currently be a free block holding valid link words.
pub unsafe fn succ(base: *mut u8, bp: *mut u8) -> Option<*mut u8> {
  unsafe { link_get(base, succ_slot(bp)) }
}

/// Sets the stored predecessor of a free block.
///
/// # Safety
/// `bp` must currently be a free block holding valid link words.
pub unsafe fn set_pred(base: *mut u8, bp: *mut u8, value: Option<*mut u8>) {
  unsafe { link_set(base, pred_slot(bp), value) }
}

/// Sets the stored successor of a free block.
///
/// # Safety
/// `bp` must currently be a free block holding valid link words.
pub unsafe fn set_succ(base: *mut u8, bp: *mut u8, value: Option<*mut u8>) {
  unsafe { link_set(base, succ_slot(bp), value) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pack_roundtrips_size_and_flag() {
    assert_eq!(pack(32, true), 33);
    assert_eq!(pack(32, false), 32);
    assert_eq!(pack(0, true), 1);
  }

  #[test]
  fn header_footer_offsets() {
    let mut buf = [0u8; 64];
    let bp = unsafe { buf.as_mut_ptr().add(WSIZE) };

    unsafe { write_header_footer(bp, 32, true) };

    assert_eq!(header(bp), buf.as_mut_ptr());
    assert_eq!(unsafe { size_at(header(bp)) }, 32);
    assert!(unsafe { alloc_at(header(bp)) });
    assert_eq!(unsafe { footer(bp) }, unsafe { bp.add(32 - DSIZE) });
    assert_eq!(unsafe { get(footer(bp)) }, unsafe { get(header(bp)) });
  }

  #[test]
  fn link_roundtrip_and_null_sentinel() {
    let mut buf = [0u8; 64];
    let base = buf.as_mut_ptr();
    let bp = unsafe { base.add(16) };

    assert_eq!(unsafe { pred(base, bp) }, None);
    unsafe { set_pred(base, bp, Some(unsafe { base.add(8) })) };
    assert_eq!(unsafe { pred(base, bp) }, Some(unsafe { base.add(8) }));

    unsafe { set_pred(base, bp, None) };
    assert_eq!(unsafe { pred(base, bp) }, None);
  }
}
