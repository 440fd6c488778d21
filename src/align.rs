//! Double-word (8-byte) alignment used for every block size in the heap.
//!
//! Unlike a pointer-width alignment macro, this one is fixed at `DSIZE`
//! regardless of host word size: the block layout (header/footer widths,
//! minimum block size) is specified in terms of an 8-byte double word, not
//! `size_of::<usize>()`.

/// Rounds `$value` up to the nearest multiple of 8.
///
/// # Examples
///
/// ```rust
/// use rallocator::align8;
/// assert_eq!(align8!(1), 8);
/// assert_eq!(align8!(8), 8);
/// assert_eq!(align8!(9), 16);
/// ```
#[macro_export]
macro_rules! align8 {
  ($value:expr) => {
    (($value) + 7) & !7
  };
}

#[cfg(test)]
mod tests {
  #[test]
  fn rounds_up_to_multiple_of_eight() {
    let cases: [(usize, usize); 9] = [
      (0, 0),
      (1, 8),
      (7, 8),
      (8, 8),
      (9, 16),
      (15, 16),
      (16, 16),
      (17, 24),
      (128, 128),
    ];

    for (input, expected) in cases {
      assert_eq!(align8!(input), expected, "align8!({input})");
    }
  }
}
