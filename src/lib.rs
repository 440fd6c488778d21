//! # rallocator - A Segregated-Fit Heap Allocator
//!
//! A dynamic memory allocator over a single contiguous, growable heap
//! supplied by a host sbrk-style provider. The heap can only be extended at
//! its high end; this crate never returns pages to the host.
//!
//! ## Crate structure
//!
//! ```text
//!   rallocator
//!   ├── align       - the align8! macro (double-word size rounding)
//!   ├── block       - in-band header/footer/link primitives
//!   ├── free_list   - the LEN=20 segregated size-class index
//!   ├── coalesce    - neighbor fusion and heap extension
//!   ├── placement   - split-or-whole-block placement
//!   ├── check       - heap invariant checker (debug/test tool)
//!   ├── heap        - the HeapProvider trait and the real-sbrk SbrkHeap
//!   ├── error       - InitError/HeapError
//!   └── allocator   - SegAllocator, the public malloc/free/realloc surface
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rallocator::{SegAllocator, SbrkHeap};
//!
//! let mut allocator = SegAllocator::new(SbrkHeap::new());
//!
//! unsafe {
//!     let ptr = allocator.malloc(64).expect("allocation failed");
//!     ptr.write(0xAB);
//!     allocator.free(ptr);
//! }
//! ```
//!
//! ## Design
//!
//! Four pieces cooperate over one byte array: in-band block metadata
//! (`block`), the segregated free index (`free_list`), the coalescer and
//! extender (`coalesce`), and the placement policy (`placement`).
//! `allocator` wires them into the four public operations. See
//! `DESIGN.md` for the design rationale behind each piece.
//!
//! ## Safety
//!
//! Every operation that touches heap bytes is `unsafe`: the allocator
//! trusts that pointers passed to `free`/`realloc` were returned by this
//! same allocator and have not already been freed, matching a C `malloc`
//! family's contract.

pub mod align;
pub mod allocator;
pub mod block;
pub mod check;
pub mod coalesce;
pub mod error;
pub mod free_list;
pub mod heap;
pub mod placement;

pub use allocator::SegAllocator;
pub use error::{HeapError, InitError};
pub use heap::{HeapProvider, SbrkHeap};
