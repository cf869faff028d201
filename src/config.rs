//! Tunable constants for the block engine.
//!
//! Collected in one place rather than scattered as magic numbers, the way
//! `slopos_mm::mm_constants` and `kernel_heap`'s `SIZE_CLASSES` table keep the
//! kernel's own allocators' tunables in a single reviewable spot.

/// Size in bytes of a header or footer word.
pub const WORD_SIZE: usize = 8;

/// All block addresses and sizes are multiples of this.
pub const ALIGNMENT: usize = 16;

/// Smallest possible block: a mini block (header + one payload/link word).
pub const MINI_BLOCK_SIZE: usize = 16;

/// Smallest possible *regular* block: header + next + prev + footer.
pub const MIN_REGULAR_BLOCK_SIZE: usize = 32;

/// Default amount requested from the [`HeapExtender`](crate::extender::HeapExtender)
/// when no free block satisfies a request.
///
/// [`HeapExtender`]: crate::extender::HeapExtender
pub const CHUNK_SIZE: usize = 4096;

/// Number of segregated size classes (14 power-of-two bands plus a catch-all).
pub const NUM_CLASSES: usize = 15;

/// Upper size bound, in bytes, that class 14 must exceed to apply.
/// Classes 0..=13 partition `(32, 2^18]`; class 14 is `(2^18, ..)`.
pub const LAST_BANDED_CLASS_MAX: usize = 1 << 18;

/// Maximum number of candidates scanned per class during bounded best-fit,
/// once the search has moved past the block's own target class.
pub const BEST_FIT_SEARCH_CAP: usize = 10;
