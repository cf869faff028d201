//! Unified error type for the block engine's internal operations.
//!
//! The client-facing four functions (`malloc`/`free`/`realloc`/`calloc`) never
//! propagate errors per the allocator's external contract — they return
//! null/no-op on failure. Internally, though, operations that can fail
//! (extending the heap, validating invariants) are modeled with an explicit
//! `Result`, in the style of `slopos_mm::error::MmError`/`MmResult`: a small
//! `Copy` enum with a hand-written `Display` impl rather than a `thiserror`
//! derive, consolidated in one module instead of scattered per component.

use core::fmt;

/// An error produced by an internal engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The [`HeapExtender`](crate::extender::HeapExtender) could not grow the heap.
    OutOfMemory,
    /// A `calloc` element-count/size multiplication overflowed.
    CountSizeOverflow,
    /// A heap-checker invariant was violated; carries a coarse location tag.
    InvariantViolation(&'static str),
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "heap extender failed to grow the heap"),
            Self::CountSizeOverflow => write!(f, "nmemb * size overflowed"),
            Self::InvariantViolation(where_) => {
                write!(f, "heap invariant violated: {where_}")
            }
        }
    }
}

/// Convenience result type for engine-internal operations.
pub type AllocResult<T = ()> = Result<T, AllocError>;
