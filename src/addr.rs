//! A type-safe heap address.
//!
//! Modeled on `slopos_abi::addr::VirtAddr`: a `#[repr(transparent)]` newtype
//! around the raw integer so that block offsets, class indices, and payload
//! pointers cannot be mixed up by accident, while remaining a zero-cost
//! wrapper around `usize`.

use core::fmt;

/// An address of a byte within the managed heap region.
///
/// This is an address, not a pointer with provenance over any particular
/// allocation — blocks are read and written through raw-pointer casts of
/// this value, matching the "opaque 16-byte-aligned region, accessed through
/// pointer arithmetic" guidance for intrusive free-list links.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HeapAddr(usize);

impl HeapAddr {
    pub const NULL: Self = Self(0);

    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn as_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    #[inline]
    pub unsafe fn from_ptr<T>(ptr: *mut T) -> Self {
        Self(ptr as usize)
    }

    /// Offsets this address forward by `bytes`.
    #[inline]
    pub const fn add(self, bytes: usize) -> Self {
        Self(self.0 + bytes)
    }

    /// Offsets this address backward by `bytes`.
    #[inline]
    pub const fn sub(self, bytes: usize) -> Self {
        Self(self.0 - bytes)
    }
}

impl fmt::Debug for HeapAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapAddr({:#x})", self.0)
    }
}
