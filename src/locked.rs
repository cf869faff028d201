//! Optional `#[global_allocator]` wrapper.
//!
//! `spec.md` §5 is explicit that the engine itself carries no locking and
//! assumes external exclusion by the client — this module is that external
//! exclusion, layered strictly on top via `spin::Mutex`, the same shape
//! `sleiderr_fzkernel::mem::bmalloc::heap::LockedBuddyAllocator` wraps its
//! (likewise single-threaded) `BuddyAllocator` to implement
//! [`GlobalAlloc`].
//!
//! This is additive: nothing in the block engine requires it, and a caller
//! that already serializes access to an [`Engine`](crate::allocator::Engine)
//! (e.g. a kernel holding its own heap lock) can use the engine directly
//! instead.

use core::alloc::{GlobalAlloc, Layout};

use spin::Mutex;

use crate::addr::HeapAddr;
use crate::allocator::Engine;
use crate::config::ALIGNMENT;
use crate::extender::{HeapExtender, MemOps, SystemMemOps};

/// A [`GlobalAlloc`] built from an [`Engine`], guarded by a spinlock.
///
/// Requests with `layout.align() > 16` cannot be satisfied — `spec.md` §1
/// names alignment stricter than 16 bytes a non-goal — and are reported to
/// the allocator as a regular (non-fatal) failure, i.e. a null pointer.
pub struct LockedAllocator<H: HeapExtender, M: MemOps = SystemMemOps> {
    engine: Mutex<Engine<H, M>>,
}

impl<H: HeapExtender> LockedAllocator<H, SystemMemOps> {
    pub const fn new(engine: Engine<H, SystemMemOps>) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }
}

impl<H: HeapExtender, M: MemOps> LockedAllocator<H, M> {
    pub const fn with_mem_ops(engine: Engine<H, M>) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }
}

unsafe impl<H: HeapExtender, M: MemOps> GlobalAlloc for LockedAllocator<H, M> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return core::ptr::null_mut();
        }
        self.engine.lock().malloc(layout.size()).as_ptr()
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.engine
            .lock()
            .free(unsafe { HeapAddr::from_ptr(ptr) });
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return core::ptr::null_mut();
        }
        self.engine
            .lock()
            .realloc(unsafe { HeapAddr::from_ptr(ptr) }, new_size)
            .as_ptr()
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return core::ptr::null_mut();
        }
        self.engine.lock().calloc(1, layout.size()).as_ptr()
    }
}
