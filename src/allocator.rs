//! Allocator Facade (C7).
//!
//! Orchestrates `init`/`malloc`/`free`/`realloc`/`calloc` atop C1–C6, the way
//! `userland::libc::malloc` sits atop `userland::libc::free_list`. The facade
//! is generic over the two external collaborators `spec.md` §1 carves out of
//! the block engine's scope: [`HeapExtender`] (the break-pointer primitive)
//! and [`MemOps`] (byte copy/fill), so the same engine runs against a real
//! syscall in a hosted binary and an in-memory buffer in tests.

use crate::addr::HeapAddr;
use crate::align::align_up_usize;
use crate::block;
use crate::coalesce;
use crate::config::{ALIGNMENT, CHUNK_SIZE, MINI_BLOCK_SIZE, MIN_REGULAR_BLOCK_SIZE, WORD_SIZE};
use crate::error::AllocResult;
use crate::extender::{HeapExtender, MemOps, SystemMemOps};
use crate::fit;
use crate::free_list::FreeLists;
use crate::split;

/// The block engine: free-list index plus the heap-growth and byte-copy
/// collaborators it is generic over.
///
/// `M` defaults to [`SystemMemOps`] so most callers only need to name `H`.
pub struct Engine<H: HeapExtender, M: MemOps = SystemMemOps> {
    extender: H,
    mem: M,
    lists: FreeLists,
    first_block: HeapAddr,
    epilogue: HeapAddr,
    initialized: bool,
}

impl<H: HeapExtender> Engine<H, SystemMemOps> {
    /// Builds an engine using the system `memcpy`/`memset` primitives.
    pub fn new(extender: H) -> Self {
        Self::with_mem_ops(extender, SystemMemOps)
    }
}

impl<H: HeapExtender, M: MemOps> Engine<H, M> {
    /// Builds an engine with a caller-supplied [`MemOps`] implementation —
    /// chiefly useful for tests that want to observe or fault byte copies.
    pub fn with_mem_ops(extender: H, mem: M) -> Self {
        Self {
            extender,
            mem,
            lists: FreeLists::new(),
            first_block: HeapAddr::NULL,
            epilogue: HeapAddr::NULL,
            initialized: false,
        }
    }

    /// True once `init` has run successfully.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Address of the first real block (immediately after the prologue).
    /// Used by the heap checker's implicit-list walk.
    pub fn first_block(&self) -> HeapAddr {
        self.first_block
    }

    /// Read-only access to the free-list index, for the heap checker.
    pub fn free_lists(&self) -> &FreeLists {
        &self.lists
    }

    /// Validates every structural invariant over the current heap, per
    /// `spec.md` §4.8. Intended for tests and debug builds.
    pub fn check(&self) -> AllocResult<()> {
        unsafe { crate::checker::check_heap(self.first_block, &self.lists) }
    }

    /// Grows the heap by the 16 sentinel bytes, writes the prologue and
    /// epilogue, zeroes the free-list index, then grows by one chunk and
    /// indexes the resulting free block.
    ///
    /// A no-op if already initialized. Also invoked lazily by the first
    /// `malloc` call.
    pub fn init(&mut self) -> AllocResult<()> {
        if self.initialized {
            return Ok(());
        }
        let base = self.extender.extend(2 * WORD_SIZE)?;
        unsafe { block::write_prologue(base) };
        let epilogue = base.add(WORD_SIZE);
        unsafe { block::write_epilogue(epilogue, true, false) };

        self.lists.clear();
        self.first_block = epilogue;
        self.epilogue = epilogue;
        self.initialized = true;

        self.extend_heap(CHUNK_SIZE)?;
        Ok(())
    }

    /// Grows the heap by `size` bytes (rounded up to the alignment),
    /// reclaiming the current epilogue word as the header of a new free
    /// block that spans the reclaimed word plus the freshly extended bytes
    /// minus the word the new epilogue needs — net effect, the heap grows by
    /// exactly `size` bytes. Coalesces the new block with a free
    /// predecessor if one exists, and indexes the result.
    fn extend_heap(&mut self, min_size: usize) -> AllocResult<HeapAddr> {
        let size = align_up_usize(min_size, ALIGNMENT);
        let new_block = self.epilogue;
        // Read the outgoing epilogue's prev-status before it is overwritten
        // by the new block's header — it describes the block that already
        // physically precedes this extension.
        let prev_alloc = unsafe { block::prev_alloc(new_block) };
        let prev_mini = unsafe { block::prev_mini(new_block) };

        self.extender.extend(size)?;

        unsafe { block::write_block(new_block, size, false, prev_alloc, prev_mini) };

        let new_epilogue = new_block.add(size);
        unsafe { block::write_epilogue(new_epilogue, false, size == MINI_BLOCK_SIZE) };
        self.epilogue = new_epilogue;

        let merged = unsafe { coalesce::coalesce(&mut self.lists, new_block) };
        if unsafe { block::is_mini(merged) } {
            unsafe { self.lists.add_to_mini_list(merged) };
        } else {
            unsafe { self.lists.add_to_free_list(merged) };
        }
        Ok(merged)
    }

    /// Computes the allocated block size for a requested payload size `n`,
    /// per `spec.md` §4.7: 16 bytes for `n <= 8`, else the 16-byte-rounded
    /// header-inclusive size, floored at the minimum regular block size.
    fn adjusted_size(n: usize) -> usize {
        if n <= 8 {
            MINI_BLOCK_SIZE
        } else {
            core::cmp::max(align_up_usize(n + WORD_SIZE, ALIGNMENT), MIN_REGULAR_BLOCK_SIZE)
        }
    }

    /// Allocates at least `n` bytes, returning a 16-byte-aligned payload
    /// pointer, or `HeapAddr::NULL` on failure or `n == 0`.
    pub fn malloc(&mut self, n: usize) -> HeapAddr {
        if n == 0 {
            return HeapAddr::NULL;
        }
        if !self.initialized && self.init().is_err() {
            return HeapAddr::NULL;
        }

        let asize = Self::adjusted_size(n);
        let block = loop {
            if let Some(found) = unsafe { fit::find_fit(&self.lists, asize) } {
                break found;
            }
            if self.extend_heap(core::cmp::max(asize, CHUNK_SIZE)).is_err() {
                return HeapAddr::NULL;
            }
        };

        unsafe {
            if block::is_mini(block) {
                self.lists.rem_from_mini_list(block);
            } else {
                self.lists.rem_from_free_list(block);
            }
            let allocated = split::split(&mut self.lists, block, asize);
            block::payload_addr(allocated)
        }
    }

    /// Frees a previously returned payload pointer. A no-op for a null
    /// pointer.
    pub fn free(&mut self, payload: HeapAddr) {
        if payload.is_null() {
            return;
        }
        let block = block::header_from_payload(payload);
        unsafe {
            let size = block::size(block);
            let prev_alloc = block::prev_alloc(block);
            let prev_mini = block::prev_mini(block);
            block::write_block(block, size, false, prev_alloc, prev_mini);

            let merged = coalesce::coalesce(&mut self.lists, block);
            if block::is_mini(merged) {
                self.lists.add_to_mini_list(merged);
            } else {
                self.lists.add_to_free_list(merged);
            }
        }
    }

    /// The number of payload bytes usable by the client at `block`,
    /// i.e. `size - 8` for allocated regular blocks, `8` for allocated
    /// mini blocks.
    fn payload_capacity(block: HeapAddr) -> usize {
        let size = unsafe { block::size(block) };
        if size == MINI_BLOCK_SIZE {
            8
        } else {
            size - WORD_SIZE
        }
    }

    /// Resizes the allocation at `payload` to hold at least `n` bytes,
    /// preserving its contents up to `min(n, old payload size)`.
    ///
    /// `realloc(p, 0)` frees `p` and returns null. `realloc(null, n)` is
    /// `malloc(n)`. On allocation failure the original block is left
    /// untouched and null is returned.
    pub fn realloc(&mut self, payload: HeapAddr, n: usize) -> HeapAddr {
        if n == 0 {
            self.free(payload);
            return HeapAddr::NULL;
        }
        if payload.is_null() {
            return self.malloc(n);
        }

        let new_payload = self.malloc(n);
        if new_payload.is_null() {
            return HeapAddr::NULL;
        }

        let old_block = block::header_from_payload(payload);
        let old_capacity = Self::payload_capacity(old_block);
        let copy_len = core::cmp::min(n, old_capacity);
        unsafe { self.mem.memcpy(new_payload, payload, copy_len) };

        self.free(payload);
        new_payload
    }

    /// Allocates space for `nmemb` elements of `size` bytes each, zeroed.
    /// Returns null, without extending the heap, if `nmemb * size`
    /// overflows.
    pub fn calloc(&mut self, nmemb: usize, size: usize) -> HeapAddr {
        let total = match nmemb.checked_mul(size) {
            Some(total) => total,
            None => return HeapAddr::NULL,
        };
        let payload = self.malloc(total);
        if !payload.is_null() {
            unsafe { self.mem.memset(payload, 0, total) };
        }
        payload
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::alloc::{self, Layout};

    /// A [`HeapExtender`] backed by a pre-reserved, never-reallocating,
    /// 16-byte-aligned buffer — the hosted test double standing in for a
    /// real break-pointer syscall, analogous to `mm::test_fixtures`'s
    /// in-memory heap used by the teacher's own kernel-heap tests.
    ///
    /// A plain `Vec<u8>` is not used here because its base address is only
    /// guaranteed to be aligned to `u8`'s alignment (1), not the 16 bytes
    /// every block address in this crate requires.
    pub struct VecHeapExtender {
        layout: Layout,
        base: *mut u8,
        used: usize,
    }

    impl VecHeapExtender {
        /// Reserves `capacity` bytes up front; `extend` will never cause the
        /// backing buffer to move, so addresses handed out stay valid for
        /// the life of the extender.
        pub fn with_capacity(capacity: usize) -> Self {
            let layout = Layout::from_size_align(capacity, crate::config::ALIGNMENT)
                .expect("test heap capacity too large to align");
            let base = unsafe { alloc::alloc_zeroed(layout) };
            assert!(!base.is_null(), "failed to reserve test heap backing store");
            Self {
                layout,
                base,
                used: 0,
            }
        }
    }

    impl Drop for VecHeapExtender {
        fn drop(&mut self) {
            unsafe { alloc::dealloc(self.base, self.layout) };
        }
    }

    impl HeapExtender for VecHeapExtender {
        fn extend(&mut self, nbytes: usize) -> AllocResult<HeapAddr> {
            if self.used + nbytes > self.layout.size() {
                return Err(crate::error::AllocError::OutOfMemory);
            }
            let base = HeapAddr::new(self.base as usize + self.used);
            self.used += nbytes;
            Ok(base)
        }

        fn heap_lo(&self) -> Option<HeapAddr> {
            if self.used == 0 {
                None
            } else {
                Some(HeapAddr::new(self.base as usize))
            }
        }

        fn heap_hi(&self) -> Option<HeapAddr> {
            if self.used == 0 {
                None
            } else {
                Some(HeapAddr::new(self.base as usize + self.used))
            }
        }
    }

    pub fn test_engine(capacity: usize) -> Engine<VecHeapExtender, SystemMemOps> {
        Engine::new(VecHeapExtender::with_capacity(capacity))
    }
}
