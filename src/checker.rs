//! Heap Checker (C8).
//!
//! Walks the implicit list verifying every structural invariant in
//! `spec.md` §3, then walks the free-list index and reconciles its count
//! against the free blocks seen on the implicit walk. Grounded on
//! `original_source/mm.c`'s `mm_checkheap`: same check order, same
//! count-reconciliation strategy, reporting the first violation found
//! through the [`crate::diag`] backend rather than `printf`.

use crate::addr::HeapAddr;
use crate::block;
use crate::config::{ALIGNMENT, MINI_BLOCK_SIZE};
use crate::diag::diag;
use crate::error::{AllocError, AllocResult};
use crate::free_list::FreeLists;
use crate::layout::{find_next, is_epilogue};

/// Validates every invariant in `spec.md` §3 against the heap reachable
/// from `first_block` through `lists`.
///
/// Returns `Ok(())` if every invariant holds, or the first violation found
/// as `Err(AllocError::InvariantViolation(where_))`. Also emits a
/// diagnostic line for the violation through [`crate::diag`].
///
/// # Safety
///
/// `first_block` must be the first real block of a heap laid out by this
/// crate's `Engine`, and no other code may mutate the heap concurrently
/// with the check.
pub unsafe fn check_heap(first_block: HeapAddr, lists: &FreeLists) -> AllocResult<()> {
    let mut cursor = first_block;
    let mut prev: Option<HeapAddr> = None;
    let mut implicit_free_count = 0usize;

    loop {
        if unsafe { is_epilogue(cursor) } {
            let word = unsafe { block::read_header(cursor) };
            if block::extract_size(word) != 0 || !block::extract_alloc(word) {
                return violation("epilogue sentinel corrupted");
            }
            break;
        }

        let size = unsafe { block::size(cursor) };
        if size < MINI_BLOCK_SIZE || size % ALIGNMENT != 0 {
            return violation("block size not a positive multiple of 16");
        }
        if cursor.as_usize() % ALIGNMENT != 0 {
            return violation("block address not 16-byte aligned");
        }

        if let Some(predecessor) = prev {
            let expected_alloc = unsafe { block::is_alloc(predecessor) };
            let expected_mini = unsafe { block::is_mini(predecessor) };
            if unsafe { block::prev_alloc(cursor) } != expected_alloc {
                return violation("prev_alloc bit inconsistent with actual predecessor status");
            }
            if unsafe { block::prev_mini(cursor) } != expected_mini {
                return violation("prev_mini bit inconsistent with actual predecessor status");
            }
            if !expected_alloc && !unsafe { block::is_alloc(cursor) } {
                return violation("two physically adjacent blocks are both free");
            }
        }

        if !unsafe { block::is_alloc(cursor) } {
            implicit_free_count += 1;
            if size != MINI_BLOCK_SIZE {
                let footer = block::footer_addr(cursor, size);
                if unsafe { block::read_header(cursor) } != unsafe { block::read_header(footer) } {
                    return violation("free regular block header/footer mismatch");
                }
            }
        }

        prev = Some(cursor);
        cursor = unsafe { find_next(cursor) };
    }

    let indexed_free_count = unsafe { lists.total_free_count() };
    if indexed_free_count != implicit_free_count {
        return violation("free-list count does not match implicit-walk free count");
    }

    Ok(())
}

fn violation(where_: &'static str) -> AllocResult<()> {
    diag!("heap checker: invariant violated: {}", where_);
    Err(AllocError::InvariantViolation(where_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::test_support::test_engine;

    #[test]
    fn fresh_heap_passes_the_checker() {
        let mut engine = test_engine(1 << 20);
        // Lazily initializes on first allocation.
        let p = engine.malloc(16);
        engine.free(p);
        unsafe {
            assert!(check_heap(engine.first_block(), engine.free_lists()).is_ok());
        }
    }

    #[test]
    fn heap_with_live_allocations_passes_the_checker() {
        let mut engine = test_engine(1 << 20);
        let _a = engine.malloc(64);
        let _b = engine.malloc(128);
        let c = engine.malloc(8);
        engine.free(c);
        unsafe {
            assert!(check_heap(engine.first_block(), engine.free_lists()).is_ok());
        }
    }

    #[test]
    fn detects_corrupted_header_size() {
        let mut engine = test_engine(1 << 20);
        let p = engine.malloc(64);
        let b = block::header_from_payload(p);
        unsafe {
            // Zero the whole word, bypassing the codec — size 0 with
            // alloc=false cannot legally appear except in a properly
            // tracked free list, so the implicit walk must reject it.
            b.as_ptr::<u64>().write(0u64);
            assert!(check_heap(engine.first_block(), engine.free_lists()).is_err());
        }
    }
}
