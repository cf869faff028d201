//! Heap Layout (C2).
//!
//! Forward and backward traversal over the implicit list of physically
//! adjacent blocks, bracketed by the prologue/epilogue sentinels described in
//! `spec.md` §3. Grounded the same way as [`crate::block`]: addresses and
//! pointer casts, no owned block structs, mirroring how `mm.c`'s
//! `find_next`/`find_prev` walk raw `char *` pointers.

use crate::addr::HeapAddr;
use crate::block;
use crate::config::{MINI_BLOCK_SIZE, WORD_SIZE};

/// Address immediately following `block` — its physical successor.
///
/// Defined for every block except the epilogue itself (the epilogue has no
/// successor).
///
/// # Safety
///
/// `block` must be a live, in-bounds, non-epilogue block.
#[inline]
pub unsafe fn find_next(block: HeapAddr) -> HeapAddr {
    block.add(unsafe { block::size(block) })
}

/// Address of `block`'s physical predecessor.
///
/// # Safety
///
/// Per `spec.md`'s Open Question #3: the caller must first check
/// `prev_alloc(block)` and only call `find_prev` when a predecessor is known
/// to exist and own a footer, i.e. when `!prev_alloc(block)`. Calling this
/// when `prev_alloc(block)` is true reads before the block's predecessor's
/// would-be footer, which does not exist for an allocated predecessor.
pub unsafe fn find_prev(block: HeapAddr) -> HeapAddr {
    debug_assert!(
        !unsafe { block::prev_alloc(block) },
        "find_prev called on a block whose predecessor is allocated and owns no footer"
    );
    if unsafe { block::prev_mini(block) } {
        block.sub(MINI_BLOCK_SIZE)
    } else {
        let footer = block.sub(WORD_SIZE);
        let prev_size = unsafe { block::size(footer) };
        block.sub(prev_size)
    }
}

/// True when `block` is the zero-size allocated epilogue sentinel.
///
/// # Safety
///
/// `block` must address a live header word.
#[inline]
pub unsafe fn is_epilogue(block: HeapAddr) -> bool {
    unsafe { block::size(block) == 0 && block::is_alloc(block) }
}

/// Walks the implicit list of physical blocks from `first_block` up to (but
/// excluding) the epilogue.
///
/// # Safety
///
/// `first_block` must be the first real block of a correctly laid out heap,
/// and the heap must not be mutated while the iterator is alive.
pub unsafe fn iter_blocks(first_block: HeapAddr) -> BlockIter {
    BlockIter { next: first_block }
}

/// Iterator over the implicit list, yielding each block's header address.
pub struct BlockIter {
    next: HeapAddr,
}

impl Iterator for BlockIter {
    type Item = HeapAddr;

    fn next(&mut self) -> Option<HeapAddr> {
        let current = self.next;
        // SAFETY: callers of `iter_blocks` uphold the heap's layout
        // invariants for the lifetime of the iterator.
        if unsafe { is_epilogue(current) } {
            return None;
        }
        self.next = unsafe { find_next(current) };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::write_block;

    #[test]
    fn find_next_steps_by_block_size() {
        let mut buf = [0u8; 128];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        unsafe {
            write_block(base, 32, true, true, false);
            assert_eq!(find_next(base), base.add(32));
        }
    }

    #[test]
    fn find_prev_uses_footer_for_regular_predecessor() {
        let mut buf = [0u8; 128];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        unsafe {
            write_block(base, 48, false, true, false);
            let next = find_next(base);
            write_block(next, 32, true, false, false);
            assert_eq!(find_prev(next), base);
        }
    }

    #[test]
    fn find_prev_steps_back_16_for_mini_predecessor() {
        let mut buf = [0u8; 128];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        unsafe {
            write_block(base, 16, true, true, false);
            let next = base.add(16);
            write_block(next, 32, true, false, true);
            assert_eq!(find_prev(next), base);
        }
    }

    #[test]
    fn iter_blocks_stops_at_epilogue() {
        let mut buf = [0u8; 128];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        unsafe {
            write_block(base, 32, true, true, false);
            let b2 = find_next(base);
            write_block(b2, 32, true, true, false);
            let epi = find_next(b2);
            block::write_epilogue(epi, false, false);

            let blocks: std::vec::Vec<HeapAddr> = iter_blocks(base).collect();
            assert_eq!(blocks, std::vec![base, b2]);
        }
    }
}
