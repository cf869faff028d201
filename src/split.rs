//! Splitter (C5).
//!
//! Carves an allocated prefix out of a chosen free block and reinserts
//! whatever remainder is left over. Grounded on `original_source/mm.c`'s
//! `split_block`, generalized to the mini/regular prefix-and-remainder
//! matrix in `spec.md` §4.5.
//!
//! Input `block` must already be removed from whichever free list held it;
//! `asize` must already be rounded to a multiple of 16 and at least 16.

use crate::addr::HeapAddr;
use crate::block;
use crate::config::MINI_BLOCK_SIZE;
use crate::free_list::FreeLists;
use crate::layout::find_next;

/// Splits `block` (size `size(block)`, already unindexed) into an allocated
/// prefix of `asize` bytes and, if any bytes remain, a free remainder that
/// this call reinserts into `lists`.
///
/// Returns the address of the (now allocated) prefix — always `block`
/// itself, since the prefix is carved from the low end.
///
/// # Safety
///
/// `block` must be a free block of size `>= asize` with a correct
/// header/footer, not present in any free list. `asize` must be a multiple
/// of 16, at least 16, and at most `size(block)`.
pub unsafe fn split(lists: &mut FreeLists, block: HeapAddr, asize: usize) -> HeapAddr {
    let total = unsafe { block::size(block) };
    debug_assert!(asize >= MINI_BLOCK_SIZE && asize % 16 == 0 && asize <= total);
    let rem = total - asize;
    let orig_prev_alloc = unsafe { block::prev_alloc(block) };
    let orig_prev_mini = unsafe { block::prev_mini(block) };
    let prefix_is_mini = asize == MINI_BLOCK_SIZE;

    unsafe { block::write_block(block, asize, true, orig_prev_alloc, orig_prev_mini) };

    if rem == 0 {
        let succ = unsafe { find_next(block) };
        unsafe {
            block::set_prev_alloc(succ);
            if prefix_is_mini {
                block::set_prev_mini(succ);
            } else {
                block::clear_prev_mini(succ);
            }
        }
        return block;
    }

    let remainder = unsafe { find_next(block) };
    if rem == MINI_BLOCK_SIZE {
        unsafe {
            block::write_block(remainder, MINI_BLOCK_SIZE, false, true, prefix_is_mini);
            lists.add_to_mini_list(remainder);
            let succ = find_next(remainder);
            block::clear_prev_alloc(succ);
            block::set_prev_mini(succ);
        }
    } else {
        unsafe {
            block::write_block(remainder, rem, false, true, prefix_is_mini);
            lists.add_to_free_list(remainder);
            let succ = find_next(remainder);
            block::clear_prev_alloc(succ);
            block::clear_prev_mini(succ);
        }
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::write_block;

    #[test]
    fn splits_regular_block_with_regular_remainder() {
        let mut buf = [0u8; 128];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        let mut lists = FreeLists::new();
        unsafe {
            write_block(base, 96, false, true, false);
            let after = base.add(96);
            write_block(after, 32, true, false, false);

            let prefix = split(&mut lists, base, 32);
            assert_eq!(prefix, base);
            assert!(block::is_alloc(prefix));
            assert_eq!(block::size(prefix), 32);

            let remainder = find_next(prefix);
            assert_eq!(block::size(remainder), 64);
            assert!(!block::is_alloc(remainder));
            assert!(block::prev_alloc(remainder));
            assert!(!block::prev_mini(remainder));
            assert_eq!(lists.class_head(crate::free_list::size_to_class(64)), remainder);

            assert_eq!(find_next(remainder), after);
            assert!(!block::prev_alloc(after));
            assert!(!block::prev_mini(after));
        }
    }

    #[test]
    fn splits_regular_block_with_mini_remainder() {
        let mut buf = [0u8; 128];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        let mut lists = FreeLists::new();
        unsafe {
            write_block(base, 48, false, true, false);
            let after = base.add(48);
            write_block(after, 32, true, false, false);

            let prefix = split(&mut lists, base, 32);
            let remainder = find_next(prefix);
            assert_eq!(block::size(remainder), 16);
            assert!(!block::is_alloc(remainder));
            assert_eq!(lists.mini_head(), remainder);

            assert_eq!(find_next(remainder), after);
            assert!(!block::prev_alloc(after));
            assert!(block::prev_mini(after));
        }
    }

    #[test]
    fn splits_with_no_remainder_marks_entire_block_allocated() {
        let mut buf = [0u8; 128];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        let mut lists = FreeLists::new();
        unsafe {
            write_block(base, 32, false, true, false);
            let after = base.add(32);
            write_block(after, 32, true, false, false);

            let prefix = split(&mut lists, base, 32);
            assert!(block::is_alloc(prefix));
            assert_eq!(block::size(prefix), 32);
            assert_eq!(find_next(prefix), after);
            assert!(block::prev_alloc(after));
            assert!(!block::prev_mini(after));
        }
    }

    #[test]
    fn splits_mini_prefix_with_regular_remainder() {
        let mut buf = [0u8; 128];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        let mut lists = FreeLists::new();
        unsafe {
            write_block(base, 48, false, true, false);
            let after = base.add(48);
            write_block(after, 32, true, false, false);

            let prefix = split(&mut lists, base, 16);
            assert_eq!(block::size(prefix), 16);
            assert!(block::is_alloc(prefix));

            let remainder = find_next(prefix);
            assert_eq!(block::size(remainder), 32);
            assert!(block::prev_mini(remainder));
            assert!(block::prev_alloc(remainder));
        }
    }
}
