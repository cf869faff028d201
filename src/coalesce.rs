//! Coalescer (C4).
//!
//! Merges a just-freed block with its physical neighbors. Grounded on
//! `original_source/mm.c`'s `coalesce_block`, which this module follows
//! case-for-case (see `spec.md` §4.4): the four-way table keyed on whether
//! the physical predecessor and successor are allocated.
//!
//! The input block's `alloc` bit must already be cleared by the caller; the
//! input block must **not** yet be in any free list. The returned block is
//! free, has a correct header/footer, and is likewise not yet in any list —
//! inserting it is the caller's job (`spec.md` §4.4).

use crate::addr::HeapAddr;
use crate::block;
use crate::free_list::FreeLists;
use crate::layout::find_next;

/// Removes a free block from whichever list currently holds it.
///
/// # Safety
///
/// `block` must be a free block currently indexed in `lists`.
unsafe fn unindex(lists: &mut FreeLists, block: HeapAddr) {
    if unsafe { crate::block::is_mini(block) } {
        unsafe { lists.rem_from_mini_list(block) };
    } else {
        unsafe { lists.rem_from_free_list(block) };
    }
}

/// Merges `freed` (already marked free, not yet indexed) with whichever
/// physical neighbors are themselves free, removing those neighbors from
/// their free lists in the process.
///
/// Returns the address of the resulting free block, ready for the caller to
/// hand to [`FreeLists::add_to_free_list`] or
/// [`FreeLists::add_to_mini_list`].
///
/// # Safety
///
/// `freed` must be a free block with a correct header/footer, not currently
/// present in any list. Its physical neighbors (as found via
/// [`crate::layout::find_prev`]/[`find_next`]) must be live, correctly
/// tagged blocks.
pub unsafe fn coalesce(lists: &mut FreeLists, freed: HeapAddr) -> HeapAddr {
    let prev_alloc = unsafe { block::prev_alloc(freed) };
    let next = unsafe { find_next(freed) };
    let next_alloc = unsafe { block::is_alloc(next) };

    match (prev_alloc, next_alloc) {
        (true, true) => {
            let freed_is_mini = unsafe { block::is_mini(freed) };
            unsafe {
                block::clear_prev_alloc(next);
                if freed_is_mini {
                    block::set_prev_mini(next);
                } else {
                    block::clear_prev_mini(next);
                }
            }
            freed
        }
        (true, false) => {
            unsafe { unindex(lists, next) };
            let new_size = unsafe { block::size(freed) } + unsafe { block::size(next) };
            let prev_mini_bit = unsafe { block::prev_mini(freed) };
            unsafe { block::write_block(freed, new_size, false, true, prev_mini_bit) };
            let after = unsafe { find_next(freed) };
            unsafe { block::clear_prev_mini(after) };
            freed
        }
        (false, true) => {
            let prev = unsafe { crate::layout::find_prev(freed) };
            unsafe { unindex(lists, prev) };
            let new_size = unsafe { block::size(prev) } + unsafe { block::size(freed) };
            let prev_prev_alloc = unsafe { block::prev_alloc(prev) };
            let prev_prev_mini = unsafe { block::prev_mini(prev) };
            unsafe { block::write_block(prev, new_size, false, prev_prev_alloc, prev_prev_mini) };
            unsafe {
                block::clear_prev_alloc(next);
                block::clear_prev_mini(next);
            }
            prev
        }
        (false, false) => {
            let prev = unsafe { crate::layout::find_prev(freed) };
            unsafe { unindex(lists, prev) };
            unsafe { unindex(lists, next) };
            let new_size =
                unsafe { block::size(prev) } + unsafe { block::size(freed) } + unsafe { block::size(next) };
            let prev_prev_alloc = unsafe { block::prev_alloc(prev) };
            let prev_prev_mini = unsafe { block::prev_mini(prev) };
            unsafe { block::write_block(prev, new_size, false, prev_prev_alloc, prev_prev_mini) };
            let after = unsafe { find_next(prev) };
            unsafe {
                block::clear_prev_alloc(after);
                block::clear_prev_mini(after);
            }
            prev
        }
    }
}
