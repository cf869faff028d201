//! Fit Search (C6).
//!
//! Locates a free block able to satisfy an allocation request, without
//! mutating any list. Grounded on `original_source/mm.c`'s `find_fit`: the
//! same three-tier search order (mini list, first-fit within the target
//! class, bounded best-fit in larger classes) `spec.md` §4.6 describes.

use crate::addr::HeapAddr;
use crate::block;
use crate::config::{BEST_FIT_SEARCH_CAP, MINI_BLOCK_SIZE, NUM_CLASSES};
use crate::free_list::{size_to_class, FreeLists};

/// Finds a free block able to hold `asize` bytes, or `None` if no class has
/// one.
///
/// `asize` must already be rounded to a multiple of 16 and at least 16. The
/// returned block is still present in its list — the caller removes it.
///
/// # Safety
///
/// No list in `lists` may be mutated concurrently with the search (there is
/// no concurrency in this engine, but the borrow alone does not prevent a
/// caller from mutating through a second raw pointer).
pub unsafe fn find_fit(lists: &FreeLists, asize: usize) -> Option<HeapAddr> {
    if asize == MINI_BLOCK_SIZE {
        let head = lists.mini_head();
        if !head.is_null() {
            return Some(head);
        }
    }

    let target_class = size_to_class(asize);
    for candidate in unsafe { lists.iter_class(target_class) } {
        if unsafe { block::size(candidate) } >= asize {
            return Some(candidate);
        }
    }

    for k in (target_class + 1)..NUM_CLASSES {
        let mut best: Option<(HeapAddr, usize)> = None;
        for candidate in unsafe { lists.iter_class(k) }.take(BEST_FIT_SEARCH_CAP) {
            let candidate_size = unsafe { block::size(candidate) };
            if candidate_size < asize {
                continue;
            }
            match best {
                Some((_, best_size)) if candidate_size >= best_size => {}
                _ => best = Some((candidate, candidate_size)),
            }
        }
        if let Some((block, _)) = best {
            return Some(block);
        }
    }

    None
}
