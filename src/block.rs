//! Block Header Codec (C1).
//!
//! Packs and unpacks the 64-bit boundary word described in `spec.md` §4.1,
//! and provides the raw read/write primitives every other component builds
//! on. Blocks are not modeled as owning Rust structs — per the spec's design
//! notes, a block is "a tagged variant over its allocation bit", so this
//! module works entirely in terms of [`HeapAddr`] plus pointer casts, the
//! same way `slopos_mm::kernel_heap`'s `SlabHeader`/`LargeAllocHeader` are
//! read and written through raw pointer casts rather than owned references.

use bitflags::bitflags;

use crate::addr::HeapAddr;
use crate::config::{MINI_BLOCK_SIZE, WORD_SIZE};

bitflags! {
    /// The low four bits of a header/footer word.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u64 {
        /// This block is allocated.
        const ALLOC = 0b0001;
        /// The physically preceding block is allocated.
        const PREV_ALLOC = 0b0010;
        /// The physically preceding block is a mini block.
        const PREV_MINI = 0b0100;
        /// Reserved; always written as zero (Open Question #2 in `spec.md`).
        const RESERVED = 0b1000;
    }
}

const SIZE_MASK: u64 = !0xF;

/// Packs a block size and the three status bits into a header/footer word.
///
/// # Panics
///
/// Panics (debug builds only) if `size` is not a multiple of 16.
#[inline]
pub fn pack(size: usize, alloc: bool, prev_alloc: bool, prev_mini: bool) -> u64 {
    debug_assert_eq!(size & 0xF, 0, "block size must be a multiple of 16");
    let mut flags = BlockFlags::empty();
    flags.set(BlockFlags::ALLOC, alloc);
    flags.set(BlockFlags::PREV_ALLOC, prev_alloc);
    flags.set(BlockFlags::PREV_MINI, prev_mini);
    size as u64 | flags.bits()
}

#[inline]
pub fn extract_size(word: u64) -> usize {
    (word & SIZE_MASK) as usize
}

#[inline]
pub fn extract_alloc(word: u64) -> bool {
    BlockFlags::from_bits_truncate(word).contains(BlockFlags::ALLOC)
}

#[inline]
pub fn extract_prev_alloc(word: u64) -> bool {
    BlockFlags::from_bits_truncate(word).contains(BlockFlags::PREV_ALLOC)
}

#[inline]
pub fn extract_prev_mini(word: u64) -> bool {
    BlockFlags::from_bits_truncate(word).contains(BlockFlags::PREV_MINI)
}

/// Reads the header word at `block`.
///
/// # Safety
///
/// `block` must address a live header word within the managed heap.
#[inline]
pub unsafe fn read_header(block: HeapAddr) -> u64 {
    unsafe { block.as_ptr::<u64>().read() }
}

/// # Safety
///
/// `block` must address a live header word within the managed heap.
#[inline]
unsafe fn write_header(block: HeapAddr, word: u64) {
    unsafe { block.as_ptr::<u64>().write(word) };
}

/// Address of the footer word of a regular (non-mini) block of the given size.
#[inline]
pub fn footer_addr(block: HeapAddr, size: usize) -> HeapAddr {
    block.add(size - WORD_SIZE)
}

/// # Safety
///
/// `block` must address a live, in-bounds header.
#[inline]
pub unsafe fn size(block: HeapAddr) -> usize {
    extract_size(unsafe { read_header(block) })
}

/// # Safety
///
/// `block` must address a live, in-bounds header.
#[inline]
pub unsafe fn is_alloc(block: HeapAddr) -> bool {
    extract_alloc(unsafe { read_header(block) })
}

/// # Safety
///
/// `block` must address a live, in-bounds header.
#[inline]
pub unsafe fn is_mini(block: HeapAddr) -> bool {
    unsafe { size(block) == MINI_BLOCK_SIZE }
}

/// # Safety
///
/// `block` must address a live, in-bounds header.
#[inline]
pub unsafe fn prev_alloc(block: HeapAddr) -> bool {
    extract_prev_alloc(unsafe { read_header(block) })
}

/// # Safety
///
/// `block` must address a live, in-bounds header.
#[inline]
pub unsafe fn prev_mini(block: HeapAddr) -> bool {
    extract_prev_mini(unsafe { read_header(block) })
}

/// Writes a block's header, and its footer if the block is free and regular
/// (mini blocks never carry a footer, allocated blocks never carry one
/// either — see `spec.md` §3).
///
/// # Safety
///
/// `block` must address `size` live, writable bytes within the managed heap.
pub unsafe fn write_block(block: HeapAddr, size: usize, alloc: bool, prev_alloc: bool, prev_mini: bool) {
    let word = pack(size, alloc, prev_alloc, prev_mini);
    unsafe { write_header(block, word) };
    if !alloc && size != MINI_BLOCK_SIZE {
        unsafe { write_header(footer_addr(block, size), word) };
    }
}

/// Writes the zero-size, allocated epilogue sentinel header at `block`,
/// carrying `prev_alloc`/`prev_mini` bits that describe whatever block now
/// physically precedes it — same contract as every other header word.
///
/// Unlike the prologue, the epilogue moves every time the heap grows, so its
/// prev-status bits are not frozen; callers pass the true status of the
/// current last block, and the coalescer (C4) keeps them correct afterward.
///
/// # Safety
///
/// `block` must address a live header-sized slot at the current heap end.
pub unsafe fn write_epilogue(block: HeapAddr, prev_alloc: bool, prev_mini: bool) {
    unsafe { write_header(block, pack(0, true, prev_alloc, prev_mini)) };
}

/// Writes the zero-size, allocated prologue sentinel *footer* at `block`.
/// Written exactly once, at `init`, and never touched again.
///
/// # Safety
///
/// `block` must address a live header-sized slot immediately before the
/// first real block.
pub unsafe fn write_prologue(block: HeapAddr) {
    unsafe { write_header(block, pack(0, true, true, false)) };
}

/// Sets the `prev_alloc` bit on `block`'s header (and footer, if applicable).
///
/// # Safety
///
/// `block` must address a live, in-bounds block.
pub unsafe fn set_prev_alloc(block: HeapAddr) {
    unsafe { rewrite_prev_bits(block, true, None) };
}

/// Clears the `prev_alloc` bit on `block`'s header (and footer, if applicable).
///
/// # Safety
///
/// `block` must address a live, in-bounds block.
pub unsafe fn clear_prev_alloc(block: HeapAddr) {
    unsafe { rewrite_prev_bits(block, false, None) };
}

/// Sets the `prev_mini` bit on `block`'s header (and footer, if applicable).
///
/// # Safety
///
/// `block` must address a live, in-bounds block.
pub unsafe fn set_prev_mini(block: HeapAddr) {
    unsafe { rewrite_prev_bits(block, true, Some(true)).unwrap() };
}

/// Clears the `prev_mini` bit on `block`'s header (and footer, if applicable).
///
/// # Safety
///
/// `block` must address a live, in-bounds block.
pub unsafe fn clear_prev_mini(block: HeapAddr) {
    unsafe { rewrite_prev_bits(block, true, Some(false)).unwrap() };
}

/// Shared implementation for the four `set_prev_*`/`clear_prev_*` mutators:
/// read the existing header, flip just the requested bit(s), rewrite header
/// and (when free and regular) footer.
///
/// `keep_prev_alloc` carries the bit this call is *not* changing; when
/// `prev_mini_override` is `Some`, the call is mutating `prev_mini` instead
/// of `prev_alloc` and `keep_prev_alloc` is read as-is from the header.
unsafe fn rewrite_prev_bits(
    block: HeapAddr,
    keep_prev_alloc: bool,
    prev_mini_override: Option<bool>,
) -> Option<()> {
    let word = unsafe { read_header(block) };
    let sz = extract_size(word);
    let alloc = extract_alloc(word);
    let (new_prev_alloc, new_prev_mini) = match prev_mini_override {
        Some(mini) => (extract_prev_alloc(word), mini),
        None => (keep_prev_alloc, extract_prev_mini(word)),
    };
    let new_word = pack(sz, alloc, new_prev_alloc, new_prev_mini);
    unsafe { write_header(block, new_word) };
    if !alloc && sz != MINI_BLOCK_SIZE && sz != 0 {
        unsafe { write_header(footer_addr(block, sz), new_word) };
    }
    Some(())
}

/// Address of the payload immediately following a block's header.
#[inline]
pub fn payload_addr(block: HeapAddr) -> HeapAddr {
    block.add(WORD_SIZE)
}

/// Recovers a block's header address from a payload pointer previously
/// handed to a client.
#[inline]
pub fn header_from_payload(payload: HeapAddr) -> HeapAddr {
    payload.sub(WORD_SIZE)
}

/// Reads the intrusive `next` link stored at `block + WORD_SIZE`.
///
/// # Safety
///
/// `block` must be a free block (regular or mini) with room for the link.
pub unsafe fn read_next_link(block: HeapAddr) -> HeapAddr {
    HeapAddr::new(unsafe { block.add(WORD_SIZE).as_ptr::<usize>().read() })
}

/// # Safety
///
/// `block` must be a free block (regular or mini) with room for the link.
pub unsafe fn write_next_link(block: HeapAddr, next: HeapAddr) {
    unsafe { block.add(WORD_SIZE).as_ptr::<usize>().write(next.as_usize()) };
}

/// Reads the intrusive `prev` link stored at `block + 2*WORD_SIZE`.
///
/// # Safety
///
/// `block` must be a free *regular* block (mini blocks have no `prev` link).
pub unsafe fn read_prev_link(block: HeapAddr) -> HeapAddr {
    HeapAddr::new(unsafe { block.add(2 * WORD_SIZE).as_ptr::<usize>().read() })
}

/// # Safety
///
/// `block` must be a free *regular* block (mini blocks have no `prev` link).
pub unsafe fn write_prev_link(block: HeapAddr, prev: HeapAddr) {
    unsafe { block.add(2 * WORD_SIZE).as_ptr::<usize>().write(prev.as_usize()) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrips_size_and_flags() {
        let word = pack(64, true, false, true);
        assert_eq!(extract_size(word), 64);
        assert!(extract_alloc(word));
        assert!(!extract_prev_alloc(word));
        assert!(extract_prev_mini(word));
    }

    #[test]
    fn pack_zero_size_sentinel() {
        let word = pack(0, true, true, false);
        assert_eq!(extract_size(word), 0);
        assert!(extract_alloc(word));
        assert!(extract_prev_alloc(word));
        assert!(!extract_prev_mini(word));
    }

    #[test]
    fn write_block_writes_matching_footer_for_free_regular() {
        let mut buf = [0u8; 64];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        unsafe {
            write_block(base, 32, false, true, false);
            assert_eq!(read_header(base), read_header(footer_addr(base, 32)));
        }
    }

    #[test]
    fn write_block_skips_footer_for_allocated_and_mini() {
        let mut buf = [0xAAu8; 64];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        unsafe {
            write_block(base, 32, true, true, false);
            // Footer slot untouched (still 0xAA) since allocated blocks
            // carry no footer.
            let footer_byte = *footer_addr(base, 32).as_ptr::<u8>();
            assert_eq!(footer_byte, 0xAA);

            write_block(base, 16, false, true, false);
            let after_mini_header = base.add(16).as_ptr::<u8>().read();
            assert_eq!(after_mini_header, 0xAA);
        }
    }

    #[test]
    fn set_and_clear_prev_bits_update_footer_when_free_regular() {
        let mut buf = [0u8; 64];
        let base = HeapAddr::new(buf.as_mut_ptr() as usize);
        unsafe {
            write_block(base, 32, false, false, false);
            set_prev_alloc(base);
            assert!(prev_alloc(base));
            assert!(extract_prev_alloc(read_header(footer_addr(base, 32))));

            set_prev_mini(base);
            assert!(prev_mini(base));
            assert!(extract_prev_mini(read_header(footer_addr(base, 32))));

            clear_prev_alloc(base);
            assert!(!prev_alloc(base));
            clear_prev_mini(base);
            assert!(!prev_mini(base));
        }
    }

    #[test]
    fn payload_and_header_round_trip() {
        let block = HeapAddr::new(0x1000);
        let payload = payload_addr(block);
        assert_eq!(payload.as_usize(), 0x1008);
        assert_eq!(header_from_payload(payload), block);
    }
}
