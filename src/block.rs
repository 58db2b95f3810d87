//! Block layout: header/footer encoding and neighbor navigation.
//!
//! Every live block carries its size and allocation bit on both sides of
//! the payload (a boundary tag), so a block's left neighbor is readable
//! without consulting any separate index.
//!
//! Addressing is done in `u32` byte offsets from the heap base rather than
//! native pointers. The header/footer word is 4 bytes and the minimum
//! block is 16 bytes (header + two link words + footer); on a 64-bit
//! host, native pointers are 8 bytes each and would force a 24-byte
//! minimum, so free-list links are encoded the same way headers are: as
//! 4-byte offsets from a common base. Offset 0 always falls inside the
//! permanently-allocated prologue, so it doubles as the "no block" sentinel.

use std::num::NonZeroU32;

use crate::consts::{ALLOC_BIT, MARK_BIT, SIZE_MASK, WSIZE};
use crate::heap::Heap;

/// A block payload pointer, represented as a nonzero byte offset from the
/// heap base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bp(NonZeroU32);

impl Bp {
  /// Wraps a raw offset, returning `None` if it is the null sentinel (0).
  pub fn new(offset: u32) -> Option<Bp> {
    NonZeroU32::new(offset).map(Bp)
  }

  /// The underlying byte offset from the heap base.
  pub fn get(self) -> u32 {
    self.0.get()
  }

  /// Converts this block pointer to a raw pointer into `heap`.
  pub fn to_ptr(self, heap: &Heap) -> *mut u8 {
    heap.offset_to_ptr(self.get())
  }

  /// Wraps a raw pointer into `heap` as a block pointer.
  pub fn from_ptr(heap: &Heap, ptr: *mut u8) -> Option<Bp> {
    Bp::new(heap.ptr_to_offset(ptr))
  }
}

unsafe fn read_word(p: *mut u8) -> u32 {
  unsafe { (p as *mut u32).read() }
}

unsafe fn write_word(p: *mut u8, value: u32) {
  unsafe { (p as *mut u32).write(value) }
}

/// Packs a size and allocation bit into a header/footer word. `size` must
/// already be a multiple of 8.
pub fn pack(size: u32, alloc: bool) -> u32 {
  size | (alloc as u32)
}

/// Address of `bp`'s header word.
pub fn header_ptr(heap: &Heap, bp: Bp) -> *mut u8 {
  heap.offset_to_ptr(bp.get() - WSIZE as u32)
}

/// Address of `bp`'s footer word, computed from its header's size field.
pub fn footer_ptr(heap: &Heap, bp: Bp) -> *mut u8 {
  heap.offset_to_ptr(bp.get() + size_of(heap, bp) - WSIZE as u32 * 2)
}

/// The block's total size in bytes (header + payload + footer), read from
/// its header.
pub fn size_of(heap: &Heap, bp: Bp) -> u32 {
  unsafe { read_word(header_ptr(heap, bp)) & SIZE_MASK }
}

/// Whether the block is currently marked allocated.
pub fn is_allocated(heap: &Heap, bp: Bp) -> bool {
  unsafe { read_word(header_ptr(heap, bp)) & ALLOC_BIT != 0 }
}

/// Writes `bp`'s header, preserving nothing of the previous value.
pub fn write_header(heap: &Heap, bp: Bp, size: u32, alloc: bool) {
  unsafe { write_word(header_ptr(heap, bp), pack(size, alloc)) }
}

/// Writes `bp`'s footer. `size` must match what has just been (or will be)
/// written to the header, since `footer_ptr` depends on the header's size
/// field being current.
pub fn write_footer(heap: &Heap, bp: Bp, size: u32, alloc: bool) {
  let addr = heap.offset_to_ptr(bp.get() + size - WSIZE as u32 * 2);
  unsafe { write_word(addr, pack(size, alloc)) }
}

/// Convenience: write matching header and footer in one call.
pub fn write_block(heap: &Heap, bp: Bp, size: u32, alloc: bool) {
  write_header(heap, bp, size, alloc);
  write_footer(heap, bp, size, alloc);
}

/// The block immediately to the right of `bp`.
pub fn next_block(heap: &Heap, bp: Bp) -> Bp {
  Bp::new(bp.get() + size_of(heap, bp)).expect("next block offset is never the null sentinel")
}

/// The block immediately to the left of `bp`, read via its footer (the
/// boundary tag).
pub fn prev_block(heap: &Heap, bp: Bp) -> Bp {
  let prev_footer = heap.offset_to_ptr(bp.get() - WSIZE as u32 * 2);
  let prev_size = unsafe { read_word(prev_footer) } & SIZE_MASK;
  Bp::new(bp.get() - prev_size).expect("prev block offset is never the null sentinel")
}

/// Sets (or clears) the checker's mark bit on `bp`'s header. Never touches
/// the footer: boundary-integrity checks compare header and footer with
/// the mark bit masked out, so a half-marked block during a `check_heap`
/// pass is not itself a violation.
pub fn set_mark(heap: &Heap, bp: Bp, marked: bool) {
  let h = header_ptr(heap, bp);
  let word = unsafe { read_word(h) };
  let word = if marked { word | MARK_BIT } else { word & !MARK_BIT };
  unsafe { write_word(h, word) };
}

/// Reads the checker's mark bit from `bp`'s header.
pub fn is_marked(heap: &Heap, bp: Bp) -> bool {
  unsafe { read_word(header_ptr(heap, bp)) & MARK_BIT != 0 }
}

/// Reads a raw header/footer word, mark bit included. Used by `check_heap`
/// to compare header and footer ignoring the mark bit.
pub fn header_word(heap: &Heap, bp: Bp) -> u32 {
  unsafe { read_word(header_ptr(heap, bp)) }
}

/// Reads the raw footer word.
pub fn footer_word(heap: &Heap, bp: Bp) -> u32 {
  unsafe { read_word(footer_ptr(heap, bp)) }
}

/// The first free-index link word, stored at the start of the block's payload.
pub fn link_next(heap: &Heap, bp: Bp) -> Option<Bp> {
  let raw = unsafe { read_word(heap.offset_to_ptr(bp.get())) };
  Bp::new(raw)
}

/// Overwrites the block's "next" free-index link word.
pub fn set_link_next(heap: &Heap, bp: Bp, next: Option<Bp>) {
  let raw = next.map_or(0, Bp::get);
  unsafe { write_word(heap.offset_to_ptr(bp.get()), raw) }
}

/// The second free-index link word, one word into the block's payload.
pub fn link_prev(heap: &Heap, bp: Bp) -> Option<Bp> {
  let raw = unsafe { read_word(heap.offset_to_ptr(bp.get() + WSIZE as u32)) };
  Bp::new(raw)
}

/// Overwrites the block's "prev" free-index link word.
pub fn set_link_prev(heap: &Heap, bp: Bp, prev: Option<Bp>) {
  let raw = prev.map_or(0, Bp::get);
  unsafe { write_word(heap.offset_to_ptr(bp.get() + WSIZE as u32), raw) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn heap_with(bytes: usize) -> Heap {
    let mut heap = Heap::new();
    heap.extend(bytes).unwrap();
    heap
  }

  #[test]
  fn header_footer_round_trip() {
    let heap = heap_with(64);
    let bp = Bp::new(8).unwrap();
    write_block(&heap, bp, 32, true);
    assert_eq!(size_of(&heap, bp), 32);
    assert!(is_allocated(&heap, bp));
    assert_eq!(header_word(&heap, bp) & SIZE_MASK, footer_word(&heap, bp) & SIZE_MASK);
  }

  #[test]
  fn next_and_prev_are_inverse() {
    let heap = heap_with(128);
    let bp = Bp::new(8).unwrap();
    write_block(&heap, bp, 32, false);
    let next = next_block(&heap, bp);
    assert_eq!(next.get(), 8 + 32);
    write_block(&heap, next, 16, true);
    assert_eq!(prev_block(&heap, next), bp);
  }

  #[test]
  fn links_survive_through_payload() {
    let heap = heap_with(64);
    let bp = Bp::new(8).unwrap();
    write_block(&heap, bp, 32, false);
    let other = Bp::new(40).unwrap();
    set_link_next(&heap, bp, Some(other));
    set_link_prev(&heap, bp, None);
    assert_eq!(link_next(&heap, bp), Some(other));
    assert_eq!(link_prev(&heap, bp), None);
  }

  #[test]
  fn mark_bit_does_not_disturb_size_or_alloc() {
    let heap = heap_with(64);
    let bp = Bp::new(8).unwrap();
    write_block(&heap, bp, 32, false);
    set_mark(&heap, bp, true);
    assert!(is_marked(&heap, bp));
    assert_eq!(size_of(&heap, bp), 32);
    assert!(!is_allocated(&heap, bp));
    set_mark(&heap, bp, false);
    assert!(!is_marked(&heap, bp));
  }
}
