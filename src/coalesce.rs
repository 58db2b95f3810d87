//! Boundary-tag coalescing, generic over the free index in use.

use crate::block::{self, Bp};
use crate::heap::Heap;
use crate::strategy::FreeIndex;

/// Merges `bp` (already written as a free block, not yet indexed) with
/// any free neighbors, registers the result in `index`, and returns the
/// block pointer of the merged block.
///
/// Neighbors that participate in the merge are removed from `index`
/// first; the merged block is inserted once, at the end. The four cases
/// mirror the boundary-tag coalescer every source in this family
/// implements: neither, right-only, left-only, or both neighbors free.
pub fn coalesce<F: FreeIndex>(heap: &Heap, index: &mut F, bp: Bp) -> Bp {
  let prev = block::prev_block(heap, bp);
  let next = block::next_block(heap, bp);
  let prev_free = !block::is_allocated(heap, prev);
  let next_free = !block::is_allocated(heap, next);
  let size = block::size_of(heap, bp);

  let merged = match (prev_free, next_free) {
    (false, false) => bp,
    (false, true) => {
      index.remove(heap, next);
      let merged_size = size + block::size_of(heap, next);
      block::write_block(heap, bp, merged_size, false);
      bp
    }
    (true, false) => {
      index.remove(heap, prev);
      let merged_size = size + block::size_of(heap, prev);
      block::write_block(heap, prev, merged_size, false);
      prev
    }
    (true, true) => {
      index.remove(heap, prev);
      index.remove(heap, next);
      let merged_size = size + block::size_of(heap, prev) + block::size_of(heap, next);
      block::write_block(heap, prev, merged_size, false);
      prev
    }
  };

  let merged_end = block::next_block(heap, merged);
  index.on_merge(heap, merged, merged_end);
  index.insert(heap, merged);
  merged
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::explicit::ExplicitFit;

  fn heap_with_prologue() -> (Heap, ExplicitFit, Bp) {
    let mut heap = Heap::new();
    let (index, prologue) = ExplicitFit::init(&mut heap).unwrap();
    (heap, index, prologue)
  }

  fn append_block(heap: &mut Heap, size: u32, alloc: bool) -> Bp {
    let base = heap.extend(size as usize).unwrap();
    let bp = Bp::from_ptr(heap, unsafe { base.as_ptr().add(crate::consts::WSIZE) }).unwrap();
    block::write_block(heap, bp, size, alloc);
    bp
  }

  #[test]
  fn no_merge_when_both_neighbors_allocated() {
    let (mut heap, mut index, prologue) = heap_with_prologue();
    let bp = append_block(&mut heap, 32, false);
    block::write_header(&heap, block::next_block(&heap, bp), 0, true); // epilogue
    let _ = prologue;
    let merged = coalesce(&heap, &mut index, bp);
    assert_eq!(merged, bp);
    assert_eq!(block::size_of(&heap, merged), 32);
  }

  #[test]
  fn merges_with_free_right_neighbor() {
    let (mut heap, mut index, _prologue) = heap_with_prologue();
    let bp = append_block(&mut heap, 32, false);
    let right = append_block(&mut heap, 32, false);
    index.insert(&heap, right);
    block::write_header(&heap, block::next_block(&heap, right), 0, true);

    let merged = coalesce(&heap, &mut index, bp);
    assert_eq!(merged, bp);
    assert_eq!(block::size_of(&heap, merged), 64);
  }

  #[test]
  fn merges_with_free_left_neighbor() {
    let (mut heap, mut index, _prologue) = heap_with_prologue();
    let left = append_block(&mut heap, 32, false);
    index.insert(&heap, left);
    let bp = append_block(&mut heap, 32, false);
    block::write_header(&heap, block::next_block(&heap, bp), 0, true);

    let merged = coalesce(&heap, &mut index, bp);
    assert_eq!(merged, left);
    assert_eq!(block::size_of(&heap, merged), 64);
  }

  #[test]
  fn merges_both_neighbors() {
    let (mut heap, mut index, _prologue) = heap_with_prologue();
    let left = append_block(&mut heap, 32, false);
    index.insert(&heap, left);
    let bp = append_block(&mut heap, 32, false);
    let right = append_block(&mut heap, 32, false);
    index.insert(&heap, right);
    block::write_header(&heap, block::next_block(&heap, right), 0, true);

    let merged = coalesce(&heap, &mut index, bp);
    assert_eq!(merged, left);
    assert_eq!(block::size_of(&heap, merged), 96);
  }
}
