//! Splitting a free block to satisfy an allocation request.

use crate::block::{self, Bp};
use crate::consts::{MIN_BLOCK, TAIL_PLACEMENT_CUTOFF};
use crate::heap::Heap;
use crate::strategy::FreeIndex;

/// Where the allocated payload ended up after [`place`] ran.
///
/// A split can land the freshly-allocated block at `bp` itself
/// (`Direct`) or, when the request is large enough to favor placing the
/// split at the tail of the free block (`mm-explicit.c`'s `asize >= 100`
/// heuristic), at the block immediately after the leftover free remainder
/// (`Shifted`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
  Direct(Bp),
  Shifted(Bp),
}

impl Placement {
  pub fn bp(self) -> Bp {
    match self {
      Placement::Direct(bp) | Placement::Shifted(bp) => bp,
    }
  }
}

/// Allocates `asize` bytes out of the free block at `bp` (already removed
/// from `index`), splitting off and reinserting the remainder when it is
/// large enough to be useful on its own.
pub fn place<F: FreeIndex>(heap: &Heap, index: &mut F, bp: Bp, asize: u32) -> Placement {
  let csize = block::size_of(heap, bp);
  let remainder = csize - asize;

  if remainder <= MIN_BLOCK as u32 {
    block::write_block(heap, bp, csize, true);
    return Placement::Direct(bp);
  }

  if asize >= TAIL_PLACEMENT_CUTOFF as u32 {
    block::write_block(heap, bp, remainder, false);
    let tail = block::next_block(heap, bp);
    block::write_block(heap, tail, asize, true);
    index.insert(heap, bp);
    Placement::Shifted(tail)
  } else {
    block::write_block(heap, bp, asize, true);
    let rest = block::next_block(heap, bp);
    block::write_block(heap, rest, remainder, false);
    index.insert(heap, rest);
    Placement::Direct(bp)
  }
}
