//! The `FreeIndex` trait: the one seam where the explicit-list and
//! segregated-fits strategies diverge. Everything else (block layout,
//! coalescing, placement) is shared.

use crate::block::Bp;
use crate::error::HeapError;
use crate::heap::Heap;

/// A membership structure over free blocks, plus the fit-finding policy
/// that goes with it.
///
/// Implemented by [`crate::explicit::ExplicitFit`] (single circular
/// doubly-linked list, next-fit) and [`crate::segregated::SegregatedFit`]
/// (ten size-class buckets, first-fit-within-bucket).
pub trait FreeIndex: Sized {
  /// Acquires the initial bytes for the prologue/epilogue sentinels (and,
  /// for the segregated strategy, the embedded bucket-root array) and
  /// returns the freshly constructed, empty index alongside the
  /// prologue's own block pointer.
  fn init(heap: &mut Heap) -> Result<(Self, Bp), HeapError>;

  /// Adds `bp` to the index. `bp`'s header/footer must already encode
  /// `(size, alloc=0)`.
  fn insert(&mut self, heap: &Heap, bp: Bp);

  /// Removes `bp` from the index. `bp` must currently be a member.
  fn remove(&mut self, heap: &Heap, bp: Bp);

  /// Finds a free block whose size is at least `asize`, without mutating
  /// the heap or the index's membership (a next-fit rover may still move).
  fn find_fit(&mut self, heap: &Heap, asize: u32) -> Option<Bp>;

  /// Invokes `f` once per block currently registered in the index. Used by
  /// `check_heap`'s mark/sweep pass.
  fn for_each_member(&self, heap: &Heap, f: &mut dyn FnMut(Bp));

  /// Hook called by the coalescer immediately after two or three blocks
  /// have been merged into the byte range `[start, end)`, before the
  /// merged block is reinserted. The explicit strategy uses this to snap
  /// its rover forward if it pointed into the range that just vanished;
  /// the segregated strategy has no such cursor and uses the default.
  fn on_merge(&mut self, _heap: &Heap, _start: Bp, _end: Bp) {}

  /// The block size this strategy reserves for its prologue (sentinel
  /// header/footer plus, for the segregated strategy, its embedded
  /// bucket-root array), in bytes. `check_heap` compares the live
  /// prologue's header against this to catch a corrupted size field.
  fn prologue_size() -> u32;

  /// A short, human-readable name for diagnostics (`check_heap` output,
  /// `Debug` impls).
  fn name() -> &'static str;
}
