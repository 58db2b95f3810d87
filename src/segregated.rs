//! Segregated free lists: ten size-class buckets, each a doubly-linked
//! LIFO list, with first-fit search starting at the requested size's own
//! bucket and widening outward.
//!
//! The bucket roots live inside the prologue block's payload rather than
//! in a side table, mirroring `mm-segregate.c`'s `GET_RANK` macro (which
//! indexes `heap_listp` itself). `insert`/`remove` here follow that
//! source's `insert`/`escape` functions directly.

use crate::block::{self, Bp};
use crate::consts::{CLASS_BOUNDS, DSIZE, RANK_COUNT, WSIZE};
use crate::error::HeapError;
use crate::heap::Heap;
use crate::strategy::FreeIndex;

/// Ten-bucket segregated free list. `roots_base` is the byte offset of
/// the first root word, embedded in the prologue's payload.
pub struct SegregatedFit {
  roots_base: u32,
}

fn root_ptr(heap: &Heap, roots_base: u32, rank: usize) -> *mut u8 {
  heap.offset_to_ptr(roots_base + (rank as u32) * WSIZE as u32)
}

fn read_root(heap: &Heap, roots_base: u32, rank: usize) -> Option<Bp> {
  let raw = unsafe { (root_ptr(heap, roots_base, rank) as *mut u32).read() };
  Bp::new(raw)
}

fn write_root(heap: &Heap, roots_base: u32, rank: usize, bp: Option<Bp>) {
  let raw = bp.map_or(0, Bp::get);
  unsafe { (root_ptr(heap, roots_base, rank) as *mut u32).write(raw) }
}

/// Which of the ten buckets a block of `size` bytes belongs in.
/// Bucket `i` (for `i < CLASS_BOUNDS.len()`) holds sizes up to
/// `CLASS_BOUNDS[i]`; the last bucket is unbounded above.
pub fn rank_of(size: u32) -> usize {
  CLASS_BOUNDS
    .iter()
    .position(|&bound| size as usize <= bound)
    .unwrap_or(RANK_COUNT - 1)
}

impl SegregatedFit {
  fn insert(&mut self, heap: &Heap, bp: Bp) {
    let rank = rank_of(block::size_of(heap, bp));
    let head = read_root(heap, self.roots_base, rank);
    block::set_link_next(heap, bp, head);
    block::set_link_prev(heap, bp, None);
    if let Some(head) = head {
      block::set_link_prev(heap, head, Some(bp));
    }
    write_root(heap, self.roots_base, rank, Some(bp));
  }

  fn remove(&mut self, heap: &Heap, bp: Bp) {
    let rank = rank_of(block::size_of(heap, bp));
    let prev = block::link_prev(heap, bp);
    let next = block::link_next(heap, bp);

    match prev {
      Some(prev) => block::set_link_next(heap, prev, next),
      None => write_root(heap, self.roots_base, rank, next),
    }
    if let Some(next) = next {
      block::set_link_prev(heap, next, prev);
    }
  }
}

impl FreeIndex for SegregatedFit {
  fn init(heap: &mut Heap) -> Result<(Self, Bp), HeapError> {
    // pad(4) + prologue header(4) + 10 roots(40) + prologue footer(4) + epilogue header(4).
    let bytes = WSIZE + DSIZE + RANK_COUNT * WSIZE + WSIZE;
    let base = heap.extend(bytes)?;
    unsafe {
      (base.as_ptr() as *mut u32).write(0); // alignment pad
    }
    let prologue_size = (DSIZE + RANK_COUNT * WSIZE) as u32;
    let prologue_bp = Bp::new(WSIZE as u32 * 2).expect("offset 8 is never null");
    block::write_block(heap, prologue_bp, prologue_size, true);

    let roots_base = prologue_bp.get();
    for rank in 0..RANK_COUNT {
      write_root(heap, roots_base, rank, None);
    }

    let epilogue = block::next_block(heap, prologue_bp);
    block::write_header(heap, epilogue, 0, true);

    Ok((SegregatedFit { roots_base }, prologue_bp))
  }

  fn prologue_size() -> u32 {
    (DSIZE + RANK_COUNT * WSIZE) as u32
  }

  fn insert(&mut self, heap: &Heap, bp: Bp) {
    SegregatedFit::insert(self, heap, bp)
  }

  fn remove(&mut self, heap: &Heap, bp: Bp) {
    SegregatedFit::remove(self, heap, bp)
  }

  fn find_fit(&mut self, heap: &Heap, asize: u32) -> Option<Bp> {
    let mut rank = rank_of(asize);
    while rank < RANK_COUNT {
      let mut current = read_root(heap, self.roots_base, rank);
      while let Some(bp) = current {
        if block::size_of(heap, bp) >= asize {
          return Some(bp);
        }
        current = block::link_next(heap, bp);
      }
      rank += 1;
    }
    None
  }

  fn for_each_member(&self, heap: &Heap, f: &mut dyn FnMut(Bp)) {
    for rank in 0..RANK_COUNT {
      let mut current = read_root(heap, self.roots_base, rank);
      while let Some(bp) = current {
        f(bp);
        current = block::link_next(heap, bp);
      }
    }
  }

  fn name() -> &'static str {
    "segregated-first-fit"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn init_heap() -> (Heap, SegregatedFit) {
    let mut heap = Heap::new();
    let (index, _prologue) = SegregatedFit::init(&mut heap).unwrap();
    (heap, index)
  }

  fn free_block(heap: &mut Heap, size: u32) -> Bp {
    let base = heap.extend(size as usize).unwrap();
    let bp = Bp::from_ptr(heap, unsafe { base.as_ptr().add(WSIZE) }).unwrap();
    block::write_block(heap, bp, size, false);
    bp
  }

  #[test]
  fn rank_of_matches_class_bounds() {
    assert_eq!(rank_of(16), 0);
    assert_eq!(rank_of(32), 0);
    assert_eq!(rank_of(33), 1);
    assert_eq!(rank_of(4096), 8);
    assert_eq!(rank_of(4097), 9);
    assert_eq!(rank_of(u32::MAX), 9);
  }

  #[test]
  fn insert_then_find_fit_in_same_bucket() {
    let (mut heap, mut index) = init_heap();
    let bp = free_block(&mut heap, 64);
    index.insert(&heap, bp);
    assert_eq!(index.find_fit(&heap, 48), Some(bp));
  }

  #[test]
  fn find_fit_widens_to_larger_bucket_when_empty() {
    let (mut heap, mut index) = init_heap();
    let big = free_block(&mut heap, 1024);
    index.insert(&heap, big);
    assert_eq!(index.find_fit(&heap, 64), Some(big));
  }

  #[test]
  fn remove_head_updates_root() {
    let (mut heap, mut index) = init_heap();
    let a = free_block(&mut heap, 32);
    let b = free_block(&mut heap, 32);
    index.insert(&heap, a);
    index.insert(&heap, b);
    // LIFO: b is head.
    index.remove(&heap, b);
    assert_eq!(index.find_fit(&heap, 32), Some(a));
  }

  #[test]
  fn remove_middle_splices_correctly() {
    let (mut heap, mut index) = init_heap();
    let a = free_block(&mut heap, 32);
    let b = free_block(&mut heap, 32);
    let c = free_block(&mut heap, 32);
    index.insert(&heap, a);
    index.insert(&heap, b);
    index.insert(&heap, c);
    index.remove(&heap, b);
    let mut seen = Vec::new();
    index.for_each_member(&heap, &mut |bp| seen.push(bp));
    assert_eq!(seen, vec![c, a]);
  }
}
