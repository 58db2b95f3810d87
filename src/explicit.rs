//! Explicit free list: a single circular doubly-linked list with a
//! next-fit rover.
//!
//! Grounded directly in `mm-explicit.c`'s `insert_list`/`escape_list`/
//! `find_fit` (`NEXT_FIT` branch). The self-loop-on-single-member
//! invariant from the source is kept, which is what lets [`remove`]
//! splice unconditionally instead of guarding `NEXT(PREV(bp))` against a
//! previously-nulled `PREV(bp)` — the ambiguity called out in the source
//! notes (see `DESIGN.md`).

use crate::block::{self, Bp};
use crate::consts::{DSIZE, WSIZE};
use crate::error::HeapError;
use crate::heap::Heap;
use crate::strategy::FreeIndex;

/// Single circular doubly-linked free list plus a next-fit rover.
pub struct ExplicitFit {
  root: Option<Bp>,
  rover: Option<Bp>,
}

impl ExplicitFit {
  fn insert(&mut self, heap: &Heap, bp: Bp) {
    match self.root {
      None => {
        block::set_link_next(heap, bp, Some(bp));
        block::set_link_prev(heap, bp, Some(bp));
        self.root = Some(bp);
        self.rover = Some(bp);
      }
      Some(head) => {
        let head_prev = block::link_prev(heap, head).expect("list member always has a prev");
        block::set_link_next(heap, bp, Some(head));
        block::set_link_prev(heap, bp, Some(head_prev));
        block::set_link_next(heap, head_prev, Some(bp));
        block::set_link_prev(heap, head, Some(bp));
        self.root = Some(bp);
        if self.rover.is_none() {
          self.rover = Some(bp);
        }
      }
    }
  }

  fn remove(&mut self, heap: &Heap, bp: Bp) {
    let next = block::link_next(heap, bp).expect("removed block must be a member");
    if next == bp {
      // Sole member: the list becomes empty.
      self.root = None;
      self.rover = None;
      return;
    }

    if self.root == Some(bp) {
      self.root = Some(next);
    }
    if self.rover == Some(bp) {
      self.rover = Some(next);
    }

    let prev = block::link_prev(heap, bp).expect("list member always has a prev");
    block::set_link_next(heap, prev, Some(next));
    block::set_link_prev(heap, next, Some(prev));
  }
}

impl FreeIndex for ExplicitFit {
  fn init(heap: &mut Heap) -> Result<(Self, Bp), HeapError> {
    // pad(4) + prologue header(4) + prologue footer(4) + epilogue header(4).
    let base = heap.extend(DSIZE * 2)?;
    let base_ptr = base.as_ptr();
    unsafe {
      (base_ptr as *mut u32).write(0); // alignment pad
    }
    let prologue_bp = Bp::new(WSIZE as u32 * 2).expect("offset 8 is never null");
    block::write_block(heap, prologue_bp, DSIZE as u32, true);
    let epilogue = block::next_block(heap, prologue_bp);
    block::write_header(heap, epilogue, 0, true);

    Ok((ExplicitFit { root: None, rover: None }, prologue_bp))
  }

  fn prologue_size() -> u32 {
    DSIZE as u32
  }

  fn insert(&mut self, heap: &Heap, bp: Bp) {
    ExplicitFit::insert(self, heap, bp)
  }

  fn remove(&mut self, heap: &Heap, bp: Bp) {
    ExplicitFit::remove(self, heap, bp)
  }

  fn find_fit(&mut self, heap: &Heap, asize: u32) -> Option<Bp> {
    let start = self.rover?;
    let mut current = start;
    loop {
      if block::size_of(heap, current) >= asize {
        self.rover = Some(current);
        return Some(current);
      }
      let next = block::link_next(heap, current).expect("list member always has a next");
      if next == start {
        return None;
      }
      current = next;
    }
  }

  fn for_each_member(&self, heap: &Heap, f: &mut dyn FnMut(Bp)) {
    let Some(start) = self.root else { return };
    let mut current = start;
    loop {
      f(current);
      let next = block::link_next(heap, current).expect("list member always has a next");
      if next == start {
        break;
      }
      current = next;
    }
  }

  fn on_merge(&mut self, heap: &Heap, start: Bp, end: Bp) {
    if let Some(rover) = self.rover {
      if rover.get() > start.get() && rover.get() < end.get() {
        self.rover = Some(start);
      }
    }
    let _ = heap; // only offsets are compared; heap kept for signature symmetry
  }

  fn name() -> &'static str {
    "explicit-next-fit"
  }
}
