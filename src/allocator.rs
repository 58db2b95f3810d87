//! The public allocator: ties the heap provider, block layout, coalescer,
//! placer, and a chosen free index together behind `alloc`/`free`/`realloc`.

use crate::align::block_size_for;
use crate::block::{self, Bp};
use crate::coalesce::coalesce;
use crate::consts::{CHUNKSIZE, DSIZE, MARK_BIT, MIN_BLOCK, TAIL_PLACEMENT_CUTOFF};
use crate::error::{HeapError, HeapViolation};
use crate::heap::Heap;
use crate::place::place;
use crate::strategy::FreeIndex;

/// A block manager parameterized over its free-block membership strategy.
///
/// `Allocator<ExplicitFit>` and `Allocator<SegregatedFit>` are the two
/// instantiations this crate ships; both share every line of this type.
pub struct Allocator<S: FreeIndex> {
  heap: Heap,
  index: S,
  prologue: Bp,
}

impl<S: FreeIndex> Allocator<S> {
  /// Acquires the initial heap region and grows it by one chunk of free
  /// space, ready to satisfy the first allocation without a second
  /// `sbrk` round trip.
  pub fn new() -> Result<Self, HeapError> {
    let mut heap = Heap::new();
    let (index, prologue) = S::init(&mut heap)?;
    let mut allocator = Allocator { heap, index, prologue };
    allocator.extend_heap(CHUNKSIZE)?;
    Ok(allocator)
  }

  /// Grows the heap by at least `min_bytes`, folds the new region into any
  /// free block it lands next to, and returns the (possibly merged) block.
  fn extend_heap(&mut self, min_bytes: usize) -> Result<Bp, HeapError> {
    let bytes = crate::align::align_up(min_bytes, DSIZE);
    let raw = self.heap.extend(bytes)?;
    let offset = self.heap.ptr_to_offset(raw.as_ptr());
    let bp = Bp::new(offset).expect("a freshly extended region is never at offset 0");
    block::write_block(&self.heap, bp, bytes as u32, false);
    let epilogue = block::next_block(&self.heap, bp);
    block::write_header(&self.heap, epilogue, 0, true);
    Ok(coalesce(&self.heap, &mut self.index, bp))
  }

  /// Allocates a payload of at least `size` bytes, returning null on
  /// out-of-memory. A `size` of zero returns null without touching the
  /// heap.
  pub fn alloc(&mut self, size: usize) -> *mut u8 {
    if size == 0 {
      return std::ptr::null_mut();
    }
    let asize = block_size_for(size) as u32;

    let bp = match self.index.find_fit(&self.heap, asize) {
      Some(bp) => bp,
      None => {
        let extend_size = asize.max(CHUNKSIZE as u32) as usize;
        match self.extend_heap(extend_size) {
          Ok(bp) => bp,
          Err(_) => return std::ptr::null_mut(),
        }
      }
    };

    self.index.remove(&self.heap, bp);
    place(&self.heap, &mut self.index, bp, asize).bp().to_ptr(&self.heap)
  }

  /// Frees a payload pointer previously returned by `alloc`/`realloc`.
  /// A null pointer is a documented no-op.
  ///
  /// # Safety
  /// `ptr` must be null or a payload pointer currently outstanding from
  /// this allocator; passing anything else is undefined behavior.
  pub unsafe fn free(&mut self, ptr: *mut u8) {
    if ptr.is_null() {
      return;
    }
    let bp = Bp::from_ptr(&self.heap, ptr).expect("non-null pointer must map to a live block");
    let size = block::size_of(&self.heap, bp);
    block::write_block(&self.heap, bp, size, false);
    coalesce(&self.heap, &mut self.index, bp);
  }

  /// Resizes the block at `ptr` to hold at least `size` bytes, preserving
  /// `min(size, old payload)` bytes of content. See module docs for the
  /// full contract.
  ///
  /// # Safety
  /// `ptr` must be null or a payload pointer currently outstanding from
  /// this allocator.
  pub unsafe fn realloc(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
    if ptr.is_null() {
      return self.alloc(size);
    }
    if size == 0 {
      unsafe { self.free(ptr) };
      return std::ptr::null_mut();
    }

    let bp = Bp::from_ptr(&self.heap, ptr).expect("non-null pointer must map to a live block");
    let csize = block::size_of(&self.heap, bp);
    let asize = block_size_for(size) as u32;

    if asize == csize {
      return ptr;
    }

    if let Some(result) = self.try_resize_in_place(bp, csize, asize) {
      return result;
    }

    let new_ptr = self.alloc(size);
    if !new_ptr.is_null() {
      let copy_len = asize.min(csize) as usize - DSIZE;
      unsafe { std::ptr::copy(ptr, new_ptr, copy_len) };
    }
    unsafe { self.free(ptr) };
    new_ptr
  }

  fn try_resize_in_place(&mut self, bp: Bp, csize: u32, asize: u32) -> Option<*mut u8> {
    let left = block::prev_block(&self.heap, bp);
    let right = block::next_block(&self.heap, bp);
    let p_alloc = block::is_allocated(&self.heap, left);
    let n_alloc = block::is_allocated(&self.heap, right);

    match (p_alloc, n_alloc) {
      (true, true) => self.resize_isolated(bp, csize, asize),
      (true, false) => self.resize_against_right(bp, right, csize, asize),
      (false, true) => self.resize_against_left(bp, left, csize, asize),
      (false, false) => self.resize_against_both(bp, left, right, csize, asize),
    }
  }

  fn resize_isolated(&mut self, bp: Bp, csize: u32, asize: u32) -> Option<*mut u8> {
    if asize > csize || csize - asize < MIN_BLOCK as u32 {
      return None;
    }
    let remainder = csize - asize;
    block::write_block(&self.heap, bp, asize, true);
    let tail = block::next_block(&self.heap, bp);
    block::write_block(&self.heap, tail, remainder, false);
    coalesce(&self.heap, &mut self.index, tail);
    Some(bp.to_ptr(&self.heap))
  }

  fn resize_against_right(&mut self, bp: Bp, right: Bp, csize: u32, asize: u32) -> Option<*mut u8> {
    let right_size = block::size_of(&self.heap, right);
    if asize < csize {
      let remainder = csize - asize;
      self.index.remove(&self.heap, right);
      block::write_block(&self.heap, bp, asize, true);
      let tail = block::next_block(&self.heap, bp);
      block::write_block(&self.heap, tail, remainder + right_size, false);
      self.index.insert(&self.heap, tail);
      return Some(bp.to_ptr(&self.heap));
    }

    let needed = asize - csize;
    if needed > right_size || right_size - needed < MIN_BLOCK as u32 {
      return None;
    }
    self.index.remove(&self.heap, right);
    block::write_block(&self.heap, bp, asize, true);
    let remainder = right_size - needed;
    let tail = block::next_block(&self.heap, bp);
    block::write_block(&self.heap, tail, remainder, false);
    self.index.insert(&self.heap, tail);
    Some(bp.to_ptr(&self.heap))
  }

  fn resize_against_left(&mut self, bp: Bp, left: Bp, csize: u32, asize: u32) -> Option<*mut u8> {
    let left_size = block::size_of(&self.heap, left);
    let old_payload = bp.to_ptr(&self.heap);

    if asize < csize {
      let remainder = csize - asize;
      self.index.remove(&self.heap, left);
      block::write_header(&self.heap, left, left_size + remainder, false);
      let new_bp = block::next_block(&self.heap, left);
      unsafe { std::ptr::copy(old_payload, new_bp.to_ptr(&self.heap), asize as usize - DSIZE) };
      block::write_footer(&self.heap, left, left_size + remainder, false);
      block::write_block(&self.heap, new_bp, asize, true);
      self.index.insert(&self.heap, left);
      return Some(new_bp.to_ptr(&self.heap));
    }

    let needed = asize - csize;
    if needed > left_size || left_size - needed < MIN_BLOCK as u32 {
      return None;
    }
    self.index.remove(&self.heap, left);
    let remainder = left_size - needed;
    block::write_block(&self.heap, left, remainder, false);
    let new_bp = block::next_block(&self.heap, left);
    self.index.insert(&self.heap, left);
    unsafe { std::ptr::copy(old_payload, new_bp.to_ptr(&self.heap), csize as usize - DSIZE) };
    block::write_block(&self.heap, new_bp, asize, true);
    Some(new_bp.to_ptr(&self.heap))
  }

  fn resize_against_both(&mut self, bp: Bp, left: Bp, right: Bp, csize: u32, asize: u32) -> Option<*mut u8> {
    let left_size = block::size_of(&self.heap, left);
    let right_size = block::size_of(&self.heap, right);
    let span = left_size + csize + right_size;
    if span < asize || span - asize < MIN_BLOCK as u32 {
      return None;
    }

    let old_payload = bp.to_ptr(&self.heap);
    self.index.remove(&self.heap, left);
    self.index.remove(&self.heap, right);
    let remainder = span - asize;
    let copy_len = csize.min(asize) as usize - DSIZE;

    if asize >= TAIL_PLACEMENT_CUTOFF as u32 {
      block::write_block(&self.heap, left, remainder, false);
      let new_bp = block::next_block(&self.heap, left);
      unsafe { std::ptr::copy(old_payload, new_bp.to_ptr(&self.heap), copy_len) };
      block::write_block(&self.heap, new_bp, asize, true);
      self.index.insert(&self.heap, left);
      Some(new_bp.to_ptr(&self.heap))
    } else {
      unsafe { std::ptr::copy(old_payload, left.to_ptr(&self.heap), copy_len) };
      block::write_block(&self.heap, left, asize, true);
      let tail = block::next_block(&self.heap, left);
      block::write_block(&self.heap, tail, remainder, false);
      self.index.insert(&self.heap, tail);
      Some(left.to_ptr(&self.heap))
    }
  }

  /// Walks the heap looking for structural and indexing violations,
  /// printing a block-by-block trace when `verbose` is set.
  pub fn check_heap(&self, verbose: bool) -> Vec<HeapViolation> {
    let heap = &self.heap;
    let mut violations = Vec::new();

    let prologue_ok = block::is_allocated(heap, self.prologue)
      && block::header_word(heap, self.prologue) & !MARK_BIT == block::footer_word(heap, self.prologue)
      && block::size_of(heap, self.prologue) == S::prologue_size();
    if !prologue_ok {
      violations.push(HeapViolation::BadPrologue);
    }

    self.index.for_each_member(heap, &mut |bp| block::set_mark(heap, bp, true));

    let mut bp = block::next_block(heap, self.prologue);
    let mut prev_was_free = false;
    loop {
      let size = block::size_of(heap, bp);
      if verbose {
        println!(
          "+{offset:#06x}: size={size} alloc={alloc}",
          offset = bp.get(),
          alloc = block::is_allocated(heap, bp)
        );
      }
      if size == 0 {
        if !block::is_allocated(heap, bp) {
          violations.push(HeapViolation::BadEpilogue);
        }
        break;
      }

      if bp.get() % DSIZE as u32 != 0 {
        violations.push(HeapViolation::Misaligned { bp: bp.get() });
      }
      if size < MIN_BLOCK as u32 || size % DSIZE as u32 != 0 {
        violations.push(HeapViolation::BadBlockSize { bp: bp.get(), size });
      }
      if block::header_word(heap, bp) & !MARK_BIT != block::footer_word(heap, bp) {
        violations.push(HeapViolation::HeaderFooterMismatch { bp: bp.get() });
      }

      let is_free = !block::is_allocated(heap, bp);
      if is_free {
        if prev_was_free {
          let prev = block::prev_block(heap, bp);
          violations.push(HeapViolation::AdjacentFreeBlocks { a: prev.get(), b: bp.get() });
        }
        if !block::is_marked(heap, bp) {
          violations.push(HeapViolation::OrphanFreeBlock { bp: bp.get() });
        }
      }
      prev_was_free = is_free;

      bp = block::next_block(heap, bp);
    }

    self.index.for_each_member(heap, &mut |bp| block::set_mark(heap, bp, false));

    violations
  }

  /// The strategy's diagnostic name, forwarded for logging/test labels.
  pub fn strategy_name(&self) -> &'static str {
    S::name()
  }
}
