//! The heap provider: monotonic, contiguous extension of the process break.
//!
//! `sbrk(2)` is wrapped here and nowhere else, so the block manager (the
//! actual subject of this crate) never touches `libc` directly — it only
//! sees `Heap::extend`/`lo`/`hi`/`size`/`page_size`.

use std::ptr::NonNull;

use libc::{c_void, intptr_t, sbrk};

use crate::error::HeapError;

/// A single monotonically-growing memory region obtained via `sbrk(2)`.
///
/// `Heap` never shrinks and exposes no method that would: returning memory
/// to the host is out of scope for this allocator.
pub struct Heap {
  base: Option<NonNull<u8>>,
  /// One past the last byte currently owned by this heap (`base + size`).
  top: *mut u8,
  page_size: usize,
}

impl Heap {
  /// Creates a heap with no memory yet acquired. Call [`Heap::extend`] to
  /// obtain the first bytes.
  pub fn new() -> Self {
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    Self {
      base: None,
      top: std::ptr::null_mut(),
      page_size: if page_size > 0 { page_size as usize } else { 4096 },
    }
  }

  /// Extends the heap by `bytes` and returns a pointer to the start of the
  /// newly acquired region (the previous break).
  ///
  /// `bytes` should already be rounded to whatever granularity the caller
  /// cares about; `Heap` does not impose alignment of its own beyond what
  /// `sbrk` guarantees (word alignment on every platform this crate
  /// targets).
  pub fn extend(&mut self, bytes: usize) -> Result<NonNull<u8>, HeapError> {
    let old_break = unsafe { sbrk(bytes as intptr_t) };
    if old_break == usize::MAX as *mut c_void {
      return Err(HeapError::OutOfMemory);
    }
    let old_break = old_break as *mut u8;
    let start = NonNull::new(old_break).expect("sbrk returned a null, non-failure break");
    if self.base.is_none() {
      self.base = Some(start);
    }
    self.top = unsafe { old_break.add(bytes) };
    Ok(start)
  }

  /// Lowest address owned by the heap, or null if nothing has been
  /// acquired yet.
  pub fn lo(&self) -> *mut u8 {
    self.base.map_or(std::ptr::null_mut(), NonNull::as_ptr)
  }

  /// Highest *valid* address owned by the heap (`lo + size - 1`), or null
  /// if empty.
  pub fn hi(&self) -> *mut u8 {
    if self.top.is_null() {
      std::ptr::null_mut()
    } else {
      unsafe { self.top.sub(1) }
    }
  }

  /// Total bytes currently owned by the heap.
  pub fn size(&self) -> usize {
    match self.base {
      Some(base) => self.top as usize - base.as_ptr() as usize,
      None => 0,
    }
  }

  /// The host's page size, queried once via `sysconf(_SC_PAGESIZE)`.
  pub fn page_size(&self) -> usize {
    self.page_size
  }

  /// The heap's base address. Panics if [`Heap::extend`] has never
  /// succeeded; every caller in this crate only reaches for this after
  /// `init` has already acquired the heap's first bytes.
  pub fn base_ptr(&self) -> NonNull<u8> {
    self.base.expect("heap accessed before the first extend()")
  }

  /// Converts a byte offset from the heap base into a raw pointer.
  pub fn offset_to_ptr(&self, offset: u32) -> *mut u8 {
    unsafe { self.base_ptr().as_ptr().add(offset as usize) }
  }

  /// Converts a raw pointer inside the heap into a byte offset from the
  /// heap base.
  pub fn ptr_to_offset(&self, ptr: *mut u8) -> u32 {
    (ptr as usize - self.base_ptr().as_ptr() as usize) as u32
  }
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}
