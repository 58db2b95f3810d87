//! Error types: small hand-rolled enums implementing [`std::error::Error`],
//! one per failure domain, rather than a single catch-all.

use std::fmt;

/// Failure of the heap provider to extend the managed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  /// The underlying `sbrk` call failed, typically because the process
  /// hit `RLIMIT_DATA` or the kernel refused to grow the break.
  OutOfMemory,
}

impl fmt::Display for HeapError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HeapError::OutOfMemory => write!(f, "heap provider refused to extend the break"),
    }
  }
}

impl std::error::Error for HeapError {}

/// A single structural or semantic finding from [`crate::allocator::Allocator::check_heap`].
///
/// `check_heap` never panics or mutates allocator state on a bad heap; it
/// collects violations into a `Vec` so tests can assert on them directly
/// instead of scraping printed diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapViolation {
  /// The prologue header does not carry the expected size/allocated encoding.
  BadPrologue,
  /// The epilogue header is not `(size=0, alloc=1)`.
  BadEpilogue,
  /// A payload pointer (in offset form) is not 8-byte aligned.
  Misaligned { bp: u32 },
  /// A block's header and footer words disagree (ignoring the mark bit).
  HeaderFooterMismatch { bp: u32 },
  /// Two free blocks sit next to each other uncoalesced.
  AdjacentFreeBlocks { a: u32, b: u32 },
  /// A block is marked free in its header but absent from the free index.
  OrphanFreeBlock { bp: u32 },
  /// A block's size field is below [`crate::consts::MIN_BLOCK`] or not a multiple of 8.
  BadBlockSize { bp: u32, size: u32 },
}

impl fmt::Display for HeapViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HeapViolation::BadPrologue => write!(f, "bad prologue header"),
      HeapViolation::BadEpilogue => write!(f, "bad epilogue header"),
      HeapViolation::Misaligned { bp } => write!(f, "block at +{bp:#x} is not doubleword aligned"),
      HeapViolation::HeaderFooterMismatch { bp } => {
        write!(f, "header does not match footer for block at +{bp:#x}")
      }
      HeapViolation::AdjacentFreeBlocks { a, b } => {
        write!(f, "adjacent free blocks at +{a:#x} and +{b:#x} were not coalesced")
      }
      HeapViolation::OrphanFreeBlock { bp } => {
        write!(f, "free block at +{bp:#x} is missing from the free index")
      }
      HeapViolation::BadBlockSize { bp, size } => {
        write!(f, "block at +{bp:#x} has invalid size {size}")
      }
    }
  }
}
