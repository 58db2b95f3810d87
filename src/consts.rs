//! Compile-time tunables shared by every strategy.
//!
//! These mirror the constants a malloc-lab style allocator hard-codes at
//! the top of its source file (`WSIZE`, `DSIZE`, `CHUNKSIZE`, ...); keeping
//! them in one module means both [`crate::explicit`] and
//! [`crate::segregated`] agree on the same block-layout arithmetic.

/// Size in bytes of a header/footer word.
pub const WSIZE: usize = 4;

/// Size in bytes of a double word (the block-size granularity).
pub const DSIZE: usize = 8;

/// Bytes requested from the heap provider the first time a strategy runs
/// out of a fitting free block.
pub const CHUNKSIZE: usize = 4096;

/// Minimum total block size: header + two link words + footer.
pub const MIN_BLOCK: usize = 16;

/// Requests at or above this size are placed at the tail of a split free
/// block rather than the head (see [`crate::place`]).
pub const TAIL_PLACEMENT_CUTOFF: usize = 100;

/// Upper bound (inclusive) of each segregated size class, in bytes. Class 9
/// has no upper bound.
pub const CLASS_BOUNDS: [usize; 9] = [32, 64, 96, 128, 256, 512, 1024, 2048, 4096];

/// Number of segregated size classes.
pub const RANK_COUNT: usize = 10;

/// Bit set in a header/footer word when the block is allocated.
pub const ALLOC_BIT: u32 = 0x1;

/// Bit set in a header word while [`crate::allocator`]'s mark/sweep checker
/// is mid-traversal. Never written to a footer.
pub const MARK_BIT: u32 = 0x4;

/// Mask isolating the size field of a header/footer word.
pub const SIZE_MASK: u32 = !0x7;

/// Sentinel offset meaning "no block" for the `u32`-offset addressing
/// scheme used throughout this crate (see [`crate::block::Bp`]). Offset 0
/// always lands inside the permanently-allocated prologue, so it can never
/// be a legitimate free-list member.
pub const NULL_OFFSET: u32 = 0;
