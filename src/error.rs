use std::io;

use thiserror::Error;

/// Failure of the heap-growth primitive.
#[derive(Debug, Error)]
pub enum GrowthError {
  /// The provider's reserved capacity cannot hold the requested extension.
  #[error("heap exhausted: requested {requested} bytes, {available} available")]
  Exhausted { requested: usize, available: usize },

  /// The new region does not start where the previous one ended.
  #[error("heap is not contiguous: expected break at {expected:#x}, got {actual:#x}")]
  NonContiguous { expected: usize, actual: usize },

  /// The first region does not start on the heap alignment.
  #[error("heap start {0:#x} is not 8-byte aligned")]
  Misaligned(usize),

  /// The heap would exceed what 32-bit block offsets can address.
  #[error("heap size {0} exceeds the 4 GiB addressable range")]
  TooLarge(usize),

  /// The operating system refused to move the program break.
  #[error("sbrk failed: {0}")]
  Os(#[from] io::Error),
}

/// Reason an allocation request could not be satisfied.
#[derive(Debug, Error)]
pub enum AllocError {
  #[error("zero-sized allocation")]
  ZeroSize,

  /// Request plus block overhead does not fit in a boundary tag.
  #[error("request of {0} bytes is too large")]
  Oversized(usize),

  #[error("alignment {0} exceeds the heap alignment")]
  UnsupportedAlignment(usize),

  #[error("out of memory: {0}")]
  OutOfMemory(#[from] GrowthError),
}

/// First violation found by [`SegregatedAllocator::check`](crate::SegregatedAllocator::check).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapCheckError {
  #[error("prologue block is corrupted")]
  BadPrologue,

  #[error("epilogue at {0:#x} is corrupted")]
  BadEpilogue(usize),

  #[error("block at {offset:#x}: header {header:#x} does not match footer {footer:#x}")]
  TagMismatch { offset: usize, header: u32, footer: u32 },

  #[error("block at {offset:#x} has invalid size {size}")]
  BadSize { offset: usize, size: usize },

  #[error("block at {offset:#x} runs past the epilogue at {epilogue:#x}")]
  Overlap { offset: usize, epilogue: usize },

  #[error("adjacent free blocks at {prev:#x} and {next:#x} escaped coalescing")]
  Uncoalesced { prev: usize, next: usize },

  #[error("free-list entry {offset:#x} in class {class} is marked allocated")]
  AllocatedInFreeList { offset: usize, class: usize },

  #[error("free-list entry {offset:#x} in class {class} lies outside the heap")]
  OutOfBounds { offset: usize, class: usize },

  #[error("free-list entry {offset:#x} of size {size} sits in class {class}, expected {expected}")]
  WrongClass {
    offset: usize,
    size: usize,
    class: usize,
    expected: usize,
  },

  #[error("free-list entry {offset:#x} has a broken back link")]
  BrokenLink { offset: usize },

  #[error("{walked} free blocks in the heap but {listed} in the free lists")]
  FreeCountMismatch { walked: usize, listed: usize },
}
