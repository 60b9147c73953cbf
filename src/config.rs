use crate::{
  align::checked_align,
  block::{CHUNK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE},
};

/// Default capacity reserved by [`MemLib`](crate::MemLib): 20 MiB.
pub const MAX_HEAP: usize = 20 * (1 << 20);

/// Tunables of a heap instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  /// Minimum number of bytes requested from the provider per extension.
  pub chunk_size: usize,
  /// Capacity of a simulated heap built from this config.
  pub max_heap: usize,
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      chunk_size: CHUNK_SIZE,
      max_heap: MAX_HEAP,
    }
  }
}

impl HeapConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_chunk_size(
    mut self,
    chunk_size: usize,
  ) -> Self {
    self.chunk_size = chunk_size;
    self
  }

  pub fn with_max_heap(
    mut self,
    max_heap: usize,
  ) -> Self {
    self.max_heap = max_heap;
    self
  }

  /// Extension granularity actually used: aligned, never below one block
  /// and never above the largest block a tag can describe.
  pub(crate) fn effective_chunk(&self) -> usize {
    checked_align(self.chunk_size.max(MIN_BLOCK_SIZE)).map_or(MAX_BLOCK_SIZE, |size| size.min(MAX_BLOCK_SIZE))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = HeapConfig::default();
    assert_eq!(config.chunk_size, 4096);
    assert_eq!(config.max_heap, 20 * 1024 * 1024);
    assert_eq!(config.effective_chunk(), 4096);
  }

  #[test]
  fn test_effective_chunk_is_normalized() {
    assert_eq!(HeapConfig::new().with_chunk_size(0).effective_chunk(), 16);
    assert_eq!(HeapConfig::new().with_chunk_size(100).effective_chunk(), 104);
  }

  #[test]
  fn test_effective_chunk_saturates() {
    assert_eq!(HeapConfig::new().with_chunk_size(usize::MAX).effective_chunk(), MAX_BLOCK_SIZE);
    assert_eq!(HeapConfig::new().with_chunk_size(MAX_BLOCK_SIZE + 1).effective_chunk(), MAX_BLOCK_SIZE);
  }
}
