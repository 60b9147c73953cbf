use std::ptr::NonNull;

use crate::{
  block::MAX_BLOCK_SIZE,
  config::{HeapConfig, MAX_HEAP},
  error::GrowthError,
  growth::HeapGrowth,
};

/// Simulated heap: a fixed buffer reserved up front and a break offset.
///
/// ```text
///   lo                      brk                         lo + capacity
///   ├────────── heap ────────┼──────────── reserve ──────────┤
/// ```
///
/// The buffer never moves, so pointers into it stay valid while the break
/// advances.
pub struct MemLib {
  lo: NonNull<u64>,
  words: usize,
  brk: usize,
}

impl MemLib {
  pub fn new() -> Self {
    Self::with_capacity(MAX_HEAP)
  }

  /// Reserves `max_heap` bytes, rounded up to the heap alignment.
  pub fn with_capacity(max_heap: usize) -> Self {
    let words = reserve_words(max_heap);
    let buffer: Box<[u64]> = vec![0u64; words].into_boxed_slice();
    let raw = Box::into_raw(buffer) as *mut u64;

    Self {
      // SAFETY: Box::into_raw never returns null, even for empty slices.
      lo: unsafe { NonNull::new_unchecked(raw) },
      words,
      brk: 0,
    }
  }

  pub fn from_config(config: &HeapConfig) -> Self {
    Self::with_capacity(config.max_heap)
  }

  pub fn capacity(&self) -> usize {
    self.words * 8
  }

  /// Bytes still available for extension.
  pub fn remaining(&self) -> usize {
    self.capacity() - self.brk
  }

  /// Moves the break back to the start, forgetting every extension.
  pub fn reset(&mut self) {
    self.brk = 0;
  }
}

/// Words backing a reserve of `max_heap` bytes. Heap offsets live in 32-bit
/// tags, so anything past [`MAX_BLOCK_SIZE`] could never be addressed.
fn reserve_words(max_heap: usize) -> usize {
  crate::align!(max_heap.min(MAX_BLOCK_SIZE)) / 8
}

impl Default for MemLib {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for MemLib {
  fn drop(&mut self) {
    let slice = std::ptr::slice_from_raw_parts_mut(self.lo.as_ptr(), self.words);
    drop(unsafe { Box::from_raw(slice) });
  }
}

unsafe impl HeapGrowth for MemLib {
  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, GrowthError> {
    if increment > self.remaining() {
      log::warn!(
        "[seglloc] memlib: extend({}) exceeds reserve ({} of {} bytes left)",
        increment,
        self.remaining(),
        self.capacity()
      );
      return Err(GrowthError::Exhausted {
        requested: increment,
        available: self.remaining(),
      });
    }

    let old_brk = self.brk;
    self.brk += increment;
    let base = self.lo.as_ptr() as *mut u8;
    Ok(unsafe { NonNull::new_unchecked(base.add(old_brk)) })
  }

  fn heap_size(&self) -> usize {
    self.brk
  }

  fn current_break(&self) -> Option<NonNull<u8>> {
    let base = self.lo.as_ptr() as *mut u8;
    NonNull::new(unsafe { base.add(self.brk) })
  }
}
