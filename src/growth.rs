use std::ptr::NonNull;

use crate::error::GrowthError;

/// Source of fresh heap memory, in the manner of `sbrk(2)`.
///
/// # Safety
///
/// A successful `extend(n)` must return a pointer to `n` writable bytes that
/// nobody else touches for the lifetime of the provider. The first region
/// must be 8-byte aligned and every later region must start exactly where
/// the previous one ended; implementations report a broken sequence as
/// [`GrowthError::NonContiguous`] instead of returning it.
pub unsafe trait HeapGrowth {
  /// Appends `increment` bytes to the heap and returns the start of the new
  /// region.
  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, GrowthError>;

  /// Bytes handed out so far.
  fn heap_size(&self) -> usize;

  /// Where the next extension would start, if the provider can tell without
  /// moving anything. Callers use it to refuse a broken sequence before any
  /// memory changes hands.
  fn current_break(&self) -> Option<NonNull<u8>> {
    None
  }
}

unsafe impl<H: HeapGrowth + ?Sized> HeapGrowth for &mut H {
  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, GrowthError> {
    (**self).extend(increment)
  }

  fn heap_size(&self) -> usize {
    (**self).heap_size()
  }

  fn current_break(&self) -> Option<NonNull<u8>> {
    (**self).current_break()
  }
}
