use std::ptr::{self, NonNull};

use crate::block::WSIZE;

/// Bounds-asserted view over the bytes a heap provider has handed out.
///
/// Every location is addressed by its byte offset from the first byte of the
/// heap, so block identities survive as plain integers.
pub(crate) struct Arena {
  lo: NonNull<u8>,
  size: usize,
}

impl Arena {
  /// # Safety
  ///
  /// `lo..lo + size` must be writable memory owned exclusively by the
  /// caller for as long as the arena is used, and `lo` must be 8-byte
  /// aligned.
  pub(crate) unsafe fn new(
    lo: NonNull<u8>,
    size: usize,
  ) -> Self {
    Self { lo, size }
  }

  pub(crate) fn size(&self) -> usize {
    self.size
  }

  pub(crate) fn lo(&self) -> NonNull<u8> {
    self.lo
  }

  /// Accounts for `bytes` appended directly after the current end.
  pub(crate) fn grow(
    &mut self,
    bytes: usize,
  ) {
    self.size += bytes;
  }

  /// Address the next extension is expected to start at.
  pub(crate) fn end_addr(&self) -> usize {
    self.lo.as_ptr() as usize + self.size
  }

  pub(crate) fn contains(
    &self,
    offset: usize,
  ) -> bool {
    offset < self.size
  }

  pub(crate) fn get(
    &self,
    offset: usize,
  ) -> u32 {
    debug_assert!(offset % WSIZE == 0, "unaligned word read at {offset:#x}");
    debug_assert!(offset + WSIZE <= self.size, "word read at {offset:#x} past heap end {:#x}", self.size);
    unsafe { ptr::read(self.lo.as_ptr().add(offset) as *const u32) }
  }

  pub(crate) fn put(
    &mut self,
    offset: usize,
    value: u32,
  ) {
    debug_assert!(offset % WSIZE == 0, "unaligned word write at {offset:#x}");
    debug_assert!(offset + WSIZE <= self.size, "word write at {offset:#x} past heap end {:#x}", self.size);
    unsafe { ptr::write(self.lo.as_ptr().add(offset) as *mut u32, value) }
  }

  pub(crate) fn ptr_at(
    &self,
    offset: usize,
  ) -> NonNull<u8> {
    debug_assert!(offset <= self.size);
    unsafe { NonNull::new_unchecked(self.lo.as_ptr().add(offset)) }
  }

  pub(crate) fn offset_of(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    let offset = (ptr.as_ptr() as usize).wrapping_sub(self.lo.as_ptr() as usize);
    debug_assert!(offset < self.size, "pointer {ptr:p} does not belong to this heap");
    offset
  }

  /// Copies `len` bytes between two disjoint payloads.
  pub(crate) fn copy(
    &mut self,
    src: usize,
    dst: usize,
    len: usize,
  ) {
    debug_assert!(src + len <= self.size && dst + len <= self.size);
    debug_assert!(src + len <= dst || dst + len <= src, "overlapping copy");
    unsafe {
      ptr::copy_nonoverlapping(
        self.lo.as_ptr().add(src),
        self.lo.as_ptr().add(dst),
        len,
      );
    }
  }

  pub(crate) fn zero(
    &mut self,
    offset: usize,
    len: usize,
  ) {
    debug_assert!(offset + len <= self.size);
    unsafe { ptr::write_bytes(self.lo.as_ptr().add(offset), 0, len) }
  }
}
