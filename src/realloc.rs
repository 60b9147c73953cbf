use std::ptr::NonNull;

use crate::{
  allocator::SegregatedAllocator,
  block::{DSIZE, adjusted_size},
  growth::HeapGrowth,
};

impl<H: HeapGrowth> SegregatedAllocator<H> {
  /// Resizes the allocation at `ptr` to hold at least `size` bytes.
  ///
  /// - `None` behaves as [`allocate`](Self::allocate).
  /// - `size == 0` releases `ptr` and returns `None`.
  /// - A block that is already large enough is returned unchanged; shrinking
  ///   never gives memory back.
  /// - A free block directly after `ptr` is absorbed when the two together
  ///   are large enough, without moving data.
  /// - Otherwise the payload moves to a new block. If that allocation fails
  ///   `None` is returned and `ptr` stays valid and untouched.
  ///
  /// # Safety
  ///
  /// A `Some` pointer must be a live allocation of this allocator. On success
  /// the old pointer must no longer be used unless it was returned.
  pub unsafe fn resize(
    &mut self,
    ptr: Option<NonNull<u8>>,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let Some(ptr) = ptr else {
      return self.allocate(size);
    };
    if size == 0 {
      unsafe { self.release(ptr) };
      return None;
    }

    let Some(asize) = adjusted_size(size) else {
      log::warn!("[seglloc] resize({:p}, {}): request too large", ptr, size);
      return None;
    };
    let bp = self.arena.offset_of(ptr);
    let old_size = self.arena.meta(bp).size;

    if old_size >= asize {
      log::trace!("[seglloc] resize({:#x}) {} -> {}: fits in place", bp, old_size, asize);
      return Some(ptr);
    }

    let next = self.arena.next_block(bp);
    let next_meta = self.arena.meta(next);
    if !next_meta.allocated && old_size + next_meta.size >= asize {
      self.free_lists.remove(&mut self.arena, next);
      self.split(bp, old_size + next_meta.size, asize);
      log::trace!(
        "[seglloc] resize({:#x}) {} -> {}: grew into next block of {}",
        bp,
        old_size,
        asize,
        next_meta.size
      );
      self.debug_check("resize");
      return Some(ptr);
    }

    let Some(new_ptr) = self.allocate(size) else {
      log::warn!("[seglloc] resize({:#x}) {} -> {}: allocation failed, block kept", bp, old_size, asize);
      return None;
    };
    let new_bp = self.arena.offset_of(new_ptr);
    self.arena.copy(bp, new_bp, (old_size - DSIZE).min(size));
    unsafe { self.release(ptr) };

    log::trace!("[seglloc] resize({:#x}) {} -> {}: moved to {:#x}", bp, old_size, asize, new_bp);
    Some(new_ptr)
  }
}
