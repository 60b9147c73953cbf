//! Boundary-tag layout of heap blocks.
//!
//! ```text
//!   ┌────────┬──────────────────────────────┬────────┐
//!   │ header │           payload            │ footer │
//!   │ size|a │  (free: prev_free next_free) │ size|a │
//!   └────────┴──────────────────────────────┴────────┘
//!            ▲
//!            └── bp, the block's identity (8-byte aligned)
//! ```
//!
//! Header and footer are one 4-byte word each and always hold the same
//! value, so a block can be reached from either neighbour.

use crate::{align::checked_align, arena::Arena};

/// Word and boundary-tag size in bytes.
pub const WSIZE: usize = 4;

/// Header plus footer overhead in bytes.
pub const DSIZE: usize = 2 * WSIZE;

/// Payload alignment of every block.
pub const ALIGNMENT: usize = 8;

/// Default amount the heap is extended by when no free block fits.
pub const CHUNK_SIZE: usize = 1 << 12;

/// Smallest block able to hold its tags and both free-list links.
pub const MIN_BLOCK_SIZE: usize = 2 * DSIZE;

/// Largest block size a tag word can encode.
pub const MAX_BLOCK_SIZE: usize = (u32::MAX as usize) & !(ALIGNMENT - 1);

const ALLOC_BIT: u32 = 0x1;
const SIZE_MASK: u32 = !0x7;

/// Decoded contents of a header or footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
  pub size: usize,
  pub allocated: bool,
}

impl BlockMeta {
  pub fn new(
    size: usize,
    allocated: bool,
  ) -> Self {
    Self { size, allocated }
  }

  pub fn free(size: usize) -> Self {
    Self::new(size, false)
  }

  pub fn used(size: usize) -> Self {
    Self::new(size, true)
  }

  pub fn pack(self) -> u32 {
    debug_assert!(self.size % ALIGNMENT == 0 && self.size <= MAX_BLOCK_SIZE);
    self.size as u32 | if self.allocated { ALLOC_BIT } else { 0 }
  }

  pub fn unpack(word: u32) -> Self {
    Self {
      size: (word & SIZE_MASK) as usize,
      allocated: word & ALLOC_BIT != 0,
    }
  }
}

/// Block size needed to serve a `request`-byte payload, `None` on overflow.
pub fn adjusted_size(request: usize) -> Option<usize> {
  request
    .checked_add(DSIZE)
    .and_then(checked_align)
    .filter(|&size| size <= MAX_BLOCK_SIZE)
}

pub fn header_of(bp: usize) -> usize {
  bp - WSIZE
}

impl Arena {
  pub(crate) fn meta(
    &self,
    bp: usize,
  ) -> BlockMeta {
    BlockMeta::unpack(self.get(header_of(bp)))
  }

  pub(crate) fn footer_of(
    &self,
    bp: usize,
  ) -> usize {
    bp + self.meta(bp).size - DSIZE
  }

  pub(crate) fn next_block(
    &self,
    bp: usize,
  ) -> usize {
    bp + self.meta(bp).size
  }

  pub(crate) fn prev_block(
    &self,
    bp: usize,
  ) -> usize {
    bp - self.prev_meta(bp).size
  }

  /// Tag of the block physically before `bp`, read from its footer.
  pub(crate) fn prev_meta(
    &self,
    bp: usize,
  ) -> BlockMeta {
    BlockMeta::unpack(self.get(bp - DSIZE))
  }

  /// Writes identical header and footer for a block of `meta.size` at `bp`.
  pub(crate) fn set_tags(
    &mut self,
    bp: usize,
    meta: BlockMeta,
  ) {
    let word = meta.pack();
    self.put(header_of(bp), word);
    self.put(bp + meta.size - DSIZE, word);
  }
}

#[cfg(test)]
mod tests {
  use std::ptr::NonNull;

  use super::*;

  fn arena(backing: &mut [u64]) -> Arena {
    let lo = NonNull::new(backing.as_mut_ptr() as *mut u8).unwrap();
    unsafe { Arena::new(lo, backing.len() * 8) }
  }

  #[test]
  fn test_pack_roundtrip() {
    assert_eq!(BlockMeta::used(24).pack(), 25);
    assert_eq!(BlockMeta::free(24).pack(), 24);
    assert_eq!(BlockMeta::unpack(4097), BlockMeta::used(4096));
    assert_eq!(BlockMeta::unpack(0x1), BlockMeta::used(0));
  }

  #[test]
  fn test_adjusted_size() {
    assert_eq!(adjusted_size(1), Some(16));
    assert_eq!(adjusted_size(8), Some(16));
    assert_eq!(adjusted_size(9), Some(24));
    assert_eq!(adjusted_size(100), Some(112));
    assert_eq!(adjusted_size(usize::MAX), None);
    assert_eq!(adjusted_size(MAX_BLOCK_SIZE), None);
  }

  #[test]
  fn test_navigation() {
    let mut backing = vec![0u64; 8];
    let mut arena = arena(&mut backing);

    // two blocks: [8, 24) and [24, 56) in payload coordinates
    arena.set_tags(8, BlockMeta::used(16));
    arena.set_tags(24, BlockMeta::free(32));

    assert_eq!(arena.footer_of(8), 16);
    assert_eq!(arena.next_block(8), 24);
    assert_eq!(arena.prev_block(24), 8);
    assert_eq!(arena.prev_meta(24), BlockMeta::used(16));
    assert_eq!(arena.meta(24), BlockMeta::free(32));
    assert_eq!(arena.get(arena.footer_of(24)), BlockMeta::free(32).pack());
  }
}
