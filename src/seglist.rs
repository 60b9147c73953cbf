//! Segregated free lists.
//!
//! ```text
//!   class  bound     bucket (unordered, doubly linked through payloads)
//!   ┌────┬────────┐
//!   │  4 │  ≤ 16  │──► [16] ◄──► [16]
//!   │  5 │  ≤ 32  │──► [24] ◄──► [32] ◄──► [32]
//!   │  6 │  ≤ 64  │──► ∅
//!   │ .. │   ..   │
//!   │ 12 │ ≤ 4096 │──► [4000]
//!   │ 31 │  rest  │──► ∅
//!   └────┴────────┘
//! ```
//!
//! A free block keeps `prev_free` in the first payload word and `next_free`
//! in the second. Links are arena offsets, `0` meaning none.

use crate::{arena::Arena, block::WSIZE};

pub const NUM_CLASSES: usize = 32;

const NIL: u32 = 0;

/// Smallest class whose bound `2^i` holds `size`; class 31 catches the rest.
pub fn class_of(size: usize) -> usize {
  for class in 0..NUM_CLASSES {
    if size <= 1 << class {
      return class;
    }
  }
  NUM_CLASSES - 1
}

pub(crate) struct SegregatedList {
  heads: [u32; NUM_CLASSES],
}

impl SegregatedList {
  pub(crate) fn new() -> Self {
    Self {
      heads: [NIL; NUM_CLASSES],
    }
  }

  pub(crate) fn head(
    &self,
    class: usize,
  ) -> Option<usize> {
    link(self.heads[class])
  }

  /// Pushes the free block `bp` onto the bucket of its current size.
  pub(crate) fn insert(
    &mut self,
    arena: &mut Arena,
    bp: usize,
  ) {
    let class = class_of(arena.meta(bp).size);
    let head = self.heads[class];

    set_prev(arena, bp, NIL);
    set_next(arena, bp, head);
    if head != NIL {
      set_prev(arena, head as usize, bp as u32);
    }
    self.heads[class] = bp as u32;
  }

  /// Splices `bp` out of its bucket.
  ///
  /// The bucket is derived from the size in the block's header, so this
  /// must run before the header is rewritten with a different size.
  pub(crate) fn remove(
    &mut self,
    arena: &mut Arena,
    bp: usize,
  ) {
    let class = class_of(arena.meta(bp).size);
    let prev = prev_free(arena, bp);
    let next = next_free(arena, bp);

    match prev {
      Some(prev) => set_next(arena, prev, next.map_or(NIL, |n| n as u32)),
      None => {
        debug_assert_eq!(self.heads[class], bp as u32, "block {bp:#x} is not in class {class}");
        self.heads[class] = next.map_or(NIL, |n| n as u32);
      }
    }
    if let Some(next) = next {
      set_prev(arena, next, prev.map_or(NIL, |p| p as u32));
    }
  }

  pub(crate) fn iter<'a>(
    &self,
    arena: &'a Arena,
    class: usize,
  ) -> FreeIter<'a> {
    FreeIter {
      arena,
      cursor: self.head(class),
    }
  }

  #[cfg(test)]
  pub(crate) fn len(
    &self,
    arena: &Arena,
  ) -> usize {
    (0..NUM_CLASSES).map(|class| self.iter(arena, class).count()).sum()
  }
}

/// Walks one bucket from its head.
pub(crate) struct FreeIter<'a> {
  arena: &'a Arena,
  cursor: Option<usize>,
}

impl Iterator for FreeIter<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let bp = self.cursor?;
    self.cursor = next_free(self.arena, bp);
    Some(bp)
  }
}

fn link(word: u32) -> Option<usize> {
  (word != NIL).then_some(word as usize)
}

pub(crate) fn prev_free(
  arena: &Arena,
  bp: usize,
) -> Option<usize> {
  link(arena.get(bp))
}

pub(crate) fn next_free(
  arena: &Arena,
  bp: usize,
) -> Option<usize> {
  link(arena.get(bp + WSIZE))
}

fn set_prev(
  arena: &mut Arena,
  bp: usize,
  prev: u32,
) {
  arena.put(bp, prev);
}

fn set_next(
  arena: &mut Arena,
  bp: usize,
  next: u32,
) {
  arena.put(bp + WSIZE, next);
}
