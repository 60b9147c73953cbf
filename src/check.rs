//! Heap walking and the consistency checker.

use crate::{
  allocator::{FIRST_BLOCK, PROLOGUE, SegregatedAllocator},
  arena::Arena,
  block::{ALIGNMENT, BlockMeta, DSIZE, MIN_BLOCK_SIZE, header_of},
  error::HeapCheckError,
  growth::HeapGrowth,
  seglist::{NUM_CLASSES, class_of, next_free, prev_free},
};

/// One block as seen by [`SegregatedAllocator::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Payload offset from the start of the heap.
  pub offset: usize,
  /// Total block size including tags.
  pub size: usize,
  pub allocated: bool,
}

/// Snapshot of heap occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub heap_size: usize,
  pub allocated_blocks: usize,
  pub allocated_bytes: usize,
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub largest_free: usize,
  pub extensions: usize,
}

/// Iterator over every block between the prologue and the epilogue.
pub struct Blocks<'a> {
  arena: &'a Arena,
  bp: usize,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    if !self.arena.contains(self.bp) {
      return None;
    }
    let BlockMeta { size, allocated } = self.arena.meta(self.bp);
    // epilogue, or a size that would walk out of the heap
    if size == 0 || self.bp + size > self.arena.size() {
      return None;
    }
    let info = BlockInfo {
      offset: self.bp,
      size,
      allocated,
    };
    self.bp += size;
    Some(info)
  }
}

impl<H: HeapGrowth> SegregatedAllocator<H> {
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      arena: &self.arena,
      bp: FIRST_BLOCK,
    }
  }

  pub fn stats(&self) -> HeapStats {
    self.blocks().fold(
      HeapStats {
        heap_size: self.heap_size(),
        extensions: self.extensions(),
        ..HeapStats::default()
      },
      |mut stats, block| {
        if block.allocated {
          stats.allocated_blocks += 1;
          stats.allocated_bytes += block.size;
        } else {
          stats.free_blocks += 1;
          stats.free_bytes += block.size;
          stats.largest_free = stats.largest_free.max(block.size);
        }
        stats
      },
    )
  }

  /// Validates every heap and free-list invariant, reporting the first
  /// violation. Linear in the heap size; meant for tests and debugging.
  pub fn check(&self) -> Result<(), HeapCheckError> {
    let arena = &self.arena;

    if arena.meta(PROLOGUE) != BlockMeta::used(DSIZE) || arena.get(PROLOGUE) != BlockMeta::used(DSIZE).pack() {
      return Err(HeapCheckError::BadPrologue);
    }

    let epilogue = arena.size();
    let mut bp = FIRST_BLOCK;
    let mut prev_free_block: Option<usize> = None;
    let mut walked_free = 0;

    loop {
      let meta = arena.meta(bp);
      if meta.size == 0 {
        break;
      }
      if meta.size % ALIGNMENT != 0 || meta.size < MIN_BLOCK_SIZE {
        return Err(HeapCheckError::BadSize {
          offset: bp,
          size: meta.size,
        });
      }
      if bp + meta.size > epilogue {
        return Err(HeapCheckError::Overlap { offset: bp, epilogue });
      }

      let header = arena.get(header_of(bp));
      let footer = arena.get(arena.footer_of(bp));
      if header != footer {
        return Err(HeapCheckError::TagMismatch {
          offset: bp,
          header,
          footer,
        });
      }

      if meta.allocated {
        prev_free_block = None;
      } else {
        if let Some(prev) = prev_free_block {
          return Err(HeapCheckError::Uncoalesced { prev, next: bp });
        }
        prev_free_block = Some(bp);
        walked_free += 1;
      }
      bp += meta.size;
    }

    if bp != epilogue || arena.meta(bp) != BlockMeta::used(0) {
      return Err(HeapCheckError::BadEpilogue(bp));
    }

    // Links are followed only once the entry holding them is known to lie
    // inside the heap.
    let mut listed = 0;
    for class in 0..NUM_CLASSES {
      let mut expected_prev = None;
      let mut cursor = self.free_lists.head(class);
      while let Some(entry) = cursor {
        if entry < FIRST_BLOCK || entry + MIN_BLOCK_SIZE > epilogue || entry % ALIGNMENT != 0 {
          return Err(HeapCheckError::OutOfBounds { offset: entry, class });
        }
        let meta = arena.meta(entry);
        if meta.allocated {
          return Err(HeapCheckError::AllocatedInFreeList { offset: entry, class });
        }
        let expected = class_of(meta.size);
        if expected != class {
          return Err(HeapCheckError::WrongClass {
            offset: entry,
            size: meta.size,
            class,
            expected,
          });
        }
        if prev_free(arena, entry) != expected_prev {
          return Err(HeapCheckError::BrokenLink { offset: entry });
        }
        expected_prev = Some(entry);
        listed += 1;
        if listed > walked_free {
          // more entries than free blocks: a duplicate or a cycle
          break;
        }
        cursor = next_free(arena, entry);
      }
    }

    if listed != walked_free {
      return Err(HeapCheckError::FreeCountMismatch {
        walked: walked_free,
        listed,
      });
    }
    Ok(())
  }

  #[cfg(feature = "debug-check")]
  pub(crate) fn debug_check(
    &self,
    operation: &str,
  ) {
    if let Err(err) = self.check() {
      log::error!("[seglloc] heap inconsistent after {}: {}", operation, err);
    }
  }

  #[cfg(not(feature = "debug-check"))]
  pub(crate) fn debug_check(
    &self,
    _operation: &str,
  ) {
  }
}
