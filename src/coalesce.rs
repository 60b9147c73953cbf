use crate::{allocator::SegregatedAllocator, block::BlockMeta, growth::HeapGrowth};

impl<H: HeapGrowth> SegregatedAllocator<H> {
  /// Merges the free block `bp` with free physical neighbours and files the
  /// result in the free lists. Returns the merged block.
  ///
  /// ```text
  ///   case 1  [A][bp][A]   insert bp
  ///   case 2  [A][bp][F]   bp absorbs next
  ///   case 3  [F][bp][A]   prev absorbs bp
  ///   case 4  [F][bp][F]   prev absorbs bp and next
  /// ```
  ///
  /// Neighbours leave the free lists before any tag is rewritten and the
  /// merged block is inserted exactly once, after every removal.
  pub(crate) fn coalesce(
    &mut self,
    bp: usize,
  ) -> usize {
    let prev_alloc = self.arena.prev_meta(bp).allocated;
    let next = self.arena.next_block(bp);
    let next_meta = self.arena.meta(next);
    let mut size = self.arena.meta(bp).size;

    let merged = match (prev_alloc, next_meta.allocated) {
      (true, true) => bp,
      (true, false) => {
        self.free_lists.remove(&mut self.arena, next);
        size += next_meta.size;
        self.arena.set_tags(bp, BlockMeta::free(size));
        bp
      }
      (false, true) => {
        let prev = self.arena.prev_block(bp);
        self.free_lists.remove(&mut self.arena, prev);
        size += self.arena.meta(prev).size;
        self.arena.set_tags(prev, BlockMeta::free(size));
        prev
      }
      (false, false) => {
        let prev = self.arena.prev_block(bp);
        self.free_lists.remove(&mut self.arena, prev);
        self.free_lists.remove(&mut self.arena, next);
        size += self.arena.meta(prev).size + next_meta.size;
        self.arena.set_tags(prev, BlockMeta::free(size));
        prev
      }
    };

    self.free_lists.insert(&mut self.arena, merged);
    merged
  }
}

#[cfg(test)]
mod tests {
  use crate::{allocator::SegregatedAllocator, block::BlockMeta, config::HeapConfig};

  fn heap() -> SegregatedAllocator {
    SegregatedAllocator::from_config(HeapConfig::new().with_max_heap(1 << 16)).unwrap()
  }

  #[test]
  fn test_both_neighbours_allocated() {
    let mut heap = heap();
    let _a = heap.allocate(24).unwrap();
    let b = heap.allocate(24).unwrap();
    let _c = heap.allocate(24).unwrap();

    unsafe { heap.release(b) };
    let bp = heap.arena.offset_of(b);
    assert_eq!(heap.arena.meta(bp), BlockMeta::free(32));
    assert_eq!(heap.check(), Ok(()));
  }

  #[test]
  fn test_merge_with_next() {
    let mut heap = heap();
    let _a = heap.allocate(24).unwrap();
    let b = heap.allocate(24).unwrap();
    let c = heap.allocate(24).unwrap();
    let _d = heap.allocate(24).unwrap();

    unsafe {
      heap.release(c);
      heap.release(b);
    }
    let bp = heap.arena.offset_of(b);
    assert_eq!(heap.arena.meta(bp), BlockMeta::free(64));
    assert_eq!(heap.arena.get(heap.arena.footer_of(bp)), BlockMeta::free(64).pack());
    assert_eq!(heap.check(), Ok(()));
  }

  #[test]
  fn test_merge_with_prev() {
    let mut heap = heap();
    let _a = heap.allocate(24).unwrap();
    let b = heap.allocate(24).unwrap();
    let c = heap.allocate(24).unwrap();
    let _d = heap.allocate(24).unwrap();

    unsafe {
      heap.release(b);
      heap.release(c);
    }
    let bp = heap.arena.offset_of(b);
    assert_eq!(heap.arena.meta(bp), BlockMeta::free(64));
    assert_eq!(heap.check(), Ok(()));
  }

  #[test]
  fn test_merge_both_sides() {
    let mut heap = heap();
    let _a = heap.allocate(24).unwrap();
    let b = heap.allocate(24).unwrap();
    let c = heap.allocate(24).unwrap();
    let d = heap.allocate(24).unwrap();
    let _e = heap.allocate(24).unwrap();

    unsafe {
      heap.release(b);
      heap.release(d);
      heap.release(c);
    }
    let bp = heap.arena.offset_of(b);
    assert_eq!(heap.arena.meta(bp), BlockMeta::free(96));
    assert_eq!(heap.stats().free_blocks, 2);
    assert_eq!(heap.check(), Ok(()));
  }

  #[test]
  fn test_release_everything_restores_one_block() {
    let mut heap = heap();
    let ptrs: Vec<_> = (1..=10).map(|i| heap.allocate(i * 12).unwrap()).collect();
    for ptr in ptrs.into_iter().rev() {
      unsafe { heap.release(ptr) };
    }

    let stats = heap.stats();
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.allocated_blocks, 0);
    assert_eq!(stats.largest_free, 4096);
    assert_eq!(heap.check(), Ok(()));
  }
}
