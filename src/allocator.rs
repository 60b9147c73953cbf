use std::{alloc::Layout, ptr::NonNull};

use crate::{
  arena::Arena,
  block::{ALIGNMENT, BlockMeta, DSIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, WSIZE, adjusted_size, header_of},
  config::HeapConfig,
  error::{AllocError, GrowthError},
  growth::HeapGrowth,
  memlib::MemLib,
  seglist::{NUM_CLASSES, SegregatedList, class_of},
};

/// Payload offset of the prologue block.
pub(crate) const PROLOGUE: usize = 2 * WSIZE;

/// Payload offset of the first real block.
pub(crate) const FIRST_BLOCK: usize = 4 * WSIZE;

/// Boundary-tag allocator over one growable heap, with segregated free lists.
///
/// ```text
///   0     4      8      12                                        brk-4
///   ┌─────┬──────┬──────┬─────────┬─────────┬─── ─ ─ ───┬─────────┐
///   │ pad │ 8|1  │ 8|1  │ block   │ block   │    ...    │  0|1    │
///   └─────┴──────┴──────┴─────────┴─────────┴─── ─ ─ ───┴─────────┘
///          prologue      ▲ FIRST_BLOCK                   epilogue
/// ```
///
/// The prologue and epilogue are permanently allocated, so coalescing never
/// has to special-case the ends of the heap.
pub struct SegregatedAllocator<H: HeapGrowth = MemLib> {
  provider: H,
  pub(crate) arena: Arena,
  pub(crate) free_lists: SegregatedList,
  config: HeapConfig,
  extensions: usize,
}

impl SegregatedAllocator<MemLib> {
  /// Heap over a default 20 MiB [`MemLib`].
  pub fn new() -> Result<Self, AllocError> {
    Self::init(MemLib::new())
  }

  /// Heap over a [`MemLib`] sized by `config.max_heap`.
  pub fn from_config(config: HeapConfig) -> Result<Self, AllocError> {
    Self::with_config(MemLib::from_config(&config), config)
  }
}

impl<H: HeapGrowth> SegregatedAllocator<H> {
  /// Installs the sentinel blocks and one initial free chunk.
  pub fn init(provider: H) -> Result<Self, AllocError> {
    Self::with_config(provider, HeapConfig::default())
  }

  pub fn with_config(
    mut provider: H,
    config: HeapConfig,
  ) -> Result<Self, AllocError> {
    let start = provider.extend(FIRST_BLOCK)?;
    let addr = start.as_ptr() as usize;
    if addr % ALIGNMENT != 0 {
      return Err(GrowthError::Misaligned(addr).into());
    }

    // SAFETY: the HeapGrowth contract hands us FIRST_BLOCK exclusive bytes.
    let mut arena = unsafe { Arena::new(start, FIRST_BLOCK) };
    arena.put(0, 0);
    arena.set_tags(PROLOGUE, BlockMeta::used(DSIZE));
    arena.put(header_of(FIRST_BLOCK), BlockMeta::used(0).pack());

    let mut allocator = Self {
      provider,
      arena,
      free_lists: SegregatedList::new(),
      config,
      extensions: 0,
    };
    allocator.extend_heap(config.effective_chunk())?;

    log::debug!(
      "[seglloc] init: heap at {:p}, {} bytes, chunk {}",
      start,
      allocator.heap_size(),
      config.effective_chunk()
    );
    Ok(allocator)
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn provider(&self) -> &H {
    &self.provider
  }

  /// Bytes of heap currently under management, sentinels included.
  pub fn heap_size(&self) -> usize {
    self.arena.size()
  }

  /// Address of the first heap byte.
  pub fn heap_lo(&self) -> NonNull<u8> {
    self.arena.lo()
  }

  /// Number of successful heap extensions, the initial chunk included.
  pub fn extensions(&self) -> usize {
    self.extensions
  }

  /// Allocates at least `size` bytes, 8-byte aligned.
  ///
  /// Returns `None` for a zero-sized request or when the heap cannot grow.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    self.try_allocate(size).ok()
  }

  pub fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }
    let Some(asize) = adjusted_size(size) else {
      log::warn!("[seglloc] allocate({}): request too large", size);
      return Err(AllocError::Oversized(size));
    };

    let bp = match self.find_fit(asize) {
      Some(bp) => bp,
      None => {
        let extend = asize.max(self.config.effective_chunk());
        self.extend_heap(extend).inspect_err(|err| {
          log::warn!("[seglloc] allocate({}): {}", size, err);
        })?
      }
    };
    self.place(bp, asize);

    log::trace!("[seglloc] allocate({}) -> {:#x} (block {})", size, bp, self.arena.meta(bp).size);
    self.debug_check("allocate");
    Ok(self.arena.ptr_at(bp))
  }

  /// Allocates for `layout`, refusing alignments stricter than 8 bytes.
  pub fn allocate_layout(
    &mut self,
    layout: Layout,
  ) -> Result<NonNull<u8>, AllocError> {
    if layout.align() > ALIGNMENT {
      return Err(AllocError::UnsupportedAlignment(layout.align()));
    }
    self.try_allocate(layout.size())
  }

  /// Allocates `count * size` zeroed bytes; `None` on overflow or exhaustion.
  pub fn allocate_zeroed(
    &mut self,
    count: usize,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let total = count.checked_mul(size)?;
    let ptr = self.allocate(total)?;
    let bp = self.arena.offset_of(ptr);
    self.arena.zero(bp, total);
    Some(ptr)
  }

  /// Returns a block to the heap.
  ///
  /// # Safety
  ///
  /// `ptr` must come from this allocator and not have been released or
  /// resized since. Nothing is validated; a bad pointer corrupts the heap.
  pub unsafe fn release(
    &mut self,
    ptr: NonNull<u8>,
  ) {
    let bp = self.arena.offset_of(ptr);
    let size = self.arena.meta(bp).size;

    self.arena.set_tags(bp, BlockMeta::free(size));
    let merged = self.coalesce(bp);

    log::trace!("[seglloc] release({:#x}) size {} -> free block {:#x}", bp, size, merged);
    self.debug_check("release");
  }

  /// Payload bytes usable through `ptr`, at least what was requested.
  ///
  /// # Safety
  ///
  /// `ptr` must be a live allocation of this allocator.
  pub unsafe fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    self.arena.meta(self.arena.offset_of(ptr)).size - DSIZE
  }

  /// Best fit within the first size class holding any block of `asize`
  /// bytes or more.
  pub(crate) fn find_fit(
    &self,
    asize: usize,
  ) -> Option<usize> {
    (class_of(asize)..NUM_CLASSES).find_map(|class| {
      self
        .free_lists
        .iter(&self.arena, class)
        .map(|bp| (bp, self.arena.meta(bp).size))
        .filter(|&(_, size)| size >= asize)
        .min_by_key(|&(_, size)| size)
        .map(|(bp, _)| bp)
    })
  }

  /// Marks `asize` bytes of the free block `bp` allocated, returning any
  /// remainder large enough to be a block to the free lists.
  pub(crate) fn place(
    &mut self,
    bp: usize,
    asize: usize,
  ) {
    let csize = self.arena.meta(bp).size;
    self.free_lists.remove(&mut self.arena, bp);
    self.split(bp, csize, asize);
  }

  /// Writes `bp` as an allocated block of `asize` out of `csize` bytes it
  /// spans, freeing the tail when it can stand alone.
  pub(crate) fn split(
    &mut self,
    bp: usize,
    csize: usize,
    asize: usize,
  ) {
    if csize - asize >= MIN_BLOCK_SIZE {
      self.arena.set_tags(bp, BlockMeta::used(asize));
      let rest = bp + asize;
      self.arena.set_tags(rest, BlockMeta::free(csize - asize));
      self.free_lists.insert(&mut self.arena, rest);
    } else {
      self.arena.set_tags(bp, BlockMeta::used(csize));
    }
  }

  /// Appends a free block of at least `bytes` and coalesces it with a free
  /// block ending at the old epilogue. Returns the resulting free block.
  pub(crate) fn extend_heap(
    &mut self,
    bytes: usize,
  ) -> Result<usize, GrowthError> {
    let size = crate::align!(bytes);
    let total = self.arena.size().saturating_add(size);
    if total > MAX_BLOCK_SIZE {
      return Err(GrowthError::TooLarge(total));
    }

    // Refuse before the provider moves, so a foreign break leaves nothing
    // stranded between the heap and the next extension.
    let expected = self.arena.end_addr();
    if let Some(next) = self.provider.current_break() {
      if next.as_ptr() as usize != expected {
        log::warn!("[seglloc] extend_heap: break at {:p}, heap ends at {:#x}", next, expected);
        return Err(GrowthError::NonContiguous {
          expected,
          actual: next.as_ptr() as usize,
        });
      }
    }

    let region = self.provider.extend(size)?;
    if region.as_ptr() as usize != expected {
      return Err(GrowthError::NonContiguous {
        expected,
        actual: region.as_ptr() as usize,
      });
    }

    // The old epilogue header becomes the new block's header.
    let bp = self.arena.size();
    self.arena.grow(size);
    self.arena.set_tags(bp, BlockMeta::free(size));
    let epilogue = self.arena.next_block(bp);
    self.arena.put(header_of(epilogue), BlockMeta::used(0).pack());
    self.extensions += 1;

    log::debug!("[seglloc] extend_heap: +{} bytes at {:#x}, heap now {} bytes", size, bp, total);
    Ok(self.coalesce(bp))
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;
  use crate::block::CHUNK_SIZE;

  fn small_heap() -> SegregatedAllocator {
    SegregatedAllocator::from_config(HeapConfig::new().with_max_heap(1 << 16)).unwrap()
  }

  #[test]
  fn test_init_layout() {
    let heap = small_heap();

    assert_eq!(heap.heap_size(), FIRST_BLOCK + CHUNK_SIZE);
    assert_eq!(heap.extensions(), 1);
    assert_eq!(heap.arena.meta(PROLOGUE), BlockMeta::used(DSIZE));
    assert_eq!(heap.arena.meta(FIRST_BLOCK), BlockMeta::free(CHUNK_SIZE));
    assert_eq!(heap.free_lists.head(class_of(CHUNK_SIZE)), Some(FIRST_BLOCK));
    assert_eq!(heap.arena.meta(FIRST_BLOCK + CHUNK_SIZE), BlockMeta::used(0));
  }

  #[test]
  fn test_allocate_zero_is_none() {
    let mut heap = small_heap();
    assert!(heap.allocate(0).is_none());
    assert!(matches!(heap.try_allocate(0), Err(AllocError::ZeroSize)));
  }

  #[test]
  fn test_allocate_splits_first_chunk() {
    let mut heap = small_heap();
    let ptr = heap.allocate(100).unwrap();
    let bp = heap.arena.offset_of(ptr);

    assert_eq!(bp, FIRST_BLOCK);
    assert_eq!(heap.arena.meta(bp), BlockMeta::used(112));
    assert_eq!(heap.arena.meta(bp + 112), BlockMeta::free(CHUNK_SIZE - 112));
    assert_eq!(unsafe { heap.usable_size(ptr) }, 104);
  }

  #[test]
  fn test_place_consumes_small_remainder() {
    let mut heap = SegregatedAllocator::from_config(
      HeapConfig::new().with_chunk_size(32).with_max_heap(1 << 12),
    )
    .unwrap();

    // 32-byte chunk, 24-byte block leaves 8: too small to split
    let ptr = heap.allocate(16).unwrap();
    let bp = heap.arena.offset_of(ptr);
    assert_eq!(heap.arena.meta(bp), BlockMeta::used(32));
    assert_eq!(heap.free_lists.len(&heap.arena), 0);
  }

  #[test]
  fn test_find_fit_best_within_class() {
    let mut heap = small_heap();

    // carve free blocks of 48 and 40 (class 6 and 6) separated by live blocks
    let a = heap.allocate(40).unwrap();
    let _g1 = heap.allocate(8).unwrap();
    let b = heap.allocate(32).unwrap();
    let _g2 = heap.allocate(8).unwrap();
    unsafe {
      heap.release(a);
      heap.release(b);
    }

    let fit = heap.find_fit(40).unwrap();
    assert_eq!(fit, heap.arena.offset_of(b));
    assert_eq!(heap.find_fit(48), Some(heap.arena.offset_of(a)));
  }

  #[test]
  fn test_find_fit_escalates_classes() {
    let mut heap = small_heap();
    let a = heap.allocate(8).unwrap();
    let _guard = heap.allocate(8).unwrap();
    unsafe { heap.release(a) };

    // the 16-byte hole in class 4 cannot serve 24 bytes, the tail chunk can
    let fit = heap.find_fit(24).unwrap();
    assert_ne!(fit, heap.arena.offset_of(a));
    assert!(heap.arena.meta(fit).size >= 24);
  }

  #[test]
  fn test_allocate_layout_rejects_wide_alignment() {
    let mut heap = small_heap();
    let layout = Layout::from_size_align(64, 64).unwrap();
    assert!(matches!(heap.allocate_layout(layout), Err(AllocError::UnsupportedAlignment(64))));

    let ptr = heap.allocate_layout(Layout::new::<u64>()).unwrap();
    assert_eq!(ptr.as_ptr() as usize % 8, 0);
  }

  #[test]
  fn test_allocate_zeroed() {
    let mut heap = small_heap();
    let dirty = heap.allocate(64).unwrap();
    unsafe {
      dirty.as_ptr().write_bytes(0xFF, 64);
      heap.release(dirty);
    }

    let ptr = heap.allocate_zeroed(8, 8).unwrap();
    let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 64) };
    assert!(bytes.iter().all(|&b| b == 0));
    assert!(heap.allocate_zeroed(usize::MAX, 2).is_none());
  }

  #[test]
  fn test_oversized_request() {
    let mut heap = small_heap();
    assert!(matches!(heap.try_allocate(usize::MAX), Err(AllocError::Oversized(_))));
  }

  #[test]
  fn test_out_of_memory_leaves_heap_usable() {
    let mut heap = small_heap();
    let err = heap.try_allocate(1 << 20).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory(GrowthError::Exhausted { .. })));

    assert!(heap.allocate(64).is_some());
    assert_eq!(heap.check(), Ok(()));
  }

  /// Provider whose break can also be moved from outside the allocator.
  struct SharedMem(Rc<RefCell<MemLib>>);

  unsafe impl HeapGrowth for SharedMem {
    fn extend(
      &mut self,
      increment: usize,
    ) -> Result<NonNull<u8>, GrowthError> {
      self.0.borrow_mut().extend(increment)
    }

    fn heap_size(&self) -> usize {
      self.0.borrow().heap_size()
    }

    fn current_break(&self) -> Option<NonNull<u8>> {
      self.0.borrow().current_break()
    }
  }

  #[test]
  fn test_foreign_break_is_refused_before_extending() {
    let mem = Rc::new(RefCell::new(MemLib::with_capacity(1 << 16)));
    let mut heap = SegregatedAllocator::init(SharedMem(Rc::clone(&mem))).unwrap();
    let _big = heap.allocate(4000).unwrap();

    mem.borrow_mut().extend(64).unwrap();

    let err = heap.try_allocate(4000).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory(GrowthError::NonContiguous { .. })));
    assert_eq!(mem.borrow().heap_size(), FIRST_BLOCK + CHUNK_SIZE + 64);
    assert_eq!(heap.heap_size(), FIRST_BLOCK + CHUNK_SIZE);

    // the tail of the first chunk is still served
    assert!(heap.allocate(64).is_some());
    assert_eq!(heap.check(), Ok(()));
  }
}
