//! Allocator benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use seglloc::{HeapConfig, SegregatedAllocator};

fn heap() -> SegregatedAllocator {
  SegregatedAllocator::from_config(HeapConfig::new().with_max_heap(64 << 20)).unwrap()
}

fn bench_alloc_release_cycle(c: &mut Criterion) {
  let sizes: &[usize] = &[16, 64, 256, 1024, 4096, 32768];
  let mut group = c.benchmark_group("alloc_release_cycle");

  for &size in sizes {
    group.bench_with_input(BenchmarkId::new("segregated", size), &size, |b, &sz| {
      let mut heap = heap();
      b.iter(|| {
        let ptr = heap.allocate(sz).unwrap();
        criterion::black_box(ptr);
        unsafe { heap.release(ptr) };
      });
    });
  }
  group.finish();
}

fn bench_alloc_burst(c: &mut Criterion) {
  let mut group = c.benchmark_group("alloc_burst");

  group.bench_function("1000x64B", |b| {
    let mut heap = heap();
    let mut ptrs = Vec::with_capacity(1000);
    b.iter(|| {
      ptrs.extend((0..1000).map(|_| heap.allocate(64).unwrap()));
      for ptr in ptrs.drain(..) {
        unsafe { heap.release(ptr) };
      }
    });
  });

  group.bench_function("resize_grow_64B_to_64KiB", |b| {
    let mut heap = heap();
    b.iter(|| {
      let mut ptr = heap.allocate(64).unwrap();
      let mut size = 64;
      while size < 64 * 1024 {
        size *= 2;
        ptr = unsafe { heap.resize(Some(ptr), size) }.unwrap();
      }
      unsafe { heap.release(ptr) };
    });
  });

  group.finish();
}

criterion_group!(benches, bench_alloc_release_cycle, bench_alloc_burst);
criterion_main!(benches);
