//! # seglloc - A Segregated-Fit Memory Allocator Library
//!
//! This crate provides a **boundary-tag allocator with segregated free lists**
//! over one contiguous heap that only ever grows at its high end, the way a
//! heap grown with `sbrk` does.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              HEAP                                    │
//!   │                                                                      │
//!   │  ┌────┬────────┬──────┬──────────┬──────┬─────────────────┬───────┐  │
//!   │  │pad │prologue│ A1   │   F1     │ A2   │       F2        │epilog.│  │
//!   │  └────┴────────┴──────┴──────────┴──────┴─────────────────┴───────┘  │
//!   │                          │                       │            ▲      │
//!   │                          ▼                       ▼            │      │
//!   │                   class 7 bucket          class 12 bucket   break    │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Free blocks are threaded into one of 32 buckets by size class.
//!   Adjacent free blocks are always merged.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   seglloc
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── block      - Boundary tags and block navigation
//!   ├── seglist    - Segregated free lists
//!   ├── allocator  - SegregatedAllocator: init, allocate, release
//!   ├── coalesce   - Merging of adjacent free blocks
//!   ├── realloc    - resize
//!   ├── check      - Heap walker, statistics, consistency checker
//!   ├── growth     - HeapGrowth provider trait
//!   ├── memlib     - MemLib, a bounded simulated heap
//!   └── sbrk       - SbrkHeap, the real program break
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use seglloc::SegregatedAllocator;
//!
//! let mut heap = SegregatedAllocator::new().unwrap();
//!
//! let ptr = heap.allocate(64).unwrap();
//! unsafe {
//!   ptr.as_ptr().write_bytes(0x2A, 64);
//!
//!   let ptr = heap.resize(Some(ptr), 256).unwrap();
//!   assert_eq!(*ptr.as_ptr().add(63), 0x2A);
//!
//!   heap.release(ptr);
//! }
//! assert!(heap.check().is_ok());
//! ```
//!
//! ## How It Works
//!
//! Every block carries its size and allocation bit twice, in a header word
//! before the payload and a footer word after it:
//!
//! ```text
//!   Single Allocation:
//!   ┌────────┬────────────────────────────────┬────────┐
//!   │ header │          User Data             │ footer │
//!   │ 112|1  │  ┌──────────────────────────┐  │ 112|1  │
//!   │        │  │   104 bytes usable       │  │        │
//!   │ 4 bytes│  └──────────────────────────┘  │ 4 bytes│
//!   └────────┴────────────────────────────────┴────────┘
//!            ▲
//!            └── Pointer returned to user (8-byte aligned)
//! ```
//!
//! The footer lets a freed block find its left neighbour, so all four
//! neighbour cases merge in constant time. A request is served by the
//! smallest fitting block of the first size class that has one; when no
//! class does, the heap grows by at least [`CHUNK_SIZE`] bytes.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives
//! - **Never shrinks**: released memory is reused, never returned to the OS
//! - **No validation on release**: double frees corrupt the heap; use
//!   [`SegregatedAllocator::check`] (or the `debug-check` feature) to
//!   catch corruption while debugging
//! - **At most 4 GiB** of heap, free-list links are 32-bit offsets
//!
//! ## Safety
//!
//! Allocation is safe; `release`, `resize` and `usable_size` are `unsafe`
//! because they trust the pointer they are given.

pub mod align;
mod allocator;
mod arena;
pub mod block;
mod check;
mod coalesce;
mod config;
mod error;
mod growth;
mod memlib;
mod realloc;
mod sbrk;
pub mod seglist;

pub use allocator::SegregatedAllocator;
pub use block::{ALIGNMENT, BlockMeta, CHUNK_SIZE, MIN_BLOCK_SIZE};
pub use check::{BlockInfo, Blocks, HeapStats};
pub use config::{HeapConfig, MAX_HEAP};
pub use error::{AllocError, GrowthError, HeapCheckError};
pub use growth::HeapGrowth;
pub use memlib::MemLib;
pub use sbrk::{SbrkHeap, print_alloc, program_break};
