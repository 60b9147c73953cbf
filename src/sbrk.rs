use std::{io, ptr::NonNull};

use libc::{c_void, intptr_t, sbrk};

use crate::{align_to, block::ALIGNMENT, error::GrowthError, growth::HeapGrowth};

/// Current program break, as reported by `sbrk(0)`.
pub fn program_break() -> *mut u8 {
  unsafe { sbrk(0) as *mut u8 }
}

/// Prints a payload address next to the current program break.
pub fn print_alloc(
  size: usize,
  addr: *mut u8,
) {
  println!(
    "Allocated {} bytes, address = {:?}, program break = {:?}",
    size,
    addr,
    program_break()
  );
}

/// Heap provider backed by the process data segment.
///
/// The first extension pads the break up to the heap alignment. If anything
/// else in the process moves the break between two extensions, the next
/// extension fails with [`GrowthError::NonContiguous`] rather than handing
/// out memory that is not adjacent to the heap.
pub struct SbrkHeap {
  lo: Option<NonNull<u8>>,
  size: usize,
}

impl SbrkHeap {
  pub fn new() -> Self {
    Self { lo: None, size: 0 }
  }

  fn move_break(increment: usize) -> Result<usize, GrowthError> {
    let increment = intptr_t::try_from(increment).map_err(|_| GrowthError::TooLarge(increment))?;
    let old = unsafe { sbrk(increment) };

    if old == usize::MAX as *mut c_void {
      return Err(GrowthError::Os(io::Error::last_os_error()));
    }
    Ok(old as usize)
  }

  /// Hands back `increment` bytes taken at `old`, unless the break has moved
  /// again since.
  fn restore_break(
    old: usize,
    increment: usize,
  ) {
    if program_break() as usize != old + increment {
      return;
    }
    if let Ok(decrement) = intptr_t::try_from(increment) {
      unsafe { sbrk(-decrement) };
    }
  }
}

impl Default for SbrkHeap {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl HeapGrowth for SbrkHeap {
  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, GrowthError> {
    let current = program_break() as usize;

    let start = match self.lo {
      None => {
        let pad = align_to!(current, ALIGNMENT) - current;
        let old = Self::move_break(pad + increment)?;
        if old != current {
          Self::restore_break(old, pad + increment);
          return Err(GrowthError::NonContiguous {
            expected: current,
            actual: old,
          });
        }
        old + pad
      }
      Some(lo) => {
        let expected = lo.as_ptr() as usize + self.size;
        if current != expected {
          log::warn!("[seglloc] sbrk: break moved from {:#x} to {:#x} behind our back", expected, current);
          return Err(GrowthError::NonContiguous {
            expected,
            actual: current,
          });
        }
        let old = Self::move_break(increment)?;
        if old != expected {
          Self::restore_break(old, increment);
          return Err(GrowthError::NonContiguous { expected, actual: old });
        }
        old
      }
    };

    let start = NonNull::new(start as *mut u8).ok_or(GrowthError::NonContiguous {
      expected: current,
      actual: 0,
    })?;
    if self.lo.is_none() {
      self.lo = Some(start);
    }
    self.size += increment;
    log::debug!("[seglloc] sbrk: extended by {} bytes at {:p}", increment, start);
    Ok(start)
  }

  fn heap_size(&self) -> usize {
    self.size
  }

  fn current_break(&self) -> Option<NonNull<u8>> {
    let current = program_break() as usize;
    let next = match self.lo {
      None => align_to!(current, ALIGNMENT),
      Some(_) => current,
    };
    NonNull::new(next as *mut u8)
  }
}
