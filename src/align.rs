/// Rounds `value` up to the next multiple of `align`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use seglloc::align_to;
///
/// assert_eq!(align_to!(13, 8), 16);
/// assert_eq!(align_to!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Rounds `value` up to the heap alignment (8 bytes on every target).
///
/// # Examples
///
/// ```rust
/// use seglloc::align;
///
/// assert_eq!(align!(1), 8);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(108), 112);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::block::ALIGNMENT)
  };
}

/// Checked variant of [`align!`], `None` when rounding would overflow.
pub fn checked_align(value: usize) -> Option<usize> {
  value
    .checked_add(crate::block::ALIGNMENT - 1)
    .map(|v| v & !(crate::block::ALIGNMENT - 1))
}
