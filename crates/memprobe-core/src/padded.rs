//! Cache-line padding
//!
//! Per-slot counters and tables are written by one context and read by
//! others. Padding each slot to its own cache line keeps neighbouring
//! writers from invalidating each other.

use core::ops::{Deref, DerefMut};

cfg_if::cfg_if! {
    if #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))] {
        // Adjacent-line prefetch pulls cache lines in pairs on these targets.
        /// Value padded and aligned to a cache line
        #[derive(Debug, Default)]
        #[repr(align(128))]
        pub struct CachePadded<T> {
            value: T,
        }
    } else {
        /// Value padded and aligned to a cache line
        #[derive(Debug, Default)]
        #[repr(align(64))]
        pub struct CachePadded<T> {
            value: T,
        }
    }
}

impl<T> CachePadded<T> {
    /// Wrap a value
    #[inline]
    pub const fn new(value: T) -> Self {
        CachePadded { value }
    }

    /// Unwrap the value
    #[inline]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CachePadded<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        assert!(core::mem::align_of::<CachePadded<u64>>() >= 64);
        let slots: Vec<CachePadded<u64>> = (0..2).map(CachePadded::new).collect();
        let a = &*slots[0] as *const u64 as usize;
        let b = &*slots[1] as *const u64 as usize;
        assert!(b - a >= 64);
        assert_eq!(*slots[1], 1);
    }
}
