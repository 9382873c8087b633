//! Dirty page set
//!
//! One set of page numbers (`address / page_size`) shared by every
//! context and emptied at each epoch boundary.
//!
//! `touch` first asks a lock-free presence filter whether the page was
//! already recorded this epoch, and only takes the page lock when it
//! wasn't. The filter is a direct-mapped table of atomics holding
//! `page + 1` (0 = empty) that is only written under the page lock, and
//! zeroed under that same lock by `clear`. A filter miss is always safe,
//! it just costs a lock; a duplicate insert under a race is absorbed by
//! the set. The one approximation is a `touch` that races with `clear`:
//! it may see the previous epoch's entry and skip the insert.

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::collections::HashSet;

use memprobe_core::SpinLock;

/// log2 of the presence filter size
const FILTER_BITS: u32 = 12;
const FILTER_SIZE: usize = 1 << FILTER_BITS;

/// Set of pages touched since the last epoch boundary
pub struct DirtyPageSet {
    page_size: u64,
    pages: SpinLock<HashSet<u64>>,
    filter: Box<[AtomicU64]>,
    /// Mirror of `pages.len()`, written under the page lock
    len: AtomicUsize,
}

impl DirtyPageSet {
    /// Empty set bucketing addresses into `page_size`-byte pages
    pub fn new(page_size: u64) -> Self {
        let filter: Vec<AtomicU64> = (0..FILTER_SIZE).map(|_| AtomicU64::new(0)).collect();
        Self {
            page_size: page_size.max(1),
            pages: SpinLock::new(HashSet::new()),
            filter: filter.into_boxed_slice(),
            len: AtomicUsize::new(0),
        }
    }

    /// Page number of an address
    #[inline]
    pub fn page_of(&self, addr: u64) -> u64 {
        addr / self.page_size
    }

    /// Record that `addr` was touched; returns true if its page is new
    /// this epoch
    #[inline]
    pub fn touch(&self, addr: u64) -> bool {
        let page = self.page_of(addr);
        let tag = page.wrapping_add(1);
        let slot = &self.filter[Self::filter_index(page)];

        if tag != 0 && slot.load(Ordering::Acquire) == tag {
            return false;
        }

        let mut pages = self.pages.lock();
        let inserted = pages.insert(page);
        if inserted {
            self.len.store(pages.len(), Ordering::Relaxed);
        }
        if tag != 0 {
            slot.store(tag, Ordering::Release);
        }
        inserted
    }

    /// Whether a page is in the set
    pub fn contains_page(&self, page: u64) -> bool {
        self.pages.lock().contains(&page)
    }

    /// Number of distinct pages recorded this epoch (racy read)
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the set
    pub fn clear(&self) {
        let mut pages = self.pages.lock();
        self.clear_locked(&mut pages);
    }

    /// Empty the set and return how many pages it held, under one lock
    /// acquisition so no touch falls between the count and the clear
    pub fn take_count(&self) -> usize {
        let mut pages = self.pages.lock();
        let count = pages.len();
        self.clear_locked(&mut pages);
        count
    }

    /// Sorted copy of the recorded page numbers
    pub fn pages(&self) -> Vec<u64> {
        let mut pages: Vec<u64> = self.pages.lock().iter().copied().collect();
        pages.sort_unstable();
        pages
    }

    #[inline]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    fn clear_locked(&self, pages: &mut HashSet<u64>) {
        for slot in self.filter.iter() {
            slot.store(0, Ordering::Relaxed);
        }
        pages.clear();
        self.len.store(0, Ordering::Relaxed);
    }

    #[inline]
    fn filter_index(page: u64) -> usize {
        // Fibonacci hashing spreads consecutive pages across the table
        (page.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> (64 - FILTER_BITS)) as usize
    }
}
