//! Per-slot instruction counters
//!
//! Each slot's counter has exactly one writer: the context that owns the
//! slot. Increments are therefore a relaxed load followed by a relaxed
//! store, with no read-modify-write and no coordination with other
//! contexts.
//!
//! Any context may sum all counters. That sum is racy: other slots can
//! move while it is being taken, so it is a close approximation of the
//! global instruction count, never a synchronized snapshot.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::id::SlotId;
use crate::padded::CachePadded;

/// Array of monotonically increasing instruction counters, one per slot
pub struct PerThreadCounter {
    slots: Box<[CachePadded<AtomicU64>]>,
}

impl PerThreadCounter {
    /// Create counters for `num_slots` slots, all zero
    pub fn new(num_slots: usize) -> Self {
        let slots: Vec<CachePadded<AtomicU64>> = (0..num_slots)
            .map(|_| CachePadded::new(AtomicU64::new(0)))
            .collect();
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    /// Add `delta` instructions to a slot's counter
    ///
    /// Must only be called from the context owning `slot`. Out-of-range
    /// slots are ignored.
    #[inline]
    pub fn advance(&self, slot: SlotId, delta: u64) {
        if let Some(counter) = self.slots.get(slot.as_usize()) {
            let current = counter.load(Ordering::Relaxed);
            counter.store(current.wrapping_add(delta), Ordering::Relaxed);
        }
    }

    /// Current value of one slot's counter
    #[inline]
    pub fn get(&self, slot: SlotId) -> u64 {
        self.slots
            .get(slot.as_usize())
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Racy sum of every slot's counter
    #[inline]
    pub fn global_sum(&self) -> u64 {
        self.slots
            .iter()
            .fold(0u64, |acc, c| acc.wrapping_add(c.load(Ordering::Relaxed)))
    }

    /// Number of slots
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when there are no slots at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
