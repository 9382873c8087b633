//! Per-thread footprint tables
//!
//! Each slot owns a map from byte address to [`AccessStat`]. Only the
//! owning context records into its table, so the per-slot lock is never
//! contended while the program runs; it exists to make the shutdown
//! read-out safe. Entries are never removed.

use std::collections::HashMap;

use memprobe_core::{CachePadded, ProbeError, ProbeResult, SlotId, SpinLock};

/// Access statistics for one address, as seen by one thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessStat {
    pub access_count: u32,
    pub min_size: u32,
    pub max_size: u32,
    /// Σ size over every access to this address
    pub total_bytes: u64,
    pub seen_read: bool,
    pub seen_write: bool,
}

impl AccessStat {
    fn first(size: u32, is_read: bool, is_write: bool) -> Self {
        Self {
            access_count: 1,
            min_size: size,
            max_size: size,
            total_bytes: size as u64,
            seen_read: is_read,
            seen_write: is_write,
        }
    }

    fn update(&mut self, size: u32, is_read: bool, is_write: bool) {
        self.access_count = self.access_count.saturating_add(1);
        self.min_size = self.min_size.min(size);
        self.max_size = self.max_size.max(size);
        self.total_bytes = self.total_bytes.saturating_add(size as u64);
        self.seen_read |= is_read;
        self.seen_write |= is_write;
    }

    /// Read at least once and never written
    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.seen_read && !self.seen_write
    }
}

#[derive(Default)]
struct SlotFootprint {
    addrs: HashMap<u64, AccessStat>,
    /// Σ size over every recorded access
    bytes: u64,
}

/// One slot's line of the shutdown summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadFootprint {
    pub slot: SlotId,
    pub addrs: usize,
    pub bytes: u64,
}

/// Shutdown read-out over every slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintSummary {
    pub threads: Vec<ThreadFootprint>,
    pub total_addrs: usize,
    pub total_bytes: u64,
    /// Slot the read-only count refers to
    pub read_only_slot: SlotId,
    pub read_only_addrs: usize,
}

/// Footprint tables, one per slot
pub struct FootprintTable {
    tables: Box<[CachePadded<SpinLock<SlotFootprint>>]>,
}

impl FootprintTable {
    pub fn new(num_slots: usize) -> Self {
        let tables: Vec<_> = (0..num_slots)
            .map(|_| CachePadded::new(SpinLock::new(SlotFootprint::default())))
            .collect();
        Self {
            tables: tables.into_boxed_slice(),
        }
    }

    /// Record one access by the context owning `slot`.
    /// Out-of-range slots are ignored.
    #[inline]
    pub fn record(&self, slot: SlotId, addr: u64, size: u32, is_read: bool, is_write: bool) {
        let Some(table) = self.tables.get(slot.as_usize()) else {
            return;
        };
        let mut table = table.lock();
        table.bytes = table.bytes.saturating_add(size as u64);
        table
            .addrs
            .entry(addr)
            .and_modify(|stat| stat.update(size, is_read, is_write))
            .or_insert_with(|| AccessStat::first(size, is_read, is_write));
    }

    /// Statistics for one address in one slot's table
    pub fn stat(&self, slot: SlotId, addr: u64) -> Option<AccessStat> {
        self.tables
            .get(slot.as_usize())
            .and_then(|t| t.lock().addrs.get(&addr).copied())
    }

    /// Distinct addresses in a slot's table
    pub fn distinct_addrs(&self, slot: SlotId) -> usize {
        self.tables
            .get(slot.as_usize())
            .map(|t| t.lock().addrs.len())
            .unwrap_or(0)
    }

    /// Σ size over every access recorded for a slot
    pub fn total_bytes(&self, slot: SlotId) -> u64 {
        self.tables
            .get(slot.as_usize())
            .map(|t| t.lock().bytes)
            .unwrap_or(0)
    }

    /// Addresses a slot read but never wrote
    pub fn read_only_addrs(&self, slot: SlotId) -> usize {
        self.tables
            .get(slot.as_usize())
            .map(|t| t.lock().addrs.values().filter(|s| s.is_read_only()).count())
            .unwrap_or(0)
    }

    /// Summary line for one slot
    pub fn thread(&self, slot: SlotId) -> ProbeResult<ThreadFootprint> {
        let table = self
            .tables
            .get(slot.as_usize())
            .ok_or(ProbeError::InvalidSlot(slot))?
            .lock();
        Ok(ThreadFootprint {
            slot,
            addrs: table.addrs.len(),
            bytes: table.bytes,
        })
    }

    /// Per-slot and aggregate totals
    pub fn summary(&self, read_only_slot: SlotId) -> FootprintSummary {
        let threads: Vec<ThreadFootprint> = (0..self.tables.len())
            .filter_map(|i| self.thread(SlotId::new(i as u32)).ok())
            .collect();

        FootprintSummary {
            total_addrs: threads.iter().map(|t| t.addrs).sum(),
            total_bytes: threads.iter().map(|t| t.bytes).sum(),
            read_only_addrs: self.read_only_addrs(read_only_slot),
            read_only_slot,
            threads,
        }
    }

    /// Number of slots
    #[inline]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
