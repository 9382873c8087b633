//! Epoch gate
//!
//! Decides when the global instruction count has moved a full window past
//! the last boundary, and makes sure exactly one context acts on each
//! crossing.
//!
//! The decision is taken in two steps. Every block first compares a racy,
//! unlocked sum of the per-slot counters against the baseline. Only when
//! that fast-path filter fires does the context take the epoch lock and
//! re-check with a fresh sum; the locked re-check is the authority. Two
//! contexts can pass the unlocked check together: the one that loses the
//! lock finds the baseline already advanced and does nothing.
//!
//! Boundaries can therefore land a little early or late relative to the
//! exact global count. That slack is accepted; no context ever waits on
//! the epoch lock unless a boundary is imminent.

use core::sync::atomic::{AtomicU64, Ordering};

use memprobe_core::{ktrace, PerThreadCounter, SlotId, SpinLock};

/// Snapshot taken at an epoch boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochBoundary {
    /// 1-based index of the boundary
    pub epoch: u64,
    /// Global instruction count including the triggering block
    pub total_instructions: u64,
    /// Instructions since the previous baseline, triggering block included
    pub window_instructions: u64,
    /// Slot whose block triggered the boundary
    pub slot: SlotId,
}

/// Sampling gate shared by all contexts
pub struct EpochGate {
    threshold: u64,
    /// Global count at the last boundary, taken before its triggering
    /// block; only written under `lock`
    baseline: AtomicU64,
    /// Epoch lock; guards the boundary counter
    lock: SpinLock<u64>,
}

impl EpochGate {
    /// Gate firing every `threshold` instructions (at least 1)
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold: threshold.max(1),
            baseline: AtomicU64::new(0),
            lock: SpinLock::new(0),
        }
    }

    /// Record a block of `delta` instructions for `slot`.
    ///
    /// The threshold check sees the counters as they were before this
    /// block; the block is added to the slot's counter afterwards, whether
    /// or not a boundary fired. When a boundary fires, `on_boundary` runs
    /// while the epoch lock is held, before the baseline moves to the
    /// pre-block sum. The triggering block therefore counts toward both
    /// the window it closes and the next one.
    #[inline]
    pub fn advance<F>(
        &self,
        counters: &PerThreadCounter,
        slot: SlotId,
        delta: u64,
        on_boundary: F,
    ) -> Option<EpochBoundary>
    where
        F: FnOnce(&EpochBoundary),
    {
        let sum = counters.global_sum();
        let boundary = if self.window_full(sum, self.baseline.load(Ordering::Acquire), delta) {
            self.cross_locked(counters, slot, delta, on_boundary)
        } else {
            None
        };
        counters.advance(slot, delta);
        boundary
    }

    /// Authoritative re-check under the epoch lock
    pub(crate) fn cross_locked<F>(
        &self,
        counters: &PerThreadCounter,
        slot: SlotId,
        delta: u64,
        on_boundary: F,
    ) -> Option<EpochBoundary>
    where
        F: FnOnce(&EpochBoundary),
    {
        let mut epochs = self.lock.lock();
        let fresh = counters.global_sum();
        let last = self.baseline.load(Ordering::Relaxed);
        if !self.window_full(fresh, last, delta) {
            return None;
        }

        *epochs += 1;
        let total = fresh.saturating_add(delta);
        let boundary = EpochBoundary {
            epoch: *epochs,
            total_instructions: total,
            window_instructions: total.saturating_sub(last),
            slot,
        };
        on_boundary(&boundary);

        // Baseline excludes the triggering block
        self.baseline.store(fresh.max(last), Ordering::Release);
        ktrace!(
            "epoch {} at {} instructions (window {}, slot {})",
            boundary.epoch,
            boundary.total_instructions,
            boundary.window_instructions,
            slot
        );
        Some(boundary)
    }

    #[inline]
    fn window_full(&self, sum: u64, baseline: u64, delta: u64) -> bool {
        sum.saturating_sub(baseline).saturating_add(delta) >= self.threshold
    }

    /// Instructions per window
    #[inline]
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Global count at the last boundary
    #[inline]
    pub fn baseline(&self) -> u64 {
        self.baseline.load(Ordering::Acquire)
    }

    /// Boundaries fired so far
    pub fn epochs(&self) -> u64 {
        *self.lock.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fires_when_window_full() {
        let counters = PerThreadCounter::new(2);
        let gate = EpochGate::new(1000);
        let slot = SlotId::new(0);

        assert!(gate.advance(&counters, slot, 600, |_| {}).is_none());
        assert_eq!(counters.get(slot), 600);

        let b = gate.advance(&counters, slot, 400, |_| {}).unwrap();
        assert_eq!(b.epoch, 1);
        assert_eq!(b.total_instructions, 1000);
        assert_eq!(b.window_instructions, 1000);
        assert_eq!(gate.baseline(), 600);
        assert_eq!(counters.get(slot), 1000);

        // The triggering 400 carry over into the next window
        assert!(gate.advance(&counters, slot, 599, |_| {}).is_none());
        let b = gate.advance(&counters, slot, 1, |_| {}).unwrap();
        assert_eq!(b.epoch, 2);
        assert_eq!(b.total_instructions, 1600);
        assert_eq!(b.window_instructions, 1000);
        assert_eq!(gate.baseline(), 1599);
        assert_eq!(gate.epochs(), 2);
    }

    #[test]
    fn test_baseline_is_sum_before_block() {
        let counters = PerThreadCounter::new(1);
        let gate = EpochGate::new(1000);
        let slot = SlotId::new(0);

        let fired: Vec<usize> = (0..4)
            .filter(|_| gate.advance(&counters, slot, 600, |_| {}).is_some())
            .collect();

        assert_eq!(fired, vec![1, 2, 3]);
        assert_eq!(gate.baseline(), 1800);
        assert_eq!(counters.get(slot), 2400);
    }

    #[test]
    fn test_sum_spans_all_slots() {
        let counters = PerThreadCounter::new(3);
        let gate = EpochGate::new(100);

        assert!(gate.advance(&counters, SlotId::new(0), 40, |_| {}).is_none());
        assert!(gate.advance(&counters, SlotId::new(1), 40, |_| {}).is_none());
        let b = gate.advance(&counters, SlotId::new(2), 20, |_| {}).unwrap();
        assert_eq!(b.slot, SlotId::new(2));
        assert_eq!(b.total_instructions, 100);
    }

    #[test]
    fn test_callback_runs_once_per_boundary() {
        let counters = PerThreadCounter::new(1);
        let gate = EpochGate::new(10);
        let mut seen = vec![];

        for _ in 0..10 {
            gate.advance(&counters, SlotId::new(0), 5, |b| seen.push(b.epoch));
        }

        // After the first boundary every block completes a window
        assert_eq!(seen, (1..=9).collect::<Vec<u64>>());
    }

    #[test]
    fn test_losing_racer_is_noop() {
        // Two contexts both passed the unlocked check for the same window;
        // only the first to take the lock may fire.
        let counters = PerThreadCounter::new(2);
        let gate = EpochGate::new(100);
        counters.advance(SlotId::new(0), 150);

        let first = gate.cross_locked(&counters, SlotId::new(0), 0, |_| {});
        let second = gate.cross_locked(&counters, SlotId::new(1), 0, |_| {});

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(gate.baseline(), 150);
        assert_eq!(gate.epochs(), 1);
    }

    #[test]
    fn test_concurrent_boundaries_are_approximate() {
        const THREADS: u32 = 8;
        const BLOCKS: u64 = 10_000;
        const THRESHOLD: u64 = 1000;

        let counters = Arc::new(PerThreadCounter::new(THREADS as usize));
        let gate = Arc::new(EpochGate::new(THRESHOLD));
        let boundaries = Arc::new(SpinLock::new(Vec::new()));
        let mut handles = vec![];

        for t in 0..THREADS {
            let counters = Arc::clone(&counters);
            let gate = Arc::clone(&gate);
            let boundaries = Arc::clone(&boundaries);
            handles.push(thread::spawn(move || {
                for _ in 0..BLOCKS {
                    gate.advance(&counters, SlotId::new(t), 1, |b| {
                        boundaries.lock().push(*b);
                    });
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let total = THREADS as u64 * BLOCKS;
        assert_eq!(counters.global_sum(), total);

        // Stale sums shift boundaries around but never let two contexts
        // fire for the same window.
        let boundaries = boundaries.lock();
        assert!(boundaries.iter().all(|b| b.window_instructions >= THRESHOLD));
        assert!(boundaries
            .windows(2)
            .all(|w| w[1].total_instructions > w[0].total_instructions));
        // Windows overlap by one triggering block each
        assert!(boundaries.len() as u64 <= total / (THRESHOLD - 1));
        assert!(boundaries.len() as u64 >= total / THRESHOLD / 2);
        assert_eq!(gate.epochs(), boundaries.len() as u64);
    }
}
