//! Bounded thread registry
//!
//! Maps each live host execution context to a slot in `[0, max_threads)`.
//! Every per-thread table in the engine is sized to `max_threads` up
//! front, so exceeding the ceiling is a configuration violation rather
//! than something to recover from.
//!
//! Slots are handed out fresh in increasing order. With slot reuse
//! enabled, a released slot goes on a LIFO free stack and is preferred by
//! the next registration; otherwise every context ever seen consumes one
//! slot for the rest of the run.

use std::collections::HashMap;

use crate::error::{ProbeError, ProbeResult};
use crate::id::{HostThreadId, SlotId};
use crate::spinlock::SpinLock;

struct RegistryState {
    /// Live contexts and the slot each one owns
    contexts: HashMap<HostThreadId, SlotId>,
    /// LIFO stack of released slot IDs (only used with reuse)
    free_stack: Vec<u32>,
    /// Next never-used slot ID
    next_fresh: u32,
    /// Contexts registered over the whole run
    ever_registered: u32,
}

/// Registry of live execution contexts
pub struct ThreadRegistry {
    state: SpinLock<RegistryState>,
    max_threads: u32,
    reuse_slots: bool,
}

impl ThreadRegistry {
    /// Create a registry with room for `max_threads` concurrent contexts
    pub fn new(max_threads: usize, reuse_slots: bool) -> Self {
        Self {
            state: SpinLock::new(RegistryState {
                contexts: HashMap::with_capacity(max_threads),
                free_stack: Vec::with_capacity(max_threads),
                next_fresh: 0,
                ever_registered: 0,
            }),
            max_threads: max_threads as u32,
            reuse_slots,
        }
    }

    /// Register a context, returning its slot
    ///
    /// Registering a context that is already live returns its current
    /// slot. Fails with `ThreadCeilingExceeded` once the ceiling is hit.
    pub fn register(&self, ctx: HostThreadId) -> ProbeResult<SlotId> {
        let mut state = self.state.lock();

        if let Some(&slot) = state.contexts.get(&ctx) {
            return Ok(slot);
        }

        let slot = match state.free_stack.pop() {
            Some(id) => id,
            None if state.next_fresh < self.max_threads => {
                state.next_fresh += 1;
                state.next_fresh - 1
            }
            None => {
                return Err(ProbeError::ThreadCeilingExceeded {
                    max: self.max_threads as usize,
                })
            }
        };

        let slot = SlotId::new(slot);
        state.contexts.insert(ctx, slot);
        state.ever_registered += 1;
        Ok(slot)
    }

    /// Release a context's slot
    ///
    /// The slot becomes reusable only if the registry was built with
    /// reuse enabled.
    pub fn release(&self, ctx: HostThreadId) -> ProbeResult<SlotId> {
        let mut state = self.state.lock();
        let slot = state
            .contexts
            .remove(&ctx)
            .ok_or(ProbeError::UnknownContext(ctx))?;
        if self.reuse_slots {
            state.free_stack.push(slot.as_u32());
        }
        Ok(slot)
    }

    /// Slot currently owned by a live context
    pub fn slot_of(&self, ctx: HostThreadId) -> Option<SlotId> {
        self.state.lock().contexts.get(&ctx).copied()
    }

    /// Number of currently live contexts
    pub fn live_count(&self) -> usize {
        self.state.lock().contexts.len()
    }

    /// Number of contexts registered over the whole run
    pub fn ever_registered(&self) -> usize {
        self.state.lock().ever_registered as usize
    }

    /// Configured ceiling
    #[inline]
    pub fn max_threads(&self) -> usize {
        self.max_threads as usize
    }

    /// Whether released slots are handed out again
    #[inline]
    pub fn reuses_slots(&self) -> bool {
        self.reuse_slots
    }

    /// Check if a slot ID is inside the per-thread storage
    #[inline]
    pub fn is_valid(&self, slot: SlotId) -> bool {
        slot.is_some() && slot.as_u32() < self.max_threads
    }
}
