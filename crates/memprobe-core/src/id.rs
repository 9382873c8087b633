//! Slot and host-context identifier types

use core::fmt;

/// Index of an execution context's per-thread storage.
///
/// This is a 32-bit value in `[0, max_threads)` that indexes every
/// per-thread table in the engine. The maximum value (u32::MAX) is
/// reserved as a sentinel for "no slot".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SlotId(u32);

impl SlotId {
    /// Sentinel value indicating no slot
    pub const NONE: SlotId = SlotId(u32::MAX);

    /// Create a new SlotId from a raw value
    #[inline]
    pub const fn new(id: u32) -> Self {
        SlotId(id)
    }

    /// Get the raw u32 value
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get as usize for indexing
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Check if this is a real slot
    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }
}

impl From<u32> for SlotId {
    #[inline]
    fn from(id: u32) -> Self {
        SlotId(id)
    }
}

impl From<SlotId> for u32 {
    #[inline]
    fn from(id: SlotId) -> Self {
        id.0
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "SlotId(NONE)")
        } else {
            write!(f, "SlotId({})", self.0)
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for SlotId {
    fn default() -> Self {
        SlotId::NONE
    }
}

/// Opaque identifier the host assigns to one of its threads.
///
/// The engine never interprets it; it is only the key under which the
/// registry remembers which slot a context owns.
pub type HostThreadId = u64;
