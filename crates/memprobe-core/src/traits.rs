//! Instrumentation hooks interface
//!
//! The host environment discovers memory operands, decides where to
//! place callbacks and tracks thread lifecycle. It then calls into a tool
//! through this trait, on whatever thread is executing the instrumented
//! code. Tools never call back into the host.

use crate::error::ProbeResult;
use crate::id::{HostThreadId, SlotId};

/// One executed memory operand
///
/// Only delivered for operands the host knows will execute (predicated
/// accesses whose predicate is false are never reported). An operand
/// that is both read and written may arrive as one access with both
/// flags or as two separate accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAccess {
    /// Slot of the executing context
    pub slot: SlotId,
    /// Address of the instruction performing the access
    pub ip: u64,
    /// Effective address of the operand
    pub addr: u64,
    /// Operand size in bytes
    pub size: u32,
    pub is_read: bool,
    pub is_write: bool,
}

impl MemoryAccess {
    /// A read of `size` bytes at `addr`
    #[inline]
    pub const fn read(slot: SlotId, ip: u64, addr: u64, size: u32) -> Self {
        Self { slot, ip, addr, size, is_read: true, is_write: false }
    }

    /// A write of `size` bytes at `addr`
    #[inline]
    pub const fn write(slot: SlotId, ip: u64, addr: u64, size: u32) -> Self {
        Self { slot, ip, addr, size, is_read: false, is_write: true }
    }
}

/// Callbacks a tool receives from the host
///
/// Every method may be called concurrently from different contexts.
/// `on_block` and `on_memory_access` for a given slot are only ever
/// called from the context that owns it.
pub trait InstrumentationHooks: Send + Sync {
    /// Tool name (e.g., "dirty-pages")
    fn name(&self) -> &'static str;

    /// A new execution context started; returns its slot.
    ///
    /// Exceeding the configured thread ceiling is fatal and panics.
    fn on_thread_start(&self, ctx: HostThreadId) -> SlotId;

    /// An execution context finished
    fn on_thread_exit(&self, ctx: HostThreadId);

    /// A block of `instructions` instructions is about to execute on `slot`
    fn on_block(&self, slot: SlotId, instructions: u32);

    /// A memory operand executed
    fn on_memory_access(&self, access: &MemoryAccess);

    /// The program is exiting; flush and close every output
    ///
    /// Only the first call does any work.
    fn on_program_exit(&self, exit_code: i32) -> ProbeResult<()>;
}
