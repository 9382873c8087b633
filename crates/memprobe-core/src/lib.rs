//! # memprobe-core
//!
//! Core types and traits for the memprobe aggregation engine.
//!
//! This crate is host-agnostic and knows nothing about how memory
//! operands are discovered. All aggregation structures and tool variants
//! live in `memprobe-engine`.
//!
//! ## Modules
//!
//! - `id` - Slot identifier type
//! - `padded` - Cache-line padding for per-slot state
//! - `registry` - Bounded thread registry (context -> slot)
//! - `counter` - Per-slot instruction counters
//! - `error` - Error types
//! - `spinlock` - Internal spinlock primitive
//! - `traits` - Instrumentation hooks interface
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod padded;
pub mod registry;
pub mod counter;
pub mod error;
pub mod spinlock;
pub mod traits;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::{HostThreadId, SlotId};
pub use padded::CachePadded;
pub use registry::ThreadRegistry;
pub use counter::PerThreadCounter;
pub use error::{ProbeError, ProbeResult};
pub use spinlock::SpinLock;
pub use traits::{InstrumentationHooks, MemoryAccess};
pub use env::{env_get, env_get_bool, env_get_count, env_get_opt, env_get_str, env_is_set, parse_count};

/// Constants shared by every tool
pub mod constants {
    /// Hard upper bound for any configured thread ceiling.
    ///
    /// Per-slot storage is sized up front, so the ceiling is bounded to
    /// keep the eager allocations reasonable.
    pub const MAX_THREADS_LIMIT: usize = 1024;

    /// Default page size used to bucket dirty addresses (bytes)
    pub const DEFAULT_PAGE_SIZE: u64 = 2048;

    /// Sentinel line terminating every trace stream
    pub const TRACE_EOF: &str = "#eof";
}
