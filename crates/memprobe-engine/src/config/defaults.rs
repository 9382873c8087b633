//! Library defaults, overridden by `MPR_*` environment variables

/// Instructions per aggregation window
pub const SAMPLING_THRESHOLD: u64 = 1_000_000_000;

/// Bytes per page when bucketing dirty addresses
pub const PAGE_SIZE: u64 = memprobe_core::constants::DEFAULT_PAGE_SIZE;

/// Thread ceiling for the dirty-pages tool
pub const DIRTY_PAGES_MAX_THREADS: usize = 32;

/// Thread ceiling for the footprint tool
pub const FOOTPRINT_MAX_THREADS: usize = 8;

/// Thread ceiling for the trace tool
pub const TRACE_MAX_THREADS: usize = 8;

pub const DIRTY_PAGES_OUTPUT: &str = "dirty_pages.out";
pub const FOOTPRINT_OUTPUT: &str = "memfootprint.out";

/// Prefix of the per-thread trace streams (`<prefix>_<slot>.out`)
pub const TRACE_OUTPUT_PREFIX: &str = "pinatrace";

pub const REUSE_SLOTS: bool = false;
pub const TRACE_SIZES: bool = false;

/// Slot whose read-only addresses the footprint summary counts
pub const READ_ONLY_SLOT: usize = 0;
