//! Probe configuration
//!
//! Provides per-tool defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env`)
//! 3. Per-tool library defaults (`defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use memprobe_engine::config::{ProbeConfig, ToolKind};
//!
//! // Tool picked by MPR_TOOL, every field overridable from the environment
//! let config = ProbeConfig::from_env();
//!
//! // Or fully programmatic
//! let config = ProbeConfig::new(ToolKind::DirtyPages)
//!     .sampling_threshold(1_000)
//!     .max_threads(4);
//! ```

pub mod defaults;

use core::fmt;
use core::str::FromStr;
use std::path::PathBuf;

use memprobe_core::constants::MAX_THREADS_LIMIT;
use memprobe_core::env::{env_get, env_get_bool, env_get_count, env_get_opt, env_get_str};
use memprobe_core::error::{ProbeError, ProbeResult};

/// Which aggregation a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Distinct written pages per instruction window
    DirtyPages,
    /// Per-address access statistics per thread
    Footprint,
    /// Raw per-thread access trace
    Trace,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::DirtyPages, ToolKind::Footprint, ToolKind::Trace];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::DirtyPages => "dirty-pages",
            ToolKind::Footprint => "footprint",
            ToolKind::Trace => "trace",
        }
    }

    /// Default output path (a prefix for the trace tool)
    pub fn default_output(&self) -> &'static str {
        match self {
            ToolKind::DirtyPages => defaults::DIRTY_PAGES_OUTPUT,
            ToolKind::Footprint => defaults::FOOTPRINT_OUTPUT,
            ToolKind::Trace => defaults::TRACE_OUTPUT_PREFIX,
        }
    }

    pub fn default_max_threads(&self) -> usize {
        match self {
            ToolKind::DirtyPages => defaults::DIRTY_PAGES_MAX_THREADS,
            ToolKind::Footprint => defaults::FOOTPRINT_MAX_THREADS,
            ToolKind::Trace => defaults::TRACE_MAX_THREADS,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "dirty-pages" | "dirty" | "pages" => Ok(ToolKind::DirtyPages),
            "footprint" | "memfootprint" => Ok(ToolKind::Footprint),
            "trace" | "pinatrace" => Ok(ToolKind::Trace),
            _ => Err(ProbeError::InvalidConfig("unknown tool kind")),
        }
    }
}

/// Configuration for one tool run, with builder pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Tool variant
    pub tool: ToolKind,
    /// Where records are written (`-` = stdout; a prefix for the trace tool)
    pub output_path: PathBuf,
    /// Instructions per aggregation window
    pub sampling_threshold: u64,
    /// Ceiling on concurrently registered contexts
    pub max_threads: usize,
    /// Bytes per dirty-page bucket
    pub page_size: u64,
    /// Hand released slots to new contexts
    pub reuse_slots: bool,
    /// Append operand size to trace lines
    pub trace_sizes: bool,
    /// Slot whose read-only addresses the footprint summary counts
    pub read_only_slot: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ProbeConfig {
    /// Defaults for `tool`, no environment lookups.
    /// Useful for testing or when you want full control.
    pub fn new(tool: ToolKind) -> Self {
        Self {
            tool,
            output_path: PathBuf::from(tool.default_output()),
            sampling_threshold: defaults::SAMPLING_THRESHOLD,
            max_threads: tool.default_max_threads(),
            page_size: defaults::PAGE_SIZE,
            reuse_slots: defaults::REUSE_SLOTS,
            trace_sizes: defaults::TRACE_SIZES,
            read_only_slot: defaults::READ_ONLY_SLOT,
        }
    }

    /// Create config from defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `MPR_TOOL` - dirty-pages, footprint or trace
    /// - `MPR_OUTPUT` - output file (trace: stream prefix)
    /// - `MPR_THRESHOLD` - instructions per window, float notation allowed
    /// - `MPR_MAX_THREADS` - thread ceiling
    /// - `MPR_PAGE_SIZE` - page size in bytes
    /// - `MPR_REUSE_SLOTS` - reuse released slots (0/1)
    /// - `MPR_TRACE_SIZES` - append sizes to trace lines (0/1)
    /// - `MPR_READ_ONLY_SLOT` - slot reported in the read-only count
    pub fn from_env() -> Self {
        let tool = env_get_opt::<String>("MPR_TOOL")
            .and_then(|s| s.parse().ok())
            .unwrap_or(ToolKind::DirtyPages);
        Self::from_env_for(tool)
    }

    /// Like [`ProbeConfig::from_env`] with the tool fixed by the caller
    pub fn from_env_for(tool: ToolKind) -> Self {
        let base = Self::new(tool);
        Self {
            tool,
            output_path: PathBuf::from(env_get_str("MPR_OUTPUT", tool.default_output())),
            sampling_threshold: env_get_count("MPR_THRESHOLD", base.sampling_threshold),
            max_threads: env_get("MPR_MAX_THREADS", base.max_threads),
            page_size: env_get("MPR_PAGE_SIZE", base.page_size),
            reuse_slots: env_get_bool("MPR_REUSE_SLOTS", base.reuse_slots),
            trace_sizes: env_get_bool("MPR_TRACE_SIZES", base.trace_sizes),
            read_only_slot: env_get("MPR_READ_ONLY_SLOT", base.read_only_slot),
        }
    }

    /// Set output path
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Set instructions per window
    pub fn sampling_threshold(mut self, n: u64) -> Self {
        self.sampling_threshold = n;
        self
    }

    /// Set thread ceiling
    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = n;
        self
    }

    /// Set page size in bytes
    pub fn page_size(mut self, n: u64) -> Self {
        self.page_size = n;
        self
    }

    /// Enable or disable slot reuse
    pub fn reuse_slots(mut self, enable: bool) -> Self {
        self.reuse_slots = enable;
        self
    }

    /// Enable or disable sizes in trace lines
    pub fn trace_sizes(mut self, enable: bool) -> Self {
        self.trace_sizes = enable;
        self
    }

    /// Set slot reported in the read-only count
    pub fn read_only_slot(mut self, slot: usize) -> Self {
        self.read_only_slot = slot;
        self
    }

    /// Whether single-stream output goes to stdout
    pub fn writes_stdout(&self) -> bool {
        self.output_path.as_os_str() == "-"
    }

    /// Validate configuration
    pub fn validate(&self) -> ProbeResult<()> {
        if self.sampling_threshold == 0 {
            return Err(ProbeError::InvalidConfig("sampling_threshold must be at least 1"));
        }
        if self.page_size == 0 {
            return Err(ProbeError::InvalidConfig("page_size must be at least 1"));
        }
        if self.max_threads == 0 {
            return Err(ProbeError::InvalidConfig("max_threads must be at least 1"));
        }
        if self.max_threads > MAX_THREADS_LIMIT {
            return Err(ProbeError::InvalidConfig("max_threads exceeds maximum"));
        }
        if self.read_only_slot >= self.max_threads {
            return Err(ProbeError::InvalidConfig("read_only_slot must be below max_threads"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ProbeError::InvalidConfig("output_path must not be empty"));
        }
        if self.tool == ToolKind::Trace && self.writes_stdout() {
            return Err(ProbeError::InvalidConfig("trace output needs a file prefix"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_defaults() {
        let dirty = ProbeConfig::new(ToolKind::DirtyPages);
        assert_eq!(dirty.max_threads, 32);
        assert_eq!(dirty.page_size, 2048);
        assert_eq!(dirty.output_path, PathBuf::from("dirty_pages.out"));

        let footprint = ProbeConfig::new(ToolKind::Footprint);
        assert_eq!(footprint.max_threads, 8);

        let trace = ProbeConfig::new(ToolKind::Trace);
        assert_eq!(trace.output_path, PathBuf::from("pinatrace"));
        assert!(trace.validate().is_ok());
    }

    #[test]
    fn test_tool_kind_parse() {
        assert_eq!("dirty_pages".parse::<ToolKind>().unwrap(), ToolKind::DirtyPages);
        assert_eq!("Footprint".parse::<ToolKind>().unwrap(), ToolKind::Footprint);
        assert_eq!("pinatrace".parse::<ToolKind>().unwrap(), ToolKind::Trace);
        assert!("cachesim".parse::<ToolKind>().is_err());
        for kind in ToolKind::ALL {
            assert_eq!(kind.name().parse::<ToolKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_builder() {
        let config = ProbeConfig::new(ToolKind::DirtyPages)
            .sampling_threshold(1000)
            .max_threads(4)
            .page_size(4096)
            .reuse_slots(true)
            .output_path("-");
        assert_eq!(config.sampling_threshold, 1000);
        assert_eq!(config.max_threads, 4);
        assert!(config.reuse_slots);
        assert!(config.writes_stdout());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let base = ProbeConfig::new(ToolKind::Footprint);
        assert!(base.clone().sampling_threshold(0).validate().is_err());
        assert!(base.clone().page_size(0).validate().is_err());
        assert!(base.clone().max_threads(0).validate().is_err());
        assert!(base.clone().max_threads(MAX_THREADS_LIMIT + 1).validate().is_err());
        assert!(base.clone().read_only_slot(8).validate().is_err());
        assert!(base.clone().output_path("").validate().is_err());
        assert!(ProbeConfig::new(ToolKind::Trace).output_path("-").validate().is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("MPR_THRESHOLD", "2e3");
        std::env::set_var("MPR_PAGE_SIZE", "4096");
        let config = ProbeConfig::from_env_for(ToolKind::DirtyPages);
        std::env::remove_var("MPR_THRESHOLD");
        std::env::remove_var("MPR_PAGE_SIZE");

        assert_eq!(config.sampling_threshold, 2000);
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.tool, ToolKind::DirtyPages);
    }
}
