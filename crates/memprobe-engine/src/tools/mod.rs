//! Tool variants
//!
//! Each tool implements [`InstrumentationHooks`] over the shared
//! aggregation structures:
//!
//! - `dirty_pages` - distinct written pages per instruction window
//! - `footprint` - per-address statistics per thread, reported at exit
//! - `trace` - raw per-thread access trace
//!
//! [`InstrumentationHooks`]: memprobe_core::InstrumentationHooks

pub mod dirty_pages;
pub mod footprint;
pub mod trace;

pub use dirty_pages::{DirtyPageTool, WindowSnapshot};
pub use footprint::FootprintTool;
pub use trace::TraceTool;

use core::sync::atomic::{AtomicBool, Ordering};

use memprobe_core::{kdebug, kerror, kinfo, kwarn, HostThreadId, ProbeError, SlotId, ThreadRegistry};

use crate::config::ProbeConfig;

/// Thread lifecycle shared by every tool
pub(crate) struct Lifecycle {
    tool: &'static str,
    registry: ThreadRegistry,
    exited: AtomicBool,
}

impl Lifecycle {
    pub(crate) fn new(tool: &'static str, config: &ProbeConfig) -> Self {
        Self {
            tool,
            registry: ThreadRegistry::new(config.max_threads, config.reuse_slots),
            exited: AtomicBool::new(false),
        }
    }

    /// Register a context; the thread ceiling is fatal
    pub(crate) fn start(&self, ctx: HostThreadId) -> SlotId {
        match self.registry.register(ctx) {
            Ok(slot) => {
                kdebug!("{}: thread {} started on slot {}", self.tool, ctx, slot);
                slot
            }
            Err(e @ ProbeError::ThreadCeilingExceeded { .. }) => {
                kerror!("{}: {}", self.tool, e);
                panic!("{}: {}", self.tool, e);
            }
            Err(e) => {
                kerror!("{}: cannot register thread {}: {}", self.tool, ctx, e);
                panic!("{}: {}", self.tool, e);
            }
        }
    }

    pub(crate) fn exit(&self, ctx: HostThreadId) {
        match self.registry.release(ctx) {
            Ok(slot) => kdebug!("{}: thread {} on slot {} exited", self.tool, ctx, slot),
            Err(e) => kwarn!("{}: {}", self.tool, e),
        }
    }

    /// True for the first program-exit notification only
    pub(crate) fn begin_exit(&self, exit_code: i32) -> bool {
        if self.exited.swap(true, Ordering::AcqRel) {
            return false;
        }
        kinfo!(
            "{}: program exited with code {}; number of threads ever exist = {}",
            self.tool,
            exit_code,
            self.registry.ever_registered()
        );
        true
    }

    pub(crate) fn registry(&self) -> &ThreadRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolKind;

    #[test]
    fn test_lifecycle_start_exit() {
        let lc = Lifecycle::new("test", &ProbeConfig::new(ToolKind::Footprint).max_threads(2));
        assert_eq!(lc.start(10), SlotId::new(0));
        assert_eq!(lc.start(11), SlotId::new(1));
        lc.exit(10);
        lc.exit(99);
        assert_eq!(lc.registry().live_count(), 1);
        assert_eq!(lc.registry().ever_registered(), 2);
    }

    #[test]
    #[should_panic(expected = "maximum number of threads exceeded")]
    fn test_lifecycle_ceiling_is_fatal() {
        memprobe_core::kprint::set_log_level(memprobe_core::kprint::LogLevel::Off);
        let lc = Lifecycle::new("test", &ProbeConfig::new(ToolKind::Trace).max_threads(1));
        lc.start(1);
        lc.start(2);
    }

    #[test]
    fn test_begin_exit_once() {
        let lc = Lifecycle::new("test", &ProbeConfig::new(ToolKind::Trace));
        assert!(lc.begin_exit(0));
        assert!(!lc.begin_exit(0));
    }
}
