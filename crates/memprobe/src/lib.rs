//! # memprobe - concurrent memory-access aggregation
//!
//! Aggregates per-instruction memory-access events from a running,
//! multi-threaded program without serializing it.
//!
//! ## Tools
//!
//! - **dirty-pages**: distinct written pages per instruction window
//! - **footprint**: per-address, per-thread access statistics at exit
//! - **trace**: raw per-thread `<ip>: R|W <addr>` stream
//!
//! ## Quick Start
//!
//! ```ignore
//! use memprobe::{Probe, ProbeConfig, ToolKind};
//!
//! let probe = Probe::new(ProbeConfig::new(ToolKind::DirtyPages))?;
//!
//! // On each instrumented thread
//! let ctx = probe.attach(gettid());
//! ctx.write(ip, addr, 8);
//! ctx.block(12);
//! drop(ctx); // thread exit
//!
//! probe.finish(0)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Host instrumentation                     │
//! │     operand discovery, predication, thread lifecycle        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ InstrumentationHooks
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │          DirtyPageTool / FootprintTool / TraceTool          │
//! └─────────────────────────────────────────────────────────────┘
//!          │                   │                   │
//!          ▼                   ▼                   ▼
//!    ┌───────────┐      ┌─────────────┐     ┌──────────────┐
//!    │ EpochGate │      │ Footprint   │     │ AccessLogger │
//!    │ DirtyPage │      │ Table       │     │ (per slot)   │
//!    │ Set       │      │ (per slot)  │     │              │
//!    └───────────┘      └─────────────┘     └──────────────┘
//!          │
//!          ▼
//!    ┌─────────────────────────────────────────────────────────┐
//!    │     ThreadRegistry + PerThreadCounter (per slot)        │
//!    └─────────────────────────────────────────────────────────┘
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

// Re-export core types
pub use memprobe_core::{
    HostThreadId,
    SlotId,
    ProbeError,
    ProbeResult,
    InstrumentationHooks,
    MemoryAccess,
    ThreadRegistry,
    PerThreadCounter,
};

// Re-export kprint macros for debug logging
pub use memprobe_core::{kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use memprobe_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use memprobe_core::{env_get, env_get_bool, env_get_count, env_get_opt, env_get_str, env_is_set};

// Re-export engine types
pub use memprobe_engine::{
    ProbeConfig,
    ToolKind,
    DirtyPageTool,
    FootprintTool,
    TraceTool,
    WindowSnapshot,
    AccessStat,
    FootprintSummary,
    StreamFactory,
    FileStreams,
    MemoryStreams,
    SharedBuffer,
};

/// Build the tool selected by `config.tool`
pub fn build_tool(config: &ProbeConfig) -> ProbeResult<Box<dyn InstrumentationHooks>> {
    let tool: Box<dyn InstrumentationHooks> = match config.tool {
        ToolKind::DirtyPages => Box::new(DirtyPageTool::new(config)?),
        ToolKind::Footprint => Box::new(FootprintTool::new(config)?),
        ToolKind::Trace => Box::new(TraceTool::new(config)?),
    };
    Ok(tool)
}

/// Owning handle around one tool instance
///
/// Constructed at instrumentation start and torn down at program exit.
/// Dropping an unfinished probe runs the exit path with code 0.
pub struct Probe {
    hooks: Box<dyn InstrumentationHooks>,
    finished: AtomicBool,
}

impl Probe {
    /// Build the tool described by `config`
    pub fn new(config: ProbeConfig) -> ProbeResult<Self> {
        Ok(Self::from_hooks(build_tool(&config)?))
    }

    /// Wrap an already built tool
    pub fn from_hooks(hooks: Box<dyn InstrumentationHooks>) -> Self {
        Self {
            hooks,
            finished: AtomicBool::new(false),
        }
    }

    /// The hooks a host drives directly
    #[inline]
    pub fn hooks(&self) -> &dyn InstrumentationHooks {
        &*self.hooks
    }

    /// Register the calling context; it exits when the handle drops
    pub fn attach(&self, ctx: HostThreadId) -> ContextHandle<'_> {
        let slot = self.hooks.on_thread_start(ctx);
        ContextHandle { probe: self, ctx, slot }
    }

    /// Deliver the program-exit notification
    pub fn finish(&self, exit_code: i32) -> ProbeResult<()> {
        if self.finished.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.hooks.on_program_exit(exit_code)
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        if let Err(e) = self.finish(0) {
            kerror!("{}: exit failed: {}", self.hooks.name(), e);
        }
    }
}

/// One registered execution context
pub struct ContextHandle<'a> {
    probe: &'a Probe,
    ctx: HostThreadId,
    slot: SlotId,
}

impl<'a> ContextHandle<'a> {
    #[inline]
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// A block of `instructions` instructions is about to execute
    #[inline]
    pub fn block(&self, instructions: u32) {
        self.probe.hooks.on_block(self.slot, instructions);
    }

    #[inline]
    pub fn read(&self, ip: u64, addr: u64, size: u32) {
        self.probe
            .hooks
            .on_memory_access(&MemoryAccess::read(self.slot, ip, addr, size));
    }

    #[inline]
    pub fn write(&self, ip: u64, addr: u64, size: u32) {
        self.probe
            .hooks
            .on_memory_access(&MemoryAccess::write(self.slot, ip, addr, size));
    }
}

impl<'a> Drop for ContextHandle<'a> {
    fn drop(&mut self) {
        self.probe.hooks.on_thread_exit(self.ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_probe_drives_tool() {
        let buf = SharedBuffer::new();
        let config = ProbeConfig::new(ToolKind::DirtyPages)
            .sampling_threshold(1000)
            .max_threads(4);
        let tool = DirtyPageTool::with_writer(&config, Box::new(buf.clone()), "memory".into()).unwrap();
        let probe = Probe::from_hooks(Box::new(tool));

        {
            let ctx = probe.attach(1);
            assert_eq!(ctx.slot(), SlotId::new(0));
            for addr in [0u64, 2047, 2048, 4096] {
                ctx.write(0x400000, addr, 4);
            }
            ctx.read(0x400004, 1 << 20, 4);
            ctx.block(1000);
        }

        probe.finish(0).unwrap();
        probe.finish(0).unwrap();
        assert_eq!(buf.text(), "1000 3\n");
        assert_eq!(probe.hooks().name(), "dirty-pages");
    }

    #[test]
    fn test_scoped_threads() {
        let streams = MemoryStreams::new();
        let config = ProbeConfig::new(ToolKind::Trace).max_threads(3);
        let probe = Probe::from_hooks(Box::new(TraceTool::with_streams(&config, &streams).unwrap()));

        thread::scope(|s| {
            for t in 0..3u64 {
                let probe = &probe;
                s.spawn(move || {
                    let ctx = probe.attach(t);
                    for i in 0..10 {
                        ctx.read(t, i, 8);
                    }
                });
            }
        });
        drop(probe);

        for i in 0..3 {
            let text = streams.buffer(SlotId::new(i)).unwrap().text();
            assert_eq!(text.lines().count(), 11);
            assert!(text.ends_with("#eof\n"));
        }
    }

    #[test]
    fn test_build_tool_rejects_bad_config() {
        let config = ProbeConfig::new(ToolKind::Footprint).sampling_threshold(0);
        assert!(matches!(build_tool(&config), Err(ProbeError::InvalidConfig(_))));
    }
}
