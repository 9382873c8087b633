//! Trace tool
//!
//! Writes every executed memory operand to its thread's stream as
//! `<ip>: R|W <addr>[ <size>]`. An operand that is both read and written
//! produces a read line followed by a write line. Each stream ends with
//! `#eof` once the program exits cleanly.

use memprobe_core::{kinfo, HostThreadId, InstrumentationHooks, MemoryAccess, ProbeResult, SlotId};

use crate::access_log::{AccessKind, AccessLogger};
use crate::config::ProbeConfig;
use crate::output::{FileStreams, StreamFactory};
use crate::tools::Lifecycle;

pub struct TraceTool {
    lifecycle: Lifecycle,
    logger: AccessLogger,
}

impl TraceTool {
    /// Build the tool with one `<output_path>_<slot>.out` file per slot
    pub fn new(config: &ProbeConfig) -> ProbeResult<Self> {
        Self::with_streams(config, &FileStreams::new(&config.output_path))
    }

    /// Build the tool over caller-provided streams
    pub fn with_streams(config: &ProbeConfig, streams: &dyn StreamFactory) -> ProbeResult<Self> {
        config.validate()?;
        let logger = AccessLogger::new(streams, config.max_threads, config.trace_sizes)?;
        kinfo!(
            "trace: {} streams at {}, sizes {}",
            config.max_threads,
            streams.describe(SlotId::new(0)),
            if config.trace_sizes { "on" } else { "off" }
        );
        Ok(Self {
            lifecycle: Lifecycle::new("trace", config),
            logger,
        })
    }

    /// Lines appended for one slot
    pub fn lines(&self, slot: SlotId) -> u64 {
        self.logger.lines(slot)
    }
}

impl InstrumentationHooks for TraceTool {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn on_thread_start(&self, ctx: HostThreadId) -> SlotId {
        self.lifecycle.start(ctx)
    }

    fn on_thread_exit(&self, ctx: HostThreadId) {
        self.lifecycle.exit(ctx)
    }

    #[inline]
    fn on_block(&self, _slot: SlotId, _instructions: u32) {}

    #[inline]
    fn on_memory_access(&self, access: &MemoryAccess) {
        if access.is_read {
            self.logger
                .log(access.slot, access.ip, access.addr, AccessKind::Read, access.size);
        }
        if access.is_write {
            self.logger
                .log(access.slot, access.ip, access.addr, AccessKind::Write, access.size);
        }
    }

    fn on_program_exit(&self, exit_code: i32) -> ProbeResult<()> {
        if !self.lifecycle.begin_exit(exit_code) {
            return Ok(());
        }
        self.logger.finish()
    }
}
