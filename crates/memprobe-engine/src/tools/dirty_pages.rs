//! Dirty-pages tool
//!
//! Counts instructions per slot and, every `sampling_threshold`
//! instructions, writes `<cumulative_instructions> <distinct_pages>` for
//! the window just closed, then starts a fresh page set. Only written
//! operands dirty a page.

use core::sync::atomic::{AtomicU64, Ordering};
use std::io::{BufWriter, Write};

use memprobe_core::{
    kinfo, kwarn, HostThreadId, InstrumentationHooks, MemoryAccess, PerThreadCounter, ProbeError,
    ProbeResult, SlotId, SpinLock,
};

use crate::config::ProbeConfig;
use crate::dirty_pages::DirtyPageSet;
use crate::epoch::{EpochBoundary, EpochGate};
use crate::output::{open_output, BoxedWriter};
use crate::tools::Lifecycle;

/// One emitted window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub epoch: u64,
    pub total_instructions: u64,
    pub window_instructions: u64,
    pub dirty_pages: usize,
}

struct WindowOutput {
    writer: Option<BufWriter<BoxedWriter>>,
    last: Option<WindowSnapshot>,
    failed: bool,
}

pub struct DirtyPageTool {
    lifecycle: Lifecycle,
    counters: PerThreadCounter,
    gate: EpochGate,
    pages: DirtyPageSet,
    /// Only written under the epoch lock and at exit
    out: SpinLock<WindowOutput>,
    out_name: String,
    write_errors: AtomicU64,
}

impl DirtyPageTool {
    /// Build the tool writing windows to `config.output_path`
    pub fn new(config: &ProbeConfig) -> ProbeResult<Self> {
        config.validate()?;
        let writer = open_output(&config.output_path)?;
        Ok(Self::build(config, writer, config.output_path.display().to_string()))
    }

    /// Build the tool writing windows to an already opened stream
    pub fn with_writer(config: &ProbeConfig, writer: BoxedWriter, name: String) -> ProbeResult<Self> {
        config.validate()?;
        Ok(Self::build(config, writer, name))
    }

    /// Assemble from a validated config
    fn build(config: &ProbeConfig, writer: BoxedWriter, name: String) -> Self {
        kinfo!(
            "dirty-pages: window {} instructions, page size {}, max threads {}, output {}",
            config.sampling_threshold,
            config.page_size,
            config.max_threads,
            name
        );
        Self {
            lifecycle: Lifecycle::new("dirty-pages", config),
            counters: PerThreadCounter::new(config.max_threads),
            gate: EpochGate::new(config.sampling_threshold),
            pages: DirtyPageSet::new(config.page_size),
            out: SpinLock::new(WindowOutput {
                writer: Some(BufWriter::new(writer)),
                last: None,
                failed: false,
            }),
            out_name: name,
            write_errors: AtomicU64::new(0),
        }
    }

    /// Runs under the epoch lock
    fn emit(&self, boundary: &EpochBoundary) {
        let snapshot = WindowSnapshot {
            epoch: boundary.epoch,
            total_instructions: boundary.total_instructions,
            window_instructions: boundary.window_instructions,
            dirty_pages: self.pages.take_count(),
        };

        let mut out = self.out.lock();
        out.last = Some(snapshot);
        let Some(writer) = out.writer.as_mut() else {
            return;
        };
        let result = writeln!(writer, "{} {}", snapshot.total_instructions, snapshot.dirty_pages);
        if let Err(e) = result {
            self.write_errors.fetch_add(1, Ordering::Relaxed);
            if !out.failed {
                out.failed = true;
                kwarn!("dirty-pages: write to {} failed: {}", self.out_name, e);
            }
        }
    }

    /// Most recent window
    pub fn last_window(&self) -> Option<WindowSnapshot> {
        self.out.lock().last
    }

    /// Windows emitted so far
    pub fn windows(&self) -> u64 {
        self.gate.epochs()
    }

    /// Pages dirtied in the current window (racy)
    pub fn dirty_pages(&self) -> usize {
        self.pages.len()
    }

    /// Racy global instruction count
    pub fn total_instructions(&self) -> u64 {
        self.counters.global_sum()
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    pub fn threads_ever(&self) -> usize {
        self.lifecycle.registry().ever_registered()
    }
}

impl InstrumentationHooks for DirtyPageTool {
    fn name(&self) -> &'static str {
        "dirty-pages"
    }

    fn on_thread_start(&self, ctx: HostThreadId) -> SlotId {
        self.lifecycle.start(ctx)
    }

    fn on_thread_exit(&self, ctx: HostThreadId) {
        self.lifecycle.exit(ctx)
    }

    #[inline]
    fn on_block(&self, slot: SlotId, instructions: u32) {
        self.gate
            .advance(&self.counters, slot, instructions as u64, |b| self.emit(b));
    }

    #[inline]
    fn on_memory_access(&self, access: &MemoryAccess) {
        if access.is_write {
            self.pages.touch(access.addr);
        }
    }

    fn on_program_exit(&self, exit_code: i32) -> ProbeResult<()> {
        if !self.lifecycle.begin_exit(exit_code) {
            return Ok(());
        }
        kinfo!(
            "dirty-pages: {} windows, {} instructions",
            self.windows(),
            self.total_instructions()
        );

        let mut out = self.out.lock();
        let Some(mut writer) = out.writer.take() else {
            return Ok(());
        };
        writer.flush().map_err(|e| ProbeError::io(self.out_name.clone(), &e))
    }
}
