//! Footprint tool
//!
//! Records per-address statistics in each thread's private table and
//! writes one summary at program exit:
//!
//! ```text
//! Thread 0 addrs 1532 all_bytes_read 98112
//! Thread 1 addrs 0 all_bytes_read 0
//! Total addrs 1532
//! Read-only addrs 911
//! Total all_bytes_read 98112
//! ```
//!
//! Blocks are counted per slot as well. The counts are part of the
//! in-process read-out ([`FootprintTool::instructions`]) and the exit log
//! line, not of the summary file.

use std::io::{self, Write};

use memprobe_core::{
    kinfo, HostThreadId, InstrumentationHooks, MemoryAccess, PerThreadCounter, ProbeError,
    ProbeResult, SlotId, SpinLock,
};

use crate::config::ProbeConfig;
use crate::footprint::{FootprintSummary, FootprintTable};
use crate::output::{open_output, BoxedWriter};
use crate::tools::Lifecycle;

pub struct FootprintTool {
    lifecycle: Lifecycle,
    /// Instructions per slot, read out alongside the tables
    counters: PerThreadCounter,
    table: FootprintTable,
    read_only_slot: SlotId,
    out: SpinLock<Option<BoxedWriter>>,
    out_name: String,
}

impl FootprintTool {
    /// Build the tool writing its summary to `config.output_path`
    pub fn new(config: &ProbeConfig) -> ProbeResult<Self> {
        config.validate()?;
        let writer = open_output(&config.output_path)?;
        Ok(Self::build(config, writer, config.output_path.display().to_string()))
    }

    /// Build the tool writing its summary to an already opened stream
    pub fn with_writer(config: &ProbeConfig, writer: BoxedWriter, name: String) -> ProbeResult<Self> {
        config.validate()?;
        Ok(Self::build(config, writer, name))
    }

    /// Assemble from a validated config
    fn build(config: &ProbeConfig, writer: BoxedWriter, name: String) -> Self {
        kinfo!("footprint: max threads {}, output {}", config.max_threads, name);
        Self {
            lifecycle: Lifecycle::new("footprint", config),
            counters: PerThreadCounter::new(config.max_threads),
            table: FootprintTable::new(config.max_threads),
            read_only_slot: SlotId::new(config.read_only_slot as u32),
            out: SpinLock::new(Some(writer)),
            out_name: name,
        }
    }

    /// Per-thread tables
    pub fn table(&self) -> &FootprintTable {
        &self.table
    }

    /// Current read-out
    pub fn summary(&self) -> FootprintSummary {
        self.table.summary(self.read_only_slot)
    }

    /// Instructions executed by one slot; reported next to its table
    pub fn instructions(&self, slot: SlotId) -> u64 {
        self.counters.get(slot)
    }
}

/// Render a summary in the tool's text format
pub fn write_summary(w: &mut dyn Write, summary: &FootprintSummary) -> io::Result<()> {
    for t in &summary.threads {
        writeln!(w, "Thread {} addrs {} all_bytes_read {}", t.slot, t.addrs, t.bytes)?;
    }
    writeln!(w, "Total addrs {}", summary.total_addrs)?;
    writeln!(w, "Read-only addrs {}", summary.read_only_addrs)?;
    writeln!(w, "Total all_bytes_read {}", summary.total_bytes)?;
    Ok(())
}

impl InstrumentationHooks for FootprintTool {
    fn name(&self) -> &'static str {
        "footprint"
    }

    fn on_thread_start(&self, ctx: HostThreadId) -> SlotId {
        self.lifecycle.start(ctx)
    }

    fn on_thread_exit(&self, ctx: HostThreadId) {
        self.lifecycle.exit(ctx)
    }

    #[inline]
    fn on_block(&self, slot: SlotId, instructions: u32) {
        self.counters.advance(slot, instructions as u64);
    }

    #[inline]
    fn on_memory_access(&self, access: &MemoryAccess) {
        self.table
            .record(access.slot, access.addr, access.size, access.is_read, access.is_write);
    }

    fn on_program_exit(&self, exit_code: i32) -> ProbeResult<()> {
        if !self.lifecycle.begin_exit(exit_code) {
            return Ok(());
        }
        let summary = self.summary();
        kinfo!(
            "footprint: {} addresses, {} bytes, {} instructions",
            summary.total_addrs,
            summary.total_bytes,
            self.counters.global_sum()
        );

        let Some(mut writer) = self.out.lock().take() else {
            return Ok(());
        };
        write_summary(&mut *writer, &summary)
            .and_then(|_| writer.flush())
            .map_err(|e| ProbeError::io(self.out_name.clone(), &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolKind;
    use crate::output::SharedBuffer;
    use std::sync::Arc;
    use std::thread;

    fn tool(max_threads: usize) -> (FootprintTool, SharedBuffer) {
        let buf = SharedBuffer::new();
        let config = ProbeConfig::new(ToolKind::Footprint).max_threads(max_threads);
        let tool = FootprintTool::with_writer(&config, Box::new(buf.clone()), "memory".into()).unwrap();
        (tool, buf)
    }

    #[test]
    fn test_read_read_write_stat() {
        let (tool, _buf) = tool(1);
        let slot = tool.on_thread_start(1);
        tool.on_memory_access(&MemoryAccess::read(slot, 0x10, 100, 4));
        tool.on_memory_access(&MemoryAccess::read(slot, 0x14, 100, 4));
        tool.on_memory_access(&MemoryAccess::write(slot, 0x18, 100, 8));

        let stat = tool.table().stat(slot, 100).unwrap();
        assert_eq!(stat.access_count, 3);
        assert_eq!((stat.min_size, stat.max_size), (4, 8));
        assert!(stat.seen_read && stat.seen_write);
    }

    #[test]
    fn test_summary_output() {
        let (tool, buf) = tool(2);
        let a = tool.on_thread_start(1);
        let b = tool.on_thread_start(2);
        tool.on_memory_access(&MemoryAccess::read(a, 0, 0x100, 8));
        tool.on_memory_access(&MemoryAccess::read(a, 0, 0x100, 8));
        tool.on_memory_access(&MemoryAccess::write(a, 0, 0x200, 4));
        tool.on_memory_access(&MemoryAccess::read(b, 0, 0x300, 2));
        tool.on_block(a, 12);

        tool.on_program_exit(0).unwrap();
        assert_eq!(
            buf.text(),
            "Thread 0 addrs 2 all_bytes_read 20\n\
             Thread 1 addrs 1 all_bytes_read 2\n\
             Total addrs 3\n\
             Read-only addrs 1\n\
             Total all_bytes_read 22\n"
        );
        assert_eq!(tool.instructions(a), 12);

        // Second exit writes nothing more
        tool.on_program_exit(0).unwrap();
        assert_eq!(buf.text().lines().count(), 5);
    }

    #[test]
    fn test_invalid_config_opens_nothing() {
        let path = std::env::temp_dir().join(format!("memprobe-footprint-invalid-{}.out", std::process::id()));
        let config = ProbeConfig::new(ToolKind::Footprint)
            .output_path(&path)
            .read_only_slot(99);

        assert!(matches!(FootprintTool::new(&config), Err(ProbeError::InvalidConfig(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_instructions_counted_per_slot() {
        let (tool, _buf) = tool(2);
        let a = tool.on_thread_start(1);
        let b = tool.on_thread_start(2);
        tool.on_block(a, 5);
        tool.on_block(b, 7);
        tool.on_block(a, 5);

        assert_eq!(tool.instructions(a), 10);
        assert_eq!(tool.instructions(b), 7);
        assert_eq!(tool.instructions(SlotId::new(5)), 0);
    }

    #[test]
    fn test_threads_isolated() {
        let (tool, _buf) = tool(4);
        let tool = Arc::new(tool);
        let mut handles = vec![];

        for t in 0..4u64 {
            let tool = Arc::clone(&tool);
            handles.push(thread::spawn(move || {
                let slot = tool.on_thread_start(t);
                // Thread t touches (t + 1) * 100 distinct addresses, twice each
                for round in 0..2 {
                    for i in 0..(t + 1) * 100 {
                        let access = if round == 0 {
                            MemoryAccess::read(slot, 0, i * 8, 8)
                        } else {
                            MemoryAccess::write(slot, 0, i * 8, 8)
                        };
                        tool.on_memory_access(&access);
                    }
                }
                slot
            }));
        }

        let slots: Vec<SlotId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let summary = tool.summary();
        for t in summary.threads {
            let ctx = slots.iter().position(|s| *s == t.slot).unwrap() as u64;
            assert_eq!(t.addrs as u64, (ctx + 1) * 100);
            assert_eq!(t.bytes, (ctx + 1) * 100 * 2 * 8);
        }
        assert_eq!(summary.total_addrs, 1000);
        assert_eq!(summary.read_only_addrs, 0);
    }
}
