//! Per-thread access logger
//!
//! Every slot appends `<ip>: R|W <addr>[ <size>]` lines to its own
//! buffered stream. Streams are private to their slot, so the per-slot
//! lock is only contended by `finish`.

use core::sync::atomic::{AtomicU64, Ordering};
use std::io::{BufWriter, Write};

use memprobe_core::constants::TRACE_EOF;
use memprobe_core::{kwarn, CachePadded, ProbeError, ProbeResult, SlotId, SpinLock};

use crate::output::{BoxedWriter, StreamFactory};

/// Direction of a logged access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    #[inline]
    pub fn as_char(&self) -> char {
        match self {
            AccessKind::Read => 'R',
            AccessKind::Write => 'W',
        }
    }
}

struct TraceStream {
    /// `None` once the stream is closed
    writer: Option<BufWriter<BoxedWriter>>,
    name: String,
    lines: u64,
    failed: bool,
}

/// Append-only trace sink, one stream per slot
pub struct AccessLogger {
    streams: Box<[CachePadded<SpinLock<TraceStream>>]>,
    record_sizes: bool,
    write_errors: AtomicU64,
}

impl AccessLogger {
    /// Open a stream for every slot up front
    pub fn new(factory: &dyn StreamFactory, num_slots: usize, record_sizes: bool) -> ProbeResult<Self> {
        let mut streams = Vec::with_capacity(num_slots);
        for i in 0..num_slots {
            let slot = SlotId::new(i as u32);
            let writer = factory.open(slot)?;
            streams.push(CachePadded::new(SpinLock::new(TraceStream {
                writer: Some(BufWriter::new(writer)),
                name: factory.describe(slot),
                lines: 0,
                failed: false,
            })));
        }
        Ok(Self {
            streams: streams.into_boxed_slice(),
            record_sizes,
            write_errors: AtomicU64::new(0),
        })
    }

    /// Append one access record to `slot`'s stream.
    ///
    /// Records for closed streams or unknown slots are dropped. A failed
    /// write is counted and reported once per stream.
    #[inline]
    pub fn log(&self, slot: SlotId, ip: u64, addr: u64, kind: AccessKind, size: u32) {
        let Some(stream) = self.streams.get(slot.as_usize()) else {
            return;
        };
        let mut stream = stream.lock();
        let Some(writer) = stream.writer.as_mut() else {
            return;
        };

        let result = if self.record_sizes {
            writeln!(writer, "{:#x}: {} {:#x} {}", ip, kind.as_char(), addr, size)
        } else {
            writeln!(writer, "{:#x}: {} {:#x}", ip, kind.as_char(), addr)
        };

        match result {
            Ok(()) => stream.lines += 1,
            Err(e) => {
                self.write_errors.fetch_add(1, Ordering::Relaxed);
                if !stream.failed {
                    stream.failed = true;
                    kwarn!("trace stream {} write failed: {}", stream.name, e);
                }
            }
        }
    }

    /// Write the sentinel to every open stream, flush and close it.
    ///
    /// Every stream is closed even if an earlier one fails; the first
    /// failure is returned. Calling it again is a no-op.
    pub fn finish(&self) -> ProbeResult<()> {
        let mut first_err = None;
        for stream in self.streams.iter() {
            let mut stream = stream.lock();
            let Some(mut writer) = stream.writer.take() else {
                continue;
            };
            let result = writeln!(writer, "{}", TRACE_EOF).and_then(|_| writer.flush());
            if let Err(e) = result {
                kwarn!("trace stream {} close failed: {}", stream.name, e);
                first_err.get_or_insert_with(|| ProbeError::io(stream.name.clone(), &e));
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Records appended to `slot`'s stream
    pub fn lines(&self, slot: SlotId) -> u64 {
        self.streams
            .get(slot.as_usize())
            .map(|s| s.lock().lines)
            .unwrap_or(0)
    }

    /// Failed writes across every stream
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    /// Number of streams
    #[inline]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
