//! Output streams
//!
//! Tools write through boxed writers so the same code can target files,
//! stdout or in-memory buffers. Opening happens at tool construction;
//! a stream that cannot be opened is a startup error.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memprobe_core::{ProbeError, ProbeResult, SlotId, SpinLock};

/// Owned output stream
pub type BoxedWriter = Box<dyn Write + Send>;

/// Opens one private stream per slot
pub trait StreamFactory: Send + Sync {
    /// Open the stream for `slot`
    fn open(&self, slot: SlotId) -> ProbeResult<BoxedWriter>;

    /// Human-readable name of the stream for `slot` (used in errors)
    fn describe(&self, slot: SlotId) -> String;
}

/// Open a single output file, or stdout for `-`
pub fn open_output(path: &Path) -> ProbeResult<BoxedWriter> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdout()));
    }
    let file = File::create(path).map_err(|e| ProbeError::io(path.display().to_string(), &e))?;
    Ok(Box::new(file))
}

/// Per-slot files named `<prefix>_<slot>.out`
#[derive(Debug, Clone)]
pub struct FileStreams {
    prefix: PathBuf,
}

impl FileStreams {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// File path used for `slot`
    pub fn path_for(&self, slot: SlotId) -> PathBuf {
        let mut name = self.prefix.as_os_str().to_owned();
        name.push(format!("_{}.out", slot));
        PathBuf::from(name)
    }
}

impl StreamFactory for FileStreams {
    fn open(&self, slot: SlotId) -> ProbeResult<BoxedWriter> {
        open_output(&self.path_for(slot))
    }

    fn describe(&self, slot: SlotId) -> String {
        self.path_for(slot).display().to_string()
    }
}

/// Cloneable in-memory writer; every clone appends to the same buffer
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<SpinLock<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    /// Contents as text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory per-slot streams, for hosts that consume records directly
#[derive(Default)]
pub struct MemoryStreams {
    buffers: SpinLock<HashMap<SlotId, SharedBuffer>>,
}

impl MemoryStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer behind `slot`'s stream, if it was opened
    pub fn buffer(&self, slot: SlotId) -> Option<SharedBuffer> {
        self.buffers.lock().get(&slot).cloned()
    }
}

impl StreamFactory for MemoryStreams {
    fn open(&self, slot: SlotId) -> ProbeResult<BoxedWriter> {
        let buffer = self.buffers.lock().entry(slot).or_default().clone();
        Ok(Box::new(buffer))
    }

    fn describe(&self, slot: SlotId) -> String {
        format!("memory:{}", slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stream_naming() {
        let streams = FileStreams::new("/tmp/pinatrace");
        assert_eq!(streams.path_for(SlotId::new(3)), PathBuf::from("/tmp/pinatrace_3.out"));
        assert_eq!(streams.describe(SlotId::new(0)), "/tmp/pinatrace_0.out");
    }

    #[test]
    fn test_open_failure_is_io_error() {
        let streams = FileStreams::new("/nonexistent-memprobe-dir/trace");
        match streams.open(SlotId::new(0)) {
            Err(ProbeError::Io { path, .. }) => assert!(path.ends_with("trace_0.out")),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("opened a file in a missing directory"),
        }
    }

    #[test]
    fn test_shared_buffer_clones_share() {
        let buf = SharedBuffer::new();
        let mut w = buf.clone();
        write!(w, "0x10: R 0x20\n").unwrap();
        assert_eq!(buf.text(), "0x10: R 0x20\n");
        assert_eq!(buf.contents().len(), 13);
    }

    #[test]
    fn test_memory_streams() {
        let streams = MemoryStreams::new();
        let mut w = streams.open(SlotId::new(1)).unwrap();
        w.write_all(b"hello").unwrap();
        assert_eq!(streams.buffer(SlotId::new(1)).unwrap().text(), "hello");
        assert!(streams.buffer(SlotId::new(0)).is_none());
    }

    #[test]
    fn test_open_output_file() {
        let path = std::env::temp_dir().join(format!("memprobe-output-{}.out", std::process::id()));
        {
            let mut w = open_output(&path).unwrap();
            w.write_all(b"1000 3\n").unwrap();
            w.flush().unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1000 3\n");
        std::fs::remove_file(&path).unwrap();
    }
}
