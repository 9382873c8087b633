//! Error types for the memprobe engine

use core::fmt;
use std::io;

use crate::id::SlotId;

/// Result type for engine operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while building or running a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// More live contexts than the configured ceiling
    ThreadCeilingExceeded {
        /// Configured ceiling
        max: usize,
    },

    /// Exit notification for a context that was never registered
    UnknownContext(u64),

    /// Slot index outside the per-thread storage
    InvalidSlot(SlotId),

    /// Output stream could not be opened, written or flushed
    Io {
        /// Stream the failure happened on
        path: String,
        /// Underlying error kind
        kind: io::ErrorKind,
    },

    /// Configuration rejected by validation
    InvalidConfig(&'static str),
}

impl ProbeError {
    /// Wrap an I/O error together with the stream it happened on
    pub fn io(path: impl Into<String>, err: &io::Error) -> Self {
        ProbeError::Io {
            path: path.into(),
            kind: err.kind(),
        }
    }

    /// Whether the condition can only end the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProbeError::ThreadCeilingExceeded { .. } | ProbeError::Io { .. })
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::ThreadCeilingExceeded { max } => {
                write!(f, "maximum number of threads exceeded ({})", max)
            }
            ProbeError::UnknownContext(ctx) => write!(f, "unknown thread context {}", ctx),
            ProbeError::InvalidSlot(slot) => write!(f, "invalid slot {}", slot),
            ProbeError::Io { path, kind } => write!(f, "i/o error on {}: {}", path, kind),
            ProbeError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = ProbeError::ThreadCeilingExceeded { max: 8 };
        assert_eq!(format!("{}", e), "maximum number of threads exceeded (8)");

        let e = ProbeError::InvalidConfig("page_size must be non-zero");
        assert_eq!(format!("{}", e), "invalid configuration: page_size must be non-zero");
    }

    #[test]
    fn test_io_conversion() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let e = ProbeError::io("/tmp/out", &err);
        assert!(matches!(
            e,
            ProbeError::Io { ref path, kind: io::ErrorKind::PermissionDenied } if path == "/tmp/out"
        ));
        assert!(e.is_fatal());
        assert!(!ProbeError::UnknownContext(3).is_fatal());
    }
}
