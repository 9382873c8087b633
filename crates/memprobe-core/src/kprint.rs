//! Diagnostic logging for memprobe tools
//!
//! Diagnostics go to stderr so they never interleave with the tool's own
//! record streams. Every line is written under the stderr lock, which
//! keeps lines from concurrent execution contexts whole.
//!
//! # Environment Variables
//!
//! - `MPR_FLUSH_EPRINT=1` - Flush stderr after each print (useful when the host dies abruptly)
//! - `MPR_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace (or 0-5)
//!
//! # Usage
//!
//! ```ignore
//! use memprobe_core::{kinfo, kdebug, kerror};
//!
//! kinfo!("tool {} ready", name);
//! kdebug!("thread {} -> slot {}", ctx, slot);
//! kerror!("maximum number of threads exceeded");
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Diagnostic levels, most severe first
///
/// What each level carries:
/// - `Error`: the thread ceiling being hit, right before the run aborts
/// - `Warn`: failed record writes, exit notices for unknown contexts
/// - `Info`: tool construction and the program-exit summary
/// - `Debug`: thread start and exit
/// - `Trace`: epoch boundaries; the only level reachable from the hot path
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Parse a level name or digit; unknown input yields `None`
    pub fn parse(s: &str) -> Option<Self> {
        let level = match s.trim().to_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            "trace" | "5" => LogLevel::Trace,
            _ => return None,
        };
        Some(level)
    }

    /// Line tag; padded so messages line up in a merged stderr
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[memprobe ERROR]",
            LogLevel::Warn => "[memprobe WARN] ",
            LogLevel::Info => "[memprobe INFO] ",
            LogLevel::Debug => "[memprobe DEBUG]",
            LogLevel::Trace => "[memprobe TRACE]",
        }
    }
}

static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Read `MPR_LOG_LEVEL` and `MPR_FLUSH_EPRINT`
///
/// Runs on the first log call. A host that changes its environment while
/// starting up can call it explicitly to pin the moment it is read.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    if let Ok(val) = std::env::var("MPR_FLUSH_EPRINT") {
        let flush = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        FLUSH_ENABLED.store(flush, Ordering::Relaxed);
    }

    if let Ok(val) = std::env::var("MPR_LOG_LEVEL") {
        let level = LogLevel::parse(&val).unwrap_or(LogLevel::Info);
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
}

#[inline]
pub fn flush_enabled() -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    FLUSH_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn log_level() -> LogLevel {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Override `MPR_LOG_LEVEL`; tests use it to silence expected errors
pub fn set_log_level(level: LogLevel) {
    // Consume the environment first so a later lazy init can't undo this
    init();
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Override `MPR_FLUSH_EPRINT`
pub fn set_flush_enabled(enabled: bool) {
    init();
    FLUSH_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Whether messages at `level` are currently written
#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level as u8 <= log_level() as u8
}

/// One whole line under the stderr lock, tagged when `level` is given
fn write_line(level: Option<LogLevel>, args: std::fmt::Arguments<'_>) {
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = match level {
        Some(level) => writeln!(handle, "{} {}", level.prefix(), args),
        None => writeln!(handle, "{}", args),
    };
    if flush_enabled() {
        let _ = handle.flush();
    }
}

#[doc(hidden)]
pub fn _kprintln_impl(args: std::fmt::Arguments<'_>) {
    write_line(None, args);
}

#[doc(hidden)]
pub fn _klog_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if level_enabled(level) {
        write_line(Some(level), args);
    }
}

// ============================================================================
// Public Macros
// ============================================================================

/// Untagged stderr line, written regardless of the log level
#[macro_export]
macro_rules! kprintln {
    () => {{
        $crate::kprint::_kprintln_impl(format_args!(""));
    }};
    ($($arg:tt)*) => {{
        $crate::kprint::_kprintln_impl(format_args!($($arg)*));
    }};
}

/// Condition that ends the run; logged before the panic
#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Error,
            format_args!($($arg)*)
        );
    }};
}

/// Records lost or notifications ignored; the run continues
#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Warn,
            format_args!($($arg)*)
        );
    }};
}

/// Once-per-run events: tool setup and exit summaries
#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Info,
            format_args!($($arg)*)
        );
    }};
}

/// Per-thread lifecycle events
#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl(
            $crate::kprint::LogLevel::Debug,
            format_args!($($arg)*)
        );
    }};
}

/// Epoch-level events; checks the level before formatting, so it is safe
/// to leave on hot paths
#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        if $crate::kprint::level_enabled($crate::kprint::LogLevel::Trace) {
            $crate::kprint::_klog_impl(
                $crate::kprint::LogLevel::Trace,
                format_args!($($arg)*)
            );
        }
    }};
}
