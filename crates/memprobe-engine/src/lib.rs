//! # memprobe-engine
//!
//! Concurrent aggregation of per-instruction memory-access events.
//!
//! Everything here runs inline on the instrumented program's own threads:
//! there is no worker pool and no background flusher. The crate provides:
//! - Epoch gate over per-slot instruction counters
//! - Deduplicated dirty-page set, cleared at each epoch boundary
//! - Per-thread footprint tables, read out at exit
//! - Per-thread access trace streams
//! - The three tool variants built on them
//!
//! ## Locks
//!
//! | State | Writers | Synchronization |
//! |---|---|---|
//! | dirty page set | all contexts | page lock, lock-free presence check first |
//! | epoch baseline | all contexts | epoch lock, unlocked pre-check first |
//! | instruction counter `i` | context `i` | none |
//! | footprint table `i` | context `i` | uncontended per-slot lock |
//! | thread registry | thread start/exit | registry lock |
//!
//! Lock order: epoch lock, then output lock, then page lock.

pub mod config;
pub mod epoch;
pub mod dirty_pages;
pub mod footprint;
pub mod access_log;
pub mod output;
pub mod tools;

// Re-exports
pub use config::{ProbeConfig, ToolKind};
pub use epoch::{EpochBoundary, EpochGate};
pub use dirty_pages::DirtyPageSet;
pub use footprint::{AccessStat, FootprintSummary, FootprintTable, ThreadFootprint};
pub use access_log::{AccessKind, AccessLogger};
pub use output::{BoxedWriter, FileStreams, MemoryStreams, SharedBuffer, StreamFactory};
pub use tools::{DirtyPageTool, FootprintTool, TraceTool, WindowSnapshot};
