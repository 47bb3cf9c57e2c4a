//! Benchmark stages.
//!
//! Each stage fans out one worker per file through [`crate::pool`], joins
//! them, and reports the summed count together with the wall-clock time of
//! the whole parallel phase. Stages never overlap.

mod iops;
mod read;
mod write;

pub use iops::{random_io, WRITE_EVERY};
pub use read::sequential_read;
pub use write::sequential_write;

use crate::pool::WorkerOutcome;
use std::time::Duration;

/// The three stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Sequential write of every worker file
    Write,
    /// Sequential read-back with integrity check
    Read,
    /// Random 4 KiB reads and writes for a fixed duration
    Iops,
}

impl StageKind {
    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Write => "Sequential Write",
            Self::Read => "Sequential Read",
            Self::Iops => "IOPS",
        }
    }

    /// Short lowercase name, used for thread names.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Read => "read",
            Self::Iops => "iops",
        }
    }

    /// Whether the stage counts bytes (as opposed to operations).
    pub fn counts_bytes(&self) -> bool {
        matches!(self, Self::Write | Self::Read)
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of one stage across all workers.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// Which stage produced this outcome.
    pub kind: StageKind,
    /// Bytes (write/read) or operations (IOPS) summed over workers.
    pub total: u64,
    /// From before the first worker started to after the last one joined.
    pub elapsed: Duration,
    /// Per-worker outcomes, in worker-index order.
    pub workers: Vec<WorkerOutcome>,
}

impl StageOutcome {
    fn from_workers(kind: StageKind, workers: Vec<WorkerOutcome>, elapsed: Duration) -> Self {
        Self {
            kind,
            total: workers.iter().map(|w| w.count).sum(),
            elapsed,
            workers,
        }
    }
}
