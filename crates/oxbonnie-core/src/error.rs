//! Error types for the benchmark engine.
//!
//! Every fatal condition surfaces as a [`BenchError`]. Callers that need to
//! react differently to environment problems and correctness problems use
//! [`BenchError::category`] instead of matching on message text.

use crate::stage::StageKind;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Errors produced while configuring or running a benchmark.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The configuration violates an invariant (zero workers, zero size).
    #[error("Invalid benchmark configuration: {0}")]
    InvalidConfig(String),

    /// Preparing the benchmark failed before any stage ran.
    #[error("Benchmark setup failed: {context}")]
    Setup {
        /// What was being prepared
        context: String,
        #[source]
        source: io::Error,
    },

    /// The OS entropy source could not seed the random block.
    #[error("Random source unavailable: {0}")]
    EntropyUnavailable(String),

    /// A worker's create/open/read/write/flush failed.
    #[error("{stage} worker {worker} failed on {}: {source}", path.display())]
    Io {
        /// Stage the worker belonged to
        stage: StageKind,
        /// Worker index
        worker: usize,
        /// File the worker was operating on
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Read-back content did not match what the write stage produced.
    #[error("Integrity check failed for worker {worker} ({}): {failure}", path.display())]
    Integrity {
        /// Worker index
        worker: usize,
        /// File that failed verification
        path: PathBuf,
        /// What did not match
        failure: IntegrityFailure,
    },

    /// A worker thread panicked instead of returning.
    #[error("{stage} worker {worker} panicked")]
    WorkerPanicked {
        /// Stage the worker belonged to
        stage: StageKind,
        /// Worker index
        worker: usize,
    },

    /// A rate was requested for a duration too short to be meaningful.
    #[error("Invalid measurement: elapsed time {elapsed:?} is below the {minimum:?} resolution")]
    InvalidMeasurement {
        /// The measured duration
        elapsed: Duration,
        /// Smallest duration accepted by the rate calculators
        minimum: Duration,
    },

    /// The benchmark was stopped by an interrupt request between stages.
    #[error("Benchmark interrupted")]
    Interrupted,
}

/// The specific mismatch found by the read stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityFailure {
    /// The last full block differs from the random block.
    LastBlockMismatch {
        /// File offset of the block
        offset: u64,
    },
    /// The trailing partial block differs from the random block's prefix.
    TailMismatch {
        /// File offset of the tail
        offset: u64,
        /// Length of the tail
        len: usize,
    },
    /// The file does not hold the number of bytes that were written.
    LengthMismatch {
        /// Bytes the write stage produced
        expected: u64,
        /// Bytes actually read back
        actual: u64,
    },
}

impl fmt::Display for IntegrityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastBlockMismatch { offset } => {
                write!(f, "last block at offset {offset} does not match the written block")
            }
            Self::TailMismatch { offset, len } => {
                write!(f, "{len}-byte tail at offset {offset} does not match the written block")
            }
            Self::LengthMismatch { expected, actual } => {
                write!(f, "read {actual} bytes, expected {expected}")
            }
        }
    }
}

/// Broad classification of a [`BenchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Could not prepare the benchmark (config, directory, entropy, threads)
    Setup,
    /// Environment failure during a stage
    Io,
    /// Data read back was not the data written
    Integrity,
    /// A rate could not be computed
    Measurement,
    /// Stopped on request
    Interrupted,
}

impl BenchError {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig(_) | Self::Setup { .. } | Self::EntropyUnavailable(_) => {
                ErrorCategory::Setup
            }
            Self::Io { .. } | Self::WorkerPanicked { .. } => ErrorCategory::Io,
            Self::Integrity { .. } => ErrorCategory::Integrity,
            Self::InvalidMeasurement { .. } => ErrorCategory::Measurement,
            Self::Interrupted => ErrorCategory::Interrupted,
        }
    }

    pub(crate) fn setup(context: impl Into<String>, source: io::Error) -> Self {
        Self::Setup {
            context: context.into(),
            source,
        }
    }
}
