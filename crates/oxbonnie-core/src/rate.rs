//! Throughput and IOPS calculations.

use crate::controller::RunResult;
use crate::error::BenchError;
use std::time::Duration;

/// Shortest duration a rate may be computed over.
pub const MIN_MEASURABLE: Duration = Duration::from_micros(1);

/// Unit for byte throughput. Binary and decimal megabytes differ by ~4.9%,
/// so the unit is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteUnit {
    /// 2^20 bytes (MiB/s)
    Mebibytes,
    /// 10^6 bytes (MB/s)
    Megabytes,
}

impl ByteUnit {
    /// Number of bytes in one unit.
    pub fn bytes(&self) -> f64 {
        match self {
            Self::Mebibytes => 1_048_576.0,
            Self::Megabytes => 1_000_000.0,
        }
    }

    /// Rate suffix for display.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Mebibytes => "MiB/s",
            Self::Megabytes => "MB/s",
        }
    }
}

/// `bytes / elapsed`, in `unit` per second.
pub fn throughput(bytes: u64, elapsed: Duration, unit: ByteUnit) -> Result<f64, BenchError> {
    let secs = measurable_secs(elapsed)?;
    Ok(bytes as f64 / secs / unit.bytes())
}

/// Operations per second.
pub fn iops(operations: u64, elapsed: Duration) -> Result<f64, BenchError> {
    let secs = measurable_secs(elapsed)?;
    Ok(operations as f64 / secs)
}

fn measurable_secs(elapsed: Duration) -> Result<f64, BenchError> {
    if elapsed < MIN_MEASURABLE {
        return Err(BenchError::InvalidMeasurement {
            elapsed,
            minimum: MIN_MEASURABLE,
        });
    }
    Ok(elapsed.as_secs_f64())
}

/// Totals over a sequence of runs.
///
/// Rates divide summed bytes (or operations) by summed stage durations, so
/// longer runs weigh more than in a mean of per-run rates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AggregateRates {
    /// Number of runs aggregated.
    pub runs: usize,
    pub written_bytes: u64,
    pub written_duration: Duration,
    pub read_bytes: u64,
    pub read_duration: Duration,
    pub io_operations: u64,
    pub io_duration: Duration,
}

impl AggregateRates {
    /// Sum the measurements of `results`.
    pub fn from_results(results: &[RunResult]) -> Self {
        results.iter().fold(Self::default(), |mut acc, run| {
            acc.runs += 1;
            acc.written_bytes += run.written_bytes;
            acc.written_duration += run.written_duration;
            acc.read_bytes += run.read_bytes;
            acc.read_duration += run.read_duration;
            acc.io_operations += run.io_operations;
            acc.io_duration += run.io_duration;
            acc
        })
    }

    pub fn write_throughput(&self, unit: ByteUnit) -> Result<f64, BenchError> {
        throughput(self.written_bytes, self.written_duration, unit)
    }

    pub fn read_throughput(&self, unit: ByteUnit) -> Result<f64, BenchError> {
        throughput(self.read_bytes, self.read_duration, unit)
    }

    pub fn iops(&self) -> Result<f64, BenchError> {
        iops(self.io_operations, self.io_duration)
    }
}
