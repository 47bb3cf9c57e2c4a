//! Benchmark configuration.

use crate::error::BenchError;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Size of the random payload block and of sequential read chunks (64 KiB).
pub const BLOCK_SIZE: usize = 1 << 16;

/// Size and alignment of each IOPS operation (4 KiB).
pub const IOPS_OP_SIZE: usize = 4096;

/// Interval between buffer-cache invalidations.
pub const DEFAULT_CACHE_INTERVAL: Duration = Duration::from_secs(3);

/// Default duration of the IOPS stage.
pub const DEFAULT_IOPS_DURATION: Duration = Duration::from_secs(15);

/// Configuration for a benchmark controller.
///
/// Immutable once handed to [`crate::Benchmark::new`]. Construct with
/// [`BenchmarkConfig::new`] and adjust with the `with_*` builders.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Total physical memory of the host, in bytes.
    pub physical_memory: u64,
    /// Number of concurrent workers (one file each).
    pub workers: usize,
    /// Bytes written across all workers in one run.
    pub aggregate_size: u64,
    /// Wall-clock duration of the IOPS stage.
    pub iops_duration: Duration,
    /// Directory receiving the worker files.
    pub working_dir: PathBuf,
    /// Minimum number of runs.
    pub runs: usize,
    /// Keep starting runs until this much time has passed since start.
    pub run_duration: Duration,
    /// Seed for the random block and IOPS offsets; `None` uses OS entropy.
    pub seed: Option<u64>,
    /// `fsync` each file at the end of the write stage.
    pub fsync: bool,
    /// Interval of the cache invalidation loop.
    pub cache_interval: Duration,
}

impl BenchmarkConfig {
    /// Create a configuration with defaults derived from the host.
    ///
    /// Workers default to the available parallelism and the aggregate size
    /// to twice the physical memory, so the data set cannot fit in the page
    /// cache.
    pub fn new(working_dir: PathBuf, physical_memory: u64) -> Self {
        Self {
            physical_memory,
            workers: default_workers(),
            aggregate_size: physical_memory.saturating_mul(2),
            iops_duration: DEFAULT_IOPS_DURATION,
            working_dir,
            runs: 1,
            run_duration: Duration::ZERO,
            seed: None,
            fsync: true,
            cache_interval: DEFAULT_CACHE_INTERVAL,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_aggregate_size(mut self, bytes: u64) -> Self {
        self.aggregate_size = bytes;
        self
    }

    pub fn with_iops_duration(mut self, duration: Duration) -> Self {
        self.iops_duration = duration;
        self
    }

    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_run_duration(mut self, duration: Duration) -> Self {
        self.run_duration = duration;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn with_cache_interval(mut self, interval: Duration) -> Self {
        self.cache_interval = interval;
        self
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.workers == 0 {
            return Err(BenchError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.aggregate_size == 0 {
            return Err(BenchError::InvalidConfig(
                "aggregate test size must be greater than zero".to_string(),
            ));
        }
        if Instant::now().checked_add(self.iops_duration).is_none() {
            return Err(BenchError::InvalidConfig(format!(
                "IOPS duration {:?} is too long to schedule",
                self.iops_duration
            )));
        }
        if self.cache_interval.is_zero() {
            return Err(BenchError::InvalidConfig(
                "cache invalidation interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Bytes assigned to `worker`.
    ///
    /// Every worker gets `aggregate_size / workers`; the last worker also
    /// takes the remainder, so the sizes always sum to `aggregate_size`.
    pub fn worker_file_size(&self, worker: usize) -> u64 {
        worker_file_size(self.aggregate_size, self.workers, worker)
    }

    /// Path of the file owned by `worker` during `run`.
    pub fn worker_file_path(&self, run: usize, worker: usize) -> PathBuf {
        worker_file_path(&self.working_dir, run, worker)
    }
}

pub(crate) fn worker_file_size(aggregate: u64, workers: usize, worker: usize) -> u64 {
    let workers = workers as u64;
    let base = aggregate / workers;
    if worker as u64 == workers - 1 {
        base + aggregate % workers
    } else {
        base
    }
}

pub(crate) fn worker_file_path(dir: &Path, run: usize, worker: usize) -> PathBuf {
    dir.join(format!("oxbonnie.{run}.{worker}"))
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> BenchmarkConfig {
        BenchmarkConfig::new(PathBuf::from("/tmp/oxbonnie-test"), 1 << 30)
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.aggregate_size, 2 << 30);
        assert!(config.workers >= 1);
        assert_eq!(config.runs, 1);
        assert_eq!(config.run_duration, Duration::ZERO);
        assert_eq!(config.iops_duration, Duration::from_secs(15));
        assert_eq!(config.cache_interval, Duration::from_secs(3));
        assert!(config.fsync);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let err = config().with_workers(0).validate().unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_zero_size() {
        let err = config().with_aggregate_size(0).validate().unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_unschedulable_iops_duration() {
        let err = config()
            .with_iops_duration(Duration::from_secs(u64::MAX))
            .validate()
            .unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_accepts_huge_run_duration() {
        let config = config().with_run_duration(Duration::from_secs(u64::MAX));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_last_worker_absorbs_remainder() {
        let config = config().with_workers(3).with_aggregate_size(10);
        assert_eq!(config.worker_file_size(0), 3);
        assert_eq!(config.worker_file_size(1), 3);
        assert_eq!(config.worker_file_size(2), 4);
    }

    #[test]
    fn test_fewer_bytes_than_workers() {
        let config = config().with_workers(4).with_aggregate_size(3);
        let sizes: Vec<u64> = (0..4).map(|w| config.worker_file_size(w)).collect();
        assert_eq!(sizes, vec![0, 0, 0, 3]);
    }

    #[test]
    fn test_worker_file_path_is_per_run_and_worker() {
        let config = config();
        let a = config.worker_file_path(0, 1);
        let b = config.worker_file_path(1, 1);
        let c = config.worker_file_path(0, 2);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, config.worker_file_path(0, 1));
        assert!(a.starts_with("/tmp/oxbonnie-test"));
    }

    proptest! {
        #[test]
        fn prop_worker_sizes_sum_to_aggregate(
            workers in 1usize..256,
            aggregate in 1u64..(1u64 << 40),
        ) {
            let total: u64 = (0..workers)
                .map(|w| worker_file_size(aggregate, workers, w))
                .sum();
            prop_assert_eq!(total, aggregate);
        }
    }
}
