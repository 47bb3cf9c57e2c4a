//! End-to-end tests for the benchmark pipeline.
//!
//! These run real write/read/IOPS stages against scratch directories, so
//! sizes are kept in the low megabytes and IOPS windows short.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p oxbonnie-core --test pipeline_tests
//! ```

use oxbonnie_core::stage::{random_io, sequential_read, sequential_write};
use oxbonnie_core::{
    BenchError, Benchmark, BenchmarkConfig, BlockSource, ByteUnit, CacheClearer, ErrorCategory,
    IntegrityFailure, NoopCacheClearer, RandomBlock, StageKind, BLOCK_SIZE, run_benchmark,
};
use std::io::{self, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const MIB: u64 = 1024 * 1024;

// ============================================================================
// Test Helpers
// ============================================================================

fn config(dir: &TempDir, workers: usize, size: u64) -> BenchmarkConfig {
    BenchmarkConfig::new(dir.path().to_path_buf(), 8 << 30)
        .with_workers(workers)
        .with_aggregate_size(size)
        .with_iops_duration(Duration::from_millis(100))
        .with_fsync(false)
        .with_seed(Some(42))
}

fn seeded_block() -> RandomBlock {
    RandomBlock::generate(BLOCK_SIZE, BlockSource::Seeded(42)).unwrap()
}

struct CountingClearer(Arc<AtomicUsize>);

impl CacheClearer for CountingClearer {
    fn clear_buffer_cache(&self) -> io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Stage pipeline
// ============================================================================

#[test]
fn four_workers_split_four_mebibytes() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 4, 4 * MIB).with_iops_duration(Duration::from_secs(1));
    let block = seeded_block();

    let write = sequential_write(&config, 0, &block).unwrap();
    assert_eq!(write.kind, StageKind::Write);
    assert_eq!(write.total, 4 * MIB);
    assert_eq!(write.workers.len(), 4);
    for worker in 0..4 {
        let len = std::fs::metadata(config.worker_file_path(0, worker))
            .unwrap()
            .len();
        assert_eq!(len, MIB);
    }

    let read = sequential_read(&config, 0, &block).unwrap();
    assert_eq!(read.total, 4 * MIB);

    let iops = random_io(&config, 0, &block).unwrap();
    assert!(iops.total > 0);
    assert!(iops.elapsed >= Duration::from_secs(1));
    assert!(iops.elapsed < Duration::from_secs(3), "took {:?}", iops.elapsed);

    // Random writes keep the files verifiable
    assert_eq!(sequential_read(&config, 0, &block).unwrap().total, 4 * MIB);
}

#[test]
fn single_worker_gets_everything() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 1, 3 * MIB);
    let block = seeded_block();

    let write = sequential_write(&config, 0, &block).unwrap();
    assert_eq!(write.workers.len(), 1);
    assert_eq!(write.workers[0].count, 3 * MIB);
    assert_eq!(sequential_read(&config, 0, &block).unwrap().total, 3 * MIB);
}

#[test]
fn remainder_goes_to_last_worker() {
    let dir = TempDir::new().unwrap();
    let size = 3 * BLOCK_SIZE as u64 + 1234;
    let config = config(&dir, 3, size);
    let block = seeded_block();

    let write = sequential_write(&config, 0, &block).unwrap();
    let counts: Vec<u64> = write.workers.iter().map(|w| w.count).collect();
    assert_eq!(counts.iter().sum::<u64>(), size);
    assert_eq!(counts[0], counts[1]);
    assert_eq!(counts[2], counts[0] + size % 3);

    assert_eq!(sequential_read(&config, 0, &block).unwrap().total, size);
}

#[test]
fn more_workers_than_bytes() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 4, 3);
    let block = seeded_block();

    assert_eq!(sequential_write(&config, 0, &block).unwrap().total, 3);
    assert_eq!(sequential_read(&config, 0, &block).unwrap().total, 3);
    random_io(&config, 0, &block).unwrap();
}

#[test]
fn rewriting_a_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 2, 2 * MIB);
    let block = seeded_block();

    sequential_write(&config, 0, &block).unwrap();
    let first = std::fs::read(config.worker_file_path(0, 1)).unwrap();
    sequential_write(&config, 0, &block).unwrap();
    let second = std::fs::read(config.worker_file_path(0, 1)).unwrap();

    assert_eq!(first, second);
    assert_eq!(sequential_read(&config, 0, &block).unwrap().total, 2 * MIB);
}

#[test]
fn corrupted_last_block_is_integrity_error() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 2, 2 * MIB);
    let block = seeded_block();
    sequential_write(&config, 0, &block).unwrap();

    let path = config.worker_file_path(0, 1);
    let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::End(-1)).unwrap();
    file.write_all(&[!block[BLOCK_SIZE - 1]]).unwrap();
    drop(file);

    let err = sequential_read(&config, 0, &block).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Integrity);
    match err {
        BenchError::Integrity {
            worker, failure, ..
        } => {
            assert_eq!(worker, 1);
            assert!(matches!(failure, IntegrityFailure::LastBlockMismatch { .. }));
        }
        other => panic!("expected integrity error, got {other:?}"),
    }
}

#[test]
fn reading_with_a_different_block_fails() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 1, MIB);
    sequential_write(&config, 0, &seeded_block()).unwrap();

    let other = RandomBlock::generate(BLOCK_SIZE, BlockSource::Seeded(43)).unwrap();
    let err = sequential_read(&config, 0, &other).unwrap_err();
    assert!(matches!(err, BenchError::Integrity { .. }));
}

#[test]
fn reading_missing_files_is_io_error() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 2, MIB);

    let err = sequential_read(&config, 0, &seeded_block()).unwrap_err();
    assert!(matches!(
        err,
        BenchError::Io {
            stage: StageKind::Read,
            ..
        }
    ));
}

// ============================================================================
// Controller
// ============================================================================

#[test]
fn full_benchmark_reports_positive_rates() {
    let dir = TempDir::new().unwrap();
    let results = run_benchmark(config(&dir, 2, 2 * MIB).with_runs(2), NoopCacheClearer).unwrap();

    assert_eq!(results.len(), 2);
    for run in &results {
        assert!(run.write_throughput(ByteUnit::Megabytes).unwrap() > 0.0);
        assert!(run.read_throughput(ByteUnit::Mebibytes).unwrap() > 0.0);
        assert!(run.iops().unwrap() > 0.0);
    }
}

#[test]
fn invalidator_runs_during_benchmark() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let config = config(&dir, 2, MIB)
        .with_iops_duration(Duration::from_millis(300))
        .with_cache_interval(Duration::from_millis(20));

    run_benchmark(config, CountingClearer(Arc::clone(&calls))).unwrap();
    let after_run = calls.load(Ordering::SeqCst);
    assert!(after_run >= 2, "clearer called {after_run} times");

    // Stopped with the benchmark
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), after_run);
}

#[test]
fn failing_clearer_does_not_fail_benchmark() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 2, MIB).with_cache_interval(Duration::from_millis(10));
    let clearer = || -> io::Result<()> { Err(io::Error::other("permission denied")) };

    assert_eq!(run_benchmark(config, clearer).unwrap().len(), 1);
}

#[test]
fn interrupted_benchmark_reports_interrupt() {
    let dir = TempDir::new().unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    let benchmark = Benchmark::new(config(&dir, 2, MIB).with_runs(5), NoopCacheClearer)
        .with_interrupt(Arc::clone(&flag));

    let err = benchmark
        .run_with_observer(&|report| {
            if report.run == 1 {
                flag.store(true, Ordering::SeqCst);
            }
        })
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Interrupted);
}

#[test]
fn working_directory_is_created() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");
    let config = BenchmarkConfig {
        working_dir: nested.clone(),
        ..config(&dir, 1, MIB)
    };

    run_benchmark(config, NoopCacheClearer).unwrap();
    assert!(nested.is_dir());
}
