//! Benchmark controller.
//!
//! Drives `{write → read → IOPS} × runs` with the cache invalidator running
//! for the whole window. Any stage error ends the benchmark; a failed run
//! contributes no [`RunResult`].

use crate::block::RandomBlock;
use crate::cache::{CacheClearer, CacheInvalidator};
use crate::config::{BenchmarkConfig, BLOCK_SIZE};
use crate::error::BenchError;
use crate::rate::{self, ByteUnit};
use crate::stage::{self, StageOutcome};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Measurements from one complete write → read → IOPS cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// Zero-based run index.
    pub run: usize,
    pub written_bytes: u64,
    pub written_duration: Duration,
    pub read_bytes: u64,
    pub read_duration: Duration,
    pub io_operations: u64,
    pub io_duration: Duration,
}

impl RunResult {
    pub fn write_throughput(&self, unit: ByteUnit) -> Result<f64, BenchError> {
        rate::throughput(self.written_bytes, self.written_duration, unit)
    }

    pub fn read_throughput(&self, unit: ByteUnit) -> Result<f64, BenchError> {
        rate::throughput(self.read_bytes, self.read_duration, unit)
    }

    pub fn iops(&self) -> Result<f64, BenchError> {
        rate::iops(self.io_operations, self.io_duration)
    }
}

/// Progress update delivered after each completed stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Run the stage belonged to.
    pub run: usize,
    /// What the stage measured.
    pub outcome: StageOutcome,
}

/// Benchmark controller.
///
/// Owns the configuration and the cache-clear primitive. The random block is
/// generated once per [`run`](Self::run) call and shared read-only by all
/// stages of all runs.
pub struct Benchmark {
    config: BenchmarkConfig,
    clearer: Arc<dyn CacheClearer>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl Benchmark {
    /// Create a controller.
    pub fn new(config: BenchmarkConfig, clearer: impl CacheClearer + 'static) -> Self {
        Self {
            config,
            clearer: Arc::new(clearer),
            interrupt: None,
        }
    }

    /// Stop before the next stage once `flag` becomes true.
    ///
    /// Stages already in flight always complete; the benchmark then returns
    /// [`BenchError::Interrupted`].
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run the benchmark to completion.
    pub fn run(&self) -> Result<Vec<RunResult>, BenchError> {
        self.run_with_observer(&|_| {})
    }

    /// Run the benchmark, calling `observer` after every stage.
    pub fn run_with_observer(
        &self,
        observer: &dyn Fn(&StageReport),
    ) -> Result<Vec<RunResult>, BenchError> {
        let config = &self.config;
        config.validate()?;

        std::fs::create_dir_all(&config.working_dir).map_err(|e| {
            BenchError::setup(
                format!(
                    "failed to create working directory {}",
                    config.working_dir.display()
                ),
                e,
            )
        })?;

        let start = Instant::now();
        // Unrepresentable deadline: run until interrupted
        let finish = start.checked_add(config.run_duration);
        let block = RandomBlock::generate(BLOCK_SIZE, config.seed.into())?;
        let mut invalidator =
            CacheInvalidator::start(Arc::clone(&self.clearer), config.cache_interval)?;

        tracing::info!(
            "Benchmark starting: {} workers, {} bytes per run, IOPS for {:?}, {} runs / {:?}",
            config.workers,
            config.aggregate_size,
            config.iops_duration,
            config.runs,
            config.run_duration
        );

        let mut results: Vec<RunResult> = Vec::with_capacity(config.runs.max(1));
        loop {
            let run = results.len();
            let outcome = self.run_once(run, &block, observer);
            self.remove_worker_files(run);
            let result = outcome?;

            tracing::info!(
                "Run {} complete: wrote {} bytes in {:?}, read {} bytes in {:?}, {} ops in {:?}",
                run,
                result.written_bytes,
                result.written_duration,
                result.read_bytes,
                result.read_duration,
                result.io_operations,
                result.io_duration
            );
            results.push(result);

            if results.len() >= config.runs && finish.is_some_and(|f| Instant::now() >= f) {
                break;
            }
        }

        invalidator.stop();
        Ok(results)
    }

    fn run_once(
        &self,
        run: usize,
        block: &RandomBlock,
        observer: &dyn Fn(&StageReport),
    ) -> Result<RunResult, BenchError> {
        let write = self.stage(run, observer, || stage::sequential_write(&self.config, run, block))?;
        let read = self.stage(run, observer, || stage::sequential_read(&self.config, run, block))?;
        let io = self.stage(run, observer, || stage::random_io(&self.config, run, block))?;

        Ok(RunResult {
            run,
            written_bytes: write.0,
            written_duration: write.1,
            read_bytes: read.0,
            read_duration: read.1,
            io_operations: io.0,
            io_duration: io.1,
        })
    }

    /// Run one stage after the interrupt check and report it.
    fn stage(
        &self,
        run: usize,
        observer: &dyn Fn(&StageReport),
        stage_fn: impl FnOnce() -> Result<StageOutcome, BenchError>,
    ) -> Result<(u64, Duration), BenchError> {
        if self.interrupted() {
            tracing::info!("Interrupt requested, stopping before next stage of run {}", run);
            return Err(BenchError::Interrupted);
        }

        let outcome = stage_fn()?;
        let measured = (outcome.total, outcome.elapsed);
        observer(&StageReport { run, outcome });
        Ok(measured)
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn remove_worker_files(&self, run: usize) {
        for worker in 0..self.config.workers {
            let path = self.config.worker_file_path(run, worker);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

impl std::fmt::Debug for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Benchmark")
            .field("config", &self.config)
            .field("interruptible", &self.interrupt.is_some())
            .finish_non_exhaustive()
    }
}

/// Run a benchmark with `config`, invalidating caches through `clearer`.
///
/// Synchronous: returns once every configured run has completed or the
/// first fatal error occurred.
pub fn run_benchmark(
    config: BenchmarkConfig,
    clearer: impl CacheClearer + 'static,
) -> Result<Vec<RunResult>, BenchError> {
    Benchmark::new(config, clearer).run()
}
