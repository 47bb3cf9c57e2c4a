//! Command-line interface.

use anyhow::{bail, Context, Result};
use clap::Parser;
use oxbonnie_core::BenchmarkConfig;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

const GIB: f64 = 1_073_741_824.0;

/// Storage benchmark: sequential write and read throughput, then random IOPS.
///
/// Every worker thread writes its own file in the target directory, reads it
/// back with verification, then performs random 4 KiB reads and writes for a
/// fixed duration. The OS buffer cache is dropped every few seconds (needs
/// root on Linux and macOS).
#[derive(Parser, Debug)]
#[command(name = "oxbonnie")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print a JSON report to stdout instead of text lines.
    #[arg(long)]
    pub json: bool,

    /// Minimum number of runs.
    #[arg(long, default_value = "1", value_name = "N")]
    pub runs: usize,

    /// Keep starting new runs until at least this many seconds have passed.
    #[arg(long, default_value = "0", value_name = "N")]
    pub seconds: u64,

    /// Number of worker threads.
    ///
    /// Defaults to the number of logical CPUs.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Aggregate test size in GiB, split evenly across workers.
    ///
    /// Defaults to twice the physical memory so the page cache cannot hold
    /// the data set. Clamped to half the free space of --dir.
    #[arg(long, value_name = "GiB")]
    pub size: Option<f64>,

    /// Duration of the IOPS stage, in seconds.
    #[arg(long, default_value = "15", value_name = "SECS")]
    pub iops_duration: f64,

    /// Directory to benchmark. A scratch subdirectory is created inside it.
    ///
    /// Defaults to the system temporary directory.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Seed for the payload block and IOPS offsets (reproducible runs).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Do not fsync files at the end of the write stage.
    #[arg(long)]
    pub no_fsync: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Directory the scratch directory is created in.
    pub fn base_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Physical memory used to size the default test.
    ///
    /// The memory only feeds the `--size` default, so a failed query is
    /// tolerated when `--size` is given.
    pub fn resolve_physical_memory(&self, queried: io::Result<u64>) -> Result<u64> {
        match queried {
            Ok(memory) => Ok(memory),
            Err(e) if self.size.is_some() => {
                tracing::warn!("Could not determine physical memory: {}", e);
                Ok(0)
            }
            Err(e) => Err(e).context("Failed to determine physical memory; pass --size"),
        }
    }

    /// Build the engine configuration.
    ///
    /// `free_space` is the available space of [`base_dir`](Self::base_dir),
    /// when it could be determined.
    pub fn into_config(
        &self,
        working_dir: PathBuf,
        physical_memory: u64,
        free_space: Option<u64>,
    ) -> Result<BenchmarkConfig> {
        let mut config = BenchmarkConfig::new(working_dir, physical_memory)
            .with_runs(self.runs)
            .with_run_duration(Duration::from_secs(self.seconds))
            .with_seed(self.seed)
            .with_fsync(!self.no_fsync);

        if let Some(threads) = self.threads {
            if threads == 0 {
                bail!("--threads must be at least 1");
            }
            config = config.with_workers(threads);
        }

        let iops_duration = match Duration::try_from_secs_f64(self.iops_duration) {
            Ok(d) if !d.is_zero() => d,
            _ => bail!("--iops-duration must be a positive number of seconds"),
        };
        config = config.with_iops_duration(iops_duration);

        if let Some(gib) = self.size {
            config = config.with_aggregate_size(gib_to_bytes(gib)?);
        }

        if let Some(free) = free_space {
            let (size, clamped) = clamp_to_free_space(config.aggregate_size, free);
            if clamped {
                tracing::warn!(
                    "Test size {} exceeds half the free space ({} free), using {}",
                    crate::output::format_size(config.aggregate_size),
                    crate::output::format_size(free),
                    crate::output::format_size(size)
                );
            }
            if size == 0 {
                bail!("Not enough free space in the benchmark directory");
            }
            config = config.with_aggregate_size(size);
        }

        if config.aggregate_size == 0 {
            bail!("Test size must be greater than zero");
        }

        Ok(config)
    }
}

/// Convert a GiB count from the command line to bytes.
pub fn gib_to_bytes(gib: f64) -> Result<u64> {
    if !gib.is_finite() || gib <= 0.0 {
        bail!("--size must be a positive number of GiB");
    }
    let bytes = (gib * GIB).round();
    if bytes >= u64::MAX as f64 {
        bail!("--size is too large");
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(bytes as u64)
}

/// Cap `size` at half of `free`. Returns the size to use and whether it was
/// reduced.
pub fn clamp_to_free_space(size: u64, free: u64) -> (u64, bool) {
    let limit = free / 2;
    if size > limit {
        (limit, true)
    } else {
        (size, false)
    }
}
