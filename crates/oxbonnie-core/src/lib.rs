//! Storage benchmark engine.
//!
//! Measures sequential write throughput, sequential read throughput and
//! random small-operation IOPS against a directory, using one OS thread per
//! configured worker so that the device (not a single submission queue) is
//! the bottleneck.
//!
//! # Components
//!
//! - [`RandomBlock`] - the 64 KiB pseudorandom payload, written tiled into
//!   every worker file and used as the read-back integrity vector
//! - [`pool::run_concurrent`] - fan-out/fan-in over N worker threads
//! - [`stage`] - the write, read and IOPS stages
//! - [`CacheInvalidator`] - background loop that drops the OS page cache
//! - [`Benchmark`] / [`run_benchmark`] - the controller that drives runs
//! - [`rate`] - throughput and IOPS conversions
//!
//! # Example
//!
//! ```no_run
//! use oxbonnie_core::{BenchmarkConfig, NoopCacheClearer, run_benchmark};
//! use std::time::Duration;
//!
//! let config = BenchmarkConfig::new("/tmp/oxbonnie".into(), 8 << 30)
//!     .with_workers(4)
//!     .with_aggregate_size(64 << 20)
//!     .with_iops_duration(Duration::from_secs(1));
//!
//! let results = run_benchmark(config, NoopCacheClearer)?;
//! for run in &results {
//!     println!("write: {:.2} MB/s", run.write_throughput(oxbonnie_core::ByteUnit::Megabytes)?);
//! }
//! # Ok::<(), oxbonnie_core::BenchError>(())
//! ```

pub mod block;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod pool;
pub mod rate;
pub mod stage;

pub use block::{BlockSource, RandomBlock};
pub use cache::{CacheClearer, CacheInvalidator, NoopCacheClearer};
pub use config::{BenchmarkConfig, BLOCK_SIZE, DEFAULT_CACHE_INTERVAL, IOPS_OP_SIZE};
pub use controller::{run_benchmark, Benchmark, RunResult, StageReport};
pub use error::{BenchError, ErrorCategory, IntegrityFailure};
pub use pool::WorkerOutcome;
pub use rate::{AggregateRates, ByteUnit};
pub use stage::{StageKind, StageOutcome};
