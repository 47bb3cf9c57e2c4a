//! Text and JSON result output.

use chrono::{DateTime, Utc};
use oxbonnie_core::rate;
use oxbonnie_core::{AggregateRates, BenchmarkConfig, ByteUnit, RunResult, StageKind, StageReport};
use serde::Serialize;
use std::time::Duration;

/// Result line for a completed stage, e.g. `Sequential Write MB/s: 512.34`.
///
/// `None` when the stage ran too briefly to yield a rate.
pub fn stage_line(report: &StageReport) -> Option<String> {
    let outcome = &report.outcome;
    match outcome.kind {
        StageKind::Write | StageKind::Read => {
            let mb = rate::throughput(outcome.total, outcome.elapsed, ByteUnit::Megabytes).ok()?;
            Some(format!("{} MB/s: {:.2}", outcome.kind, mb))
        }
        StageKind::Iops => {
            let iops = rate::iops(outcome.total, outcome.elapsed).ok()?;
            Some(format!("IOPS: {iops:.0}"))
        }
    }
}

/// Verbose description of a stage with sizes in both binary and decimal units.
pub fn stage_detail(report: &StageReport) -> String {
    let outcome = &report.outcome;
    let amount = if outcome.kind.counts_bytes() {
        format!(
            "{:.2} MiB ({:.2} MB)",
            outcome.total as f64 / ByteUnit::Mebibytes.bytes(),
            outcome.total as f64 / ByteUnit::Megabytes.bytes()
        )
    } else {
        format!("{} operations", outcome.total)
    };
    format!(
        "Run {} {}: {} in {} across {} workers",
        report.run,
        outcome.kind.short_name(),
        amount,
        format_duration(outcome.elapsed),
        outcome.workers.len()
    )
}

/// Summary lines over all runs, printed when more than one run completed.
pub fn summary_lines(results: &[RunResult]) -> Vec<String> {
    let agg = AggregateRates::from_results(results);
    let mut lines = vec![format!("Average over {} runs:", agg.runs)];
    if let Ok(rate) = agg.write_throughput(ByteUnit::Megabytes) {
        lines.push(format!("  Sequential Write MB/s: {rate:.2}"));
    }
    if let Ok(rate) = agg.read_throughput(ByteUnit::Megabytes) {
        lines.push(format!("  Sequential Read MB/s: {rate:.2}"));
    }
    if let Ok(rate) = agg.iops() {
        lines.push(format!("  IOPS: {rate:.0}"));
    }
    lines
}

/// Machine-readable report printed with `--json`.
#[derive(Debug, Serialize)]
pub struct Report {
    pub version: String,
    /// RFC 3339 start time.
    pub started_at: String,
    pub platform: String,
    pub physical_memory: u64,
    pub workers: usize,
    pub aggregate_size_gib: f64,
    pub iops_duration_secs: f64,
    pub fsync: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub runs: Vec<RunReport>,
    pub aggregate: RatesReport,
}

/// One run in the JSON report.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run: usize,
    pub written_bytes: u64,
    pub write_secs: f64,
    pub read_bytes: u64,
    pub read_secs: f64,
    pub io_operations: u64,
    pub iops_secs: f64,
    #[serde(flatten)]
    pub rates: RatesReport,
}

/// Rates; `null` when a stage was too short to measure.
#[derive(Debug, Serialize)]
pub struct RatesReport {
    pub write_mb_per_sec: Option<f64>,
    pub write_mib_per_sec: Option<f64>,
    pub read_mb_per_sec: Option<f64>,
    pub read_mib_per_sec: Option<f64>,
    pub iops: Option<f64>,
}

impl RatesReport {
    fn from_run(run: &RunResult) -> Self {
        Self {
            write_mb_per_sec: run.write_throughput(ByteUnit::Megabytes).ok(),
            write_mib_per_sec: run.write_throughput(ByteUnit::Mebibytes).ok(),
            read_mb_per_sec: run.read_throughput(ByteUnit::Megabytes).ok(),
            read_mib_per_sec: run.read_throughput(ByteUnit::Mebibytes).ok(),
            iops: run.iops().ok(),
        }
    }

    fn from_aggregate(agg: &AggregateRates) -> Self {
        Self {
            write_mb_per_sec: agg.write_throughput(ByteUnit::Megabytes).ok(),
            write_mib_per_sec: agg.write_throughput(ByteUnit::Mebibytes).ok(),
            read_mb_per_sec: agg.read_throughput(ByteUnit::Megabytes).ok(),
            read_mib_per_sec: agg.read_throughput(ByteUnit::Mebibytes).ok(),
            iops: agg.iops().ok(),
        }
    }
}

impl Report {
    pub fn new(config: &BenchmarkConfig, started_at: DateTime<Utc>, results: &[RunResult]) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: started_at.to_rfc3339(),
            platform: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            physical_memory: config.physical_memory,
            workers: config.workers,
            aggregate_size_gib: config.aggregate_size as f64 / 1_073_741_824.0,
            iops_duration_secs: config.iops_duration.as_secs_f64(),
            fsync: config.fsync,
            seed: config.seed,
            runs: results
                .iter()
                .map(|run| RunReport {
                    run: run.run,
                    written_bytes: run.written_bytes,
                    write_secs: run.written_duration.as_secs_f64(),
                    read_bytes: run.read_bytes,
                    read_secs: run.read_duration.as_secs_f64(),
                    io_operations: run.io_operations,
                    iops_secs: run.io_duration.as_secs_f64(),
                    rates: RatesReport::from_run(run),
                })
                .collect(),
            aggregate: RatesReport::from_aggregate(&AggregateRates::from_results(results)),
        }
    }
}

/// Format a byte count with binary units.
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    const TIB: f64 = GIB * 1024.0;

    let b = bytes as f64;
    if b >= TIB {
        format!("{:.2} TiB", b / TIB)
    } else if b >= GIB {
        format!("{:.2} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.2} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.2} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Format a duration with the largest unit that keeps it above one.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    match duration.as_nanos() {
        n if n >= 1_000_000_000 => format!("{secs:.2} s"),
        n if n >= 1_000_000 => format!("{:.2} ms", secs * 1e3),
        n if n >= 1_000 => format!("{:.2} µs", secs * 1e6),
        n => format!("{n} ns"),
    }
}
