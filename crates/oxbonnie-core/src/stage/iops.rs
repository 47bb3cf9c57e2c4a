//! Random small-operation stage.
//!
//! Each worker hammers its own file with 4 KiB operations at 4 KiB-aligned
//! random offsets until a deadline shared by all workers. Operation `k` is a
//! write when `k % WRITE_EVERY == 0` and a read otherwise (90% reads, 10%
//! writes). Writes store the block bytes that already belong at that offset,
//! so files still hold the tiled block afterwards.

use super::{StageKind, StageOutcome};
use crate::block::RandomBlock;
use crate::config::{BenchmarkConfig, IOPS_OP_SIZE};
use crate::error::BenchError;
use crate::pool::run_concurrent;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Instant;

/// One in this many operations is a write.
pub const WRITE_EVERY: u64 = 10;

/// Run random I/O against every worker file of `run` for the configured duration.
///
/// All workers stop at the same wall-clock deadline. The returned elapsed
/// time is measured after the join, so it includes each worker's overrun
/// past the deadline (at most one operation).
pub fn random_io(
    config: &BenchmarkConfig,
    run: usize,
    block: &RandomBlock,
) -> Result<StageOutcome, BenchError> {
    tracing::debug!(
        "Run {}: random I/O for {:?} across {} workers",
        run,
        config.iops_duration,
        config.workers
    );

    let start = Instant::now();
    let deadline = start.checked_add(config.iops_duration).ok_or_else(|| {
        BenchError::InvalidConfig(format!(
            "IOPS duration {:?} is too long to schedule",
            config.iops_duration
        ))
    })?;

    let workers = run_concurrent(StageKind::Iops, config.workers, |worker| {
        let path = config.worker_file_path(run, worker);
        let size = config.worker_file_size(worker);
        let mut rng = worker_rng(config.seed, run, worker);
        io_loop(&path, size, block, deadline, &mut rng).map_err(|source| BenchError::Io {
            stage: StageKind::Iops,
            worker,
            path,
            source,
        })
    })?;
    let elapsed = start.elapsed();

    let outcome = StageOutcome::from_workers(StageKind::Iops, workers, elapsed);
    tracing::debug!(
        "Run {}: {} operations in {:?}",
        run,
        outcome.total,
        elapsed
    );
    Ok(outcome)
}

/// Offset stream for one worker: reproducible when seeded, one ChaCha
/// stream per (run, worker) pair.
fn worker_rng(seed: Option<u64>, run: usize, worker: usize) -> ChaCha8Rng {
    match seed {
        Some(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(((run as u64) << 32) | worker as u64);
            rng
        }
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

fn io_loop(
    path: &Path,
    size: u64,
    block: &RandomBlock,
    deadline: Instant,
    rng: &mut ChaCha8Rng,
) -> io::Result<u64> {
    if size == 0 {
        return Ok(0);
    }

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;

    // Files smaller than one operation get a single op covering the whole file
    let op_len = usize::try_from(size).map_or(IOPS_OP_SIZE, |s| s.min(IOPS_OP_SIZE));
    let slots = (size / IOPS_OP_SIZE as u64).max(1);
    let mut buf = vec![0u8; op_len];

    let mut ops = 0u64;
    while Instant::now() < deadline {
        let offset = rng.random_range(0..slots) * IOPS_OP_SIZE as u64;
        file.seek(SeekFrom::Start(offset))?;

        if ops % WRITE_EVERY == 0 {
            file.write_all(block.tile_slice(offset, op_len))?;
        } else {
            file.read_exact(&mut buf)?;
            std::hint::black_box(&buf);
        }
        ops += 1;
    }

    Ok(ops)
}
