//! Sequential read stage with read-back verification.

use super::{StageKind, StageOutcome};
use crate::block::RandomBlock;
use crate::config::BenchmarkConfig;
use crate::error::{BenchError, IntegrityFailure};
use crate::pool::run_concurrent;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Instant;

/// Read back every worker file of `run` and verify its final block.
///
/// Files are read front to back in block-sized chunks. After EOF the last
/// full chunk must equal `block`, any trailing partial chunk must equal the
/// block's prefix, and the byte count must match what was written.
pub fn sequential_read(
    config: &BenchmarkConfig,
    run: usize,
    block: &RandomBlock,
) -> Result<StageOutcome, BenchError> {
    tracing::debug!("Run {}: reading back {} workers", run, config.workers);

    let start = Instant::now();
    let workers = run_concurrent(StageKind::Read, config.workers, |worker| {
        let path = config.worker_file_path(run, worker);
        let expected = config.worker_file_size(worker);
        match read_and_verify(&path, expected, block) {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(failure)) => Err(BenchError::Integrity {
                worker,
                path,
                failure,
            }),
            Err(source) => Err(BenchError::Io {
                stage: StageKind::Read,
                worker,
                path,
                source,
            }),
        }
    })?;
    let elapsed = start.elapsed();

    let outcome = StageOutcome::from_workers(StageKind::Read, workers, elapsed);
    tracing::debug!("Run {}: read {} bytes in {:?}", run, outcome.total, elapsed);
    Ok(outcome)
}

/// Read `path` to EOF. The outer error is I/O, the inner one a content mismatch.
fn read_and_verify(
    path: &Path,
    expected: u64,
    block: &RandomBlock,
) -> io::Result<Result<u64, IntegrityFailure>> {
    let mut file = File::open(path)?;

    let mut current = vec![0u8; block.len()];
    let mut last_full = vec![0u8; block.len()];
    let mut last_full_offset = None;
    let mut total = 0u64;

    loop {
        let n = read_full(&mut file, &mut current)?;
        if n == current.len() {
            std::mem::swap(&mut current, &mut last_full);
            last_full_offset = Some(total);
            total += n as u64;
            continue;
        }

        if n > 0 && current[..n] != *block.tile_slice(total, n) {
            return Ok(Err(IntegrityFailure::TailMismatch { offset: total, len: n }));
        }
        total += n as u64;
        break;
    }

    if total != expected {
        return Ok(Err(IntegrityFailure::LengthMismatch {
            expected,
            actual: total,
        }));
    }

    if let Some(offset) = last_full_offset
        && last_full[..] != block[..]
    {
        return Ok(Err(IntegrityFailure::LastBlockMismatch { offset }));
    }

    Ok(Ok(total))
}

/// Fill `buf` completely unless EOF comes first; returns the bytes read.
fn read_full(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
