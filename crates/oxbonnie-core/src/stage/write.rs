//! Sequential write stage.

use super::{StageKind, StageOutcome};
use crate::block::RandomBlock;
use crate::config::BenchmarkConfig;
use crate::error::BenchError;
use crate::pool::run_concurrent;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Write every worker's file for `run` by tiling `block` end-to-end.
///
/// Worker `i` writes exactly [`BenchmarkConfig::worker_file_size`] bytes, so
/// the stage total always equals the aggregate size.
pub fn sequential_write(
    config: &BenchmarkConfig,
    run: usize,
    block: &RandomBlock,
) -> Result<StageOutcome, BenchError> {
    tracing::debug!(
        "Run {}: writing {} bytes across {} workers",
        run,
        config.aggregate_size,
        config.workers
    );

    let start = Instant::now();
    let workers = run_concurrent(StageKind::Write, config.workers, |worker| {
        let path = config.worker_file_path(run, worker);
        let size = config.worker_file_size(worker);
        write_file(&path, size, block, config.fsync).map_err(|source| BenchError::Io {
            stage: StageKind::Write,
            worker,
            path,
            source,
        })
    })?;
    let elapsed = start.elapsed();

    let outcome = StageOutcome::from_workers(StageKind::Write, workers, elapsed);
    tracing::debug!("Run {}: wrote {} bytes in {:?}", run, outcome.total, elapsed);
    Ok(outcome)
}

fn write_file(path: &Path, size: u64, block: &RandomBlock, fsync: bool) -> io::Result<u64> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(block.len(), file);

    let mut written = 0u64;
    while written < size {
        let remaining = usize::try_from(size - written).unwrap_or(usize::MAX);
        let chunk = block.tile_slice(written, remaining);
        writer.write_all(chunk)?;
        written += chunk.len() as u64;
    }

    let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    if fsync {
        file.sync_all()?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockSource;
    use tempfile::TempDir;

    #[test]
    fn test_write_file_tiles_block() {
        let dir = TempDir::new().unwrap();
        let block = RandomBlock::generate(1024, BlockSource::Seeded(5)).unwrap();
        let path = dir.path().join("tiled");

        let written = write_file(&path, 2500, &block, false).unwrap();
        assert_eq!(written, 2500);

        let content = std::fs::read(&path).unwrap();
        assert_eq!(content.len(), 2500);
        assert_eq!(&content[..1024], &block[..]);
        assert_eq!(&content[1024..2048], &block[..]);
        assert_eq!(&content[2048..], &block[..452]);
    }

    #[test]
    fn test_zero_size_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let block = RandomBlock::generate(1024, BlockSource::Seeded(5)).unwrap();
        let path = dir.path().join("empty");

        assert_eq!(write_file(&path, 0, &block, true).unwrap(), 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_stage_writes_aggregate_exactly() {
        let dir = TempDir::new().unwrap();
        let config = BenchmarkConfig::new(dir.path().to_path_buf(), 0)
            .with_workers(3)
            .with_aggregate_size(1_000_003)
            .with_fsync(false);
        let block = RandomBlock::generate(crate::BLOCK_SIZE, BlockSource::Seeded(9)).unwrap();

        let outcome = sequential_write(&config, 0, &block).unwrap();
        assert_eq!(outcome.total, 1_000_003);
        assert_eq!(outcome.workers.len(), 3);

        let on_disk: u64 = (0..3)
            .map(|w| std::fs::metadata(config.worker_file_path(0, w)).unwrap().len())
            .sum();
        assert_eq!(on_disk, 1_000_003);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let config = BenchmarkConfig::new(dir.path().join("does-not-exist"), 0)
            .with_workers(2)
            .with_aggregate_size(4096);
        let block = RandomBlock::generate(crate::BLOCK_SIZE, BlockSource::Seeded(9)).unwrap();

        let err = sequential_write(&config, 0, &block).unwrap_err();
        match err {
            BenchError::Io { stage, worker, .. } => {
                assert_eq!(stage, StageKind::Write);
                assert_eq!(worker, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
