//! Fan-out/fan-in over worker threads.

use crate::error::BenchError;
use crate::stage::StageKind;
use std::thread;
use std::time::{Duration, Instant};

/// What a single worker reported after it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOutcome {
    /// Worker index, `0..N`.
    pub index: usize,
    /// Bytes or operations processed, depending on the stage.
    pub count: u64,
    /// Time the worker spent inside its function.
    pub elapsed: Duration,
}

/// Run `worker_fn(0..workers)` on `workers` OS threads and join them all.
///
/// Blocks until every spawned worker has returned. A failing worker does not
/// cut the others short: all are joined, then the error of the lowest-index
/// failing worker is returned (a panic counts as a failure). Outcomes are
/// returned in worker-index order.
pub fn run_concurrent<F>(
    stage: StageKind,
    workers: usize,
    worker_fn: F,
) -> Result<Vec<WorkerOutcome>, BenchError>
where
    F: Fn(usize) -> Result<u64, BenchError> + Sync,
{
    let worker_fn = &worker_fn;

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        let mut spawn_error = None;

        for index in 0..workers {
            let spawned = thread::Builder::new()
                .name(format!("oxbonnie-{}-{index}", stage.short_name()))
                .spawn_scoped(scope, move || {
                    let start = Instant::now();
                    let count = worker_fn(index)?;
                    Ok(WorkerOutcome {
                        index,
                        count,
                        elapsed: start.elapsed(),
                    })
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    spawn_error = Some(BenchError::setup(
                        format!("failed to spawn {stage} worker {index}"),
                        e,
                    ));
                    break;
                }
            }
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        let mut first_error: Option<BenchError> = None;

        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(outcome)) => {
                    tracing::trace!(
                        "{} worker {} finished: {} in {:?}",
                        stage,
                        index,
                        outcome.count,
                        outcome.elapsed
                    );
                    outcomes.push(outcome);
                }
                Ok(Err(e)) => {
                    tracing::debug!("{} worker {} failed: {}", stage, index, e);
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    tracing::debug!("{} worker {} panicked", stage, index);
                    first_error.get_or_insert(BenchError::WorkerPanicked {
                        stage,
                        worker: index,
                    });
                }
            }
        }

        match first_error.or(spawn_error) {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn test_runs_every_worker_once() {
        let calls = AtomicUsize::new(0);
        let outcomes = run_concurrent(StageKind::Write, 8, |index| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(index as u64 * 10)
        })
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 8);
        assert_eq!(outcomes.len(), 8);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert_eq!(outcome.count, i as u64 * 10);
        }
    }

    #[test]
    fn test_workers_run_in_parallel() {
        // Deadlocks unless all four threads are alive at once
        let barrier = Barrier::new(4);
        let outcomes = run_concurrent(StageKind::Read, 4, |_| {
            barrier.wait();
            Ok(1)
        })
        .unwrap();
        assert_eq!(outcomes.iter().map(|o| o.count).sum::<u64>(), 4);
    }

    #[test]
    fn test_failure_waits_for_all_and_returns_lowest_index_error() {
        let finished = AtomicUsize::new(0);
        let err = run_concurrent(StageKind::Write, 4, |index| {
            if index == 1 || index == 3 {
                return Err(BenchError::Io {
                    stage: StageKind::Write,
                    worker: index,
                    path: PathBuf::from(format!("f{index}")),
                    source: io::Error::other("boom"),
                });
            }
            std::thread::sleep(Duration::from_millis(50));
            finished.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        })
        .unwrap_err();

        assert_eq!(finished.load(Ordering::SeqCst), 2);
        match err {
            BenchError::Io { worker, .. } => assert_eq!(worker, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_panicking_worker_is_reported() {
        let err = run_concurrent(StageKind::Iops, 2, |index| {
            if index == 0 {
                panic!("worker exploded");
            }
            Ok(5)
        })
        .unwrap_err();

        assert!(matches!(
            err,
            BenchError::WorkerPanicked {
                stage: StageKind::Iops,
                worker: 0
            }
        ));
    }

    #[test]
    fn test_single_worker() {
        let outcomes = run_concurrent(StageKind::Write, 1, |_| Ok(42)).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].count, 42);
    }
}
