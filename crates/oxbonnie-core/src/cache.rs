//! Periodic buffer-cache invalidation.
//!
//! Without it, the read stage would be served from pages the write stage
//! just left in the OS page cache and report memory bandwidth instead of
//! device bandwidth. Invalidation is best effort: a platform that cannot
//! drop its cache degrades accuracy, not correctness, so failures are
//! logged and the loop keeps going.

use crate::error::BenchError;
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Platform primitive that drops the OS buffer cache.
pub trait CacheClearer: Send + Sync {
    /// Drop clean cached pages. `ErrorKind::Unsupported` when the platform
    /// has no way to do so.
    fn clear_buffer_cache(&self) -> io::Result<()>;
}

impl<F> CacheClearer for F
where
    F: Fn() -> io::Result<()> + Send + Sync,
{
    fn clear_buffer_cache(&self) -> io::Result<()> {
        self()
    }
}

/// Clearer that does nothing, for callers that manage caching themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCacheClearer;

impl CacheClearer for NoopCacheClearer {
    fn clear_buffer_cache(&self) -> io::Result<()> {
        Ok(())
    }
}

struct Shared {
    stopped: Mutex<bool>,
    wake: Condvar,
    attempts: AtomicU64,
    failures: AtomicU64,
}

/// Handle to the background invalidation thread.
///
/// The thread calls the clearer once per interval until [`stop`] is called
/// or the handle is dropped. Stopping wakes the thread immediately.
///
/// [`stop`]: CacheInvalidator::stop
pub struct CacheInvalidator {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl CacheInvalidator {
    /// Spawn the invalidation loop.
    pub fn start(clearer: Arc<dyn CacheClearer>, interval: Duration) -> Result<Self, BenchError> {
        let shared = Arc::new(Shared {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });

        let loop_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("oxbonnie-cache".to_string())
            .spawn(move || invalidation_loop(&loop_shared, clearer.as_ref(), interval))
            .map_err(|e| BenchError::setup("failed to spawn cache invalidator", e))?;

        tracing::debug!("Cache invalidator started (every {:?})", interval);

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Number of times the clearer has been invoked.
    pub fn attempts(&self) -> u64 {
        self.shared.attempts.load(Ordering::Relaxed)
    }

    /// Number of invocations that returned an error.
    pub fn failures(&self) -> u64 {
        self.shared.failures.load(Ordering::Relaxed)
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Signal the loop to exit and wait for it. Idempotent.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        {
            let mut stopped = self.shared.stopped.lock();
            *stopped = true;
            self.shared.wake.notify_all();
        }

        if thread.join().is_err() {
            tracing::warn!("Cache invalidator thread panicked");
        }
        tracing::debug!(
            "Cache invalidator stopped after {} attempts ({} failed)",
            self.attempts(),
            self.failures()
        );
    }
}

impl Drop for CacheInvalidator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CacheInvalidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInvalidator")
            .field("running", &self.is_running())
            .field("attempts", &self.attempts())
            .field("failures", &self.failures())
            .finish()
    }
}

fn invalidation_loop(shared: &Shared, clearer: &dyn CacheClearer, interval: Duration) {
    loop {
        let deadline = Instant::now() + interval;
        {
            let mut stopped = shared.stopped.lock();
            while !*stopped {
                if shared.wake.wait_until(&mut stopped, deadline).timed_out() {
                    break;
                }
            }
            if *stopped {
                return;
            }
        }

        shared.attempts.fetch_add(1, Ordering::Relaxed);
        match clearer.clear_buffer_cache() {
            Ok(()) => tracing::trace!("Buffer cache cleared"),
            Err(e) => {
                let failures = shared.failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures == 1 {
                    tracing::warn!(
                        "Failed to clear buffer cache ({}); read results may include cached data",
                        e
                    );
                } else {
                    tracing::debug!("Failed to clear buffer cache: {}", e);
                }
            }
        }
    }
}
