//! Dedicated safety evaluation worker.
//!
//! Ingestion threads never evaluate safety themselves. They call
//! [`EvaluationWorker::schedule`], which sets a pending flag and unparks the
//! worker thread. A burst of schedules while an evaluation is running
//! collapses into a single follow-up pass, so the worker always evaluates
//! against the freshest telemetry without queueing stale work.

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::SyncError;

/// Poll period while waiting for the worker to drain during shutdown.
const DRAIN_POLL: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct WorkerShared {
    pending: AtomicBool,
    running: AtomicBool,
    evaluations: AtomicU64,
}

/// Single background thread running one job on demand.
#[derive(Debug)]
pub struct EvaluationWorker {
    name: &'static str,
    shared: Arc<WorkerShared>,
    thread: Thread,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EvaluationWorker {
    /// Spawn the worker thread named `name`, running `job` once per
    /// coalesced batch of [`schedule`](Self::schedule) calls.
    pub fn spawn<F>(name: &'static str, job: F) -> Result<Self, SyncError>
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new(WorkerShared {
            pending: AtomicBool::new(false),
            running: AtomicBool::new(true),
            evaluations: AtomicU64::new(0),
        });
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(name, &thread_shared, job))
            .map_err(|source| SyncError::WorkerSpawn { thread: name, source })?;

        debug!(thread = name, "evaluation worker spawned");
        Ok(Self {
            name,
            shared,
            thread: handle.thread().clone(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Request one evaluation pass.
    ///
    /// Returns `false` when a pass was already pending (the request merged
    /// into it) or the worker is shut down.
    pub fn schedule(&self) -> bool {
        if !self.shared.running.load(Ordering::Acquire) {
            return false;
        }
        if self
            .shared
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.thread.unpark();
        true
    }

    /// Completed evaluation passes.
    pub fn evaluations(&self) -> u64 {
        self.shared.evaluations.load(Ordering::Acquire)
    }

    /// Whether the worker still accepts work.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Stop accepting work and wait up to `grace` for the thread to finish
    /// its pending pass.
    ///
    /// Returns `true` if the thread exited within the grace period. A thread
    /// still busy after `grace` is detached. Idempotent.
    pub fn shutdown(&self, grace: Duration) -> bool {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return true;
        }
        let Some(handle) = self.handle.lock().take() else {
            return true;
        };
        if handle.thread().id() == thread::current().id() {
            warn!(thread = self.name, "worker shut down from its own thread, detaching");
            return false;
        }
        handle.thread().unpark();

        let deadline = Instant::now() + grace;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    thread = self.name,
                    grace_ms = grace.as_millis() as u64,
                    "evaluation worker did not finish within grace period, detaching"
                );
                return false;
            }
            thread::sleep(DRAIN_POLL);
        }
        if handle.join().is_err() {
            error!(thread = self.name, "evaluation worker panicked");
        }
        info!(thread = self.name, evaluations = self.evaluations(), "evaluation worker stopped");
        true
    }
}

impl Drop for EvaluationWorker {
    fn drop(&mut self) {
        self.shutdown(Duration::ZERO);
    }
}

fn run<F: Fn()>(name: &'static str, shared: &WorkerShared, job: F) {
    loop {
        if shared.pending.swap(false, Ordering::AcqRel) {
            if panic::catch_unwind(AssertUnwindSafe(&job)).is_err() {
                error!(thread = name, "evaluation pass panicked");
            }
            shared.evaluations.fetch_add(1, Ordering::AcqRel);
            continue;
        }
        if !shared.running.load(Ordering::Acquire) {
            break;
        }
        thread::park();
    }
}
