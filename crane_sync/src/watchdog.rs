//! # Liveness Watchdog
//!
//! Per-crane silence detector. Every received pulse refreshes its crane's
//! last-seen mark; a periodic check compares `now - last_seen` against the
//! liveness timeout and invokes the timeout callback once per stale episode.
//!
//! # Design
//!
//! - Marks and fired flags are atomics; `record_update` never blocks.
//! - The fired flag is cleared only by `record_update` or `reset`, so a
//!   crane that stays silent fires exactly once.
//! - The watchdog never talks to a motor controller. Its callback is routed
//!   into the same fault path as a tilt violation.
//! - The check thread is identified by an epoch so a thread that outlives a
//!   `stop()` (for instance when `stop()` runs inside the callback) exits
//!   instead of racing a newer one.

use crane_common::consts::{CRANE_COUNT, LIVENESS_TIMEOUT_NS, WATCHDOG_CHECK_INTERVAL_MS_DEFAULT};
use crane_common::telemetry::CraneId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::monotonic_ns;
use crate::error::SyncError;
use crate::listener::ListenerSlot;

const THREAD_NAME: &str = "liveness-watchdog";

/// Silence detector for both crane telemetry streams.
#[derive(Debug)]
pub struct LivenessWatchdog {
    shared: Arc<WatchdogShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct WatchdogShared {
    timeout_ns: i64,
    check_interval: Duration,
    last_seen_ns: [AtomicI64; CRANE_COUNT],
    fired: [AtomicBool; CRANE_COUNT],
    armed: AtomicBool,
    epoch: AtomicU64,
    on_timeout: ListenerSlot<CraneId>,
}

impl LivenessWatchdog {
    /// Watchdog with an explicit timeout and check period.
    pub fn new(timeout_ns: i64, check_interval: Duration) -> Self {
        Self {
            shared: Arc::new(WatchdogShared {
                timeout_ns,
                check_interval,
                last_seen_ns: [AtomicI64::new(0), AtomicI64::new(0)],
                fired: [AtomicBool::new(false), AtomicBool::new(false)],
                armed: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                on_timeout: ListenerSlot::new(),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Watchdog with the contract timeout and default check period.
    pub fn with_defaults() -> Self {
        Self::new(
            LIVENESS_TIMEOUT_NS,
            Duration::from_millis(WATCHDOG_CHECK_INTERVAL_MS_DEFAULT),
        )
    }

    /// Register the callback invoked when a crane goes silent.
    pub fn set_timeout_callback<F>(&self, callback: F)
    where
        F: Fn(&CraneId) + Send + Sync + 'static,
    {
        self.shared.on_timeout.set(callback);
    }

    /// Refresh `crane`'s last-seen mark and end its stale episode.
    #[inline]
    pub fn record_update(&self, crane: CraneId, arrival_time_ns: i64) {
        let i = crane.index();
        self.shared.last_seen_ns[i].fetch_max(arrival_time_ns, Ordering::AcqRel);
        self.shared.fired[i].store(false, Ordering::Release);
    }

    /// Arm the watchdog and start the periodic check thread.
    ///
    /// Both marks start at the current instant, so a crane that never
    /// reports is detected one timeout after start. No-op if already armed.
    pub fn start(&self) -> Result<(), SyncError> {
        if !self.arm(monotonic_ns()) {
            return Ok(());
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || shared.run(epoch))
            .map_err(|source| {
                self.shared.armed.store(false, Ordering::Release);
                SyncError::WorkerSpawn {
                    thread: THREAD_NAME,
                    source,
                }
            })?;

        if let Some(previous) = self.handle.lock().replace(handle) {
            // Left behind by a stop() issued from the check thread itself;
            // it has already observed the epoch change.
            drop(previous);
        }
        info!(
            timeout_ms = self.shared.timeout_ns / 1_000_000,
            check_interval_ms = self.shared.check_interval.as_millis() as u64,
            "liveness watchdog started"
        );
        Ok(())
    }

    /// Arm without a check thread, seeding both marks with `now_ns`.
    ///
    /// Returns `false` if already armed. Used by [`start`](Self::start) and
    /// by callers that drive [`check_at`](Self::check_at) themselves.
    pub fn arm(&self, now_ns: i64) -> bool {
        if self.shared.armed.swap(true, Ordering::AcqRel) {
            return false;
        }
        for crane in CraneId::ALL {
            self.shared.last_seen_ns[crane.index()].store(now_ns, Ordering::Release);
            self.shared.fired[crane.index()].store(false, Ordering::Release);
        }
        true
    }

    /// Disarm and stop the check thread.
    ///
    /// Safe to call from inside the timeout callback: the check thread is
    /// never joined from itself.
    pub fn stop(&self) {
        let was_armed = self.shared.armed.swap(false, Ordering::AcqRel);
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                debug!("watchdog stopped from its own check thread");
            } else {
                handle.thread().unpark();
                if handle.join().is_err() {
                    warn!("liveness watchdog thread panicked");
                }
            }
        }
        if was_armed {
            info!("liveness watchdog stopped");
        }
    }

    /// Clear marks and fired flags.
    pub fn reset(&self) {
        for crane in CraneId::ALL {
            self.shared.last_seen_ns[crane.index()].store(0, Ordering::Release);
            self.shared.fired[crane.index()].store(false, Ordering::Release);
        }
    }

    /// Run one liveness check at time `now_ns`.
    ///
    /// Returns how many cranes fired in this check.
    pub fn check_at(&self, now_ns: i64) -> usize {
        self.shared.check_at(now_ns)
    }

    /// Whether the watchdog is armed.
    pub fn is_running(&self) -> bool {
        self.shared.armed.load(Ordering::Acquire)
    }

    /// Last-seen mark of `crane` [ns].
    pub fn last_seen_ns(&self, crane: CraneId) -> i64 {
        self.shared.last_seen_ns[crane.index()].load(Ordering::Acquire)
    }

    /// Whether `crane`'s current stale episode has already fired.
    pub fn has_fired(&self, crane: CraneId) -> bool {
        self.shared.fired[crane.index()].load(Ordering::Acquire)
    }

    /// Whether `crane` is silent beyond the timeout at `now_ns`.
    pub fn is_stale(&self, crane: CraneId, now_ns: i64) -> bool {
        self.shared.is_stale(crane, now_ns)
    }

    /// Configured timeout [ns].
    pub fn timeout_ns(&self) -> i64 {
        self.shared.timeout_ns
    }

    /// Configured check period.
    pub fn check_interval(&self) -> Duration {
        self.shared.check_interval
    }
}

impl Drop for LivenessWatchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

impl WatchdogShared {
    fn run(&self, epoch: u64) {
        debug!(epoch, "watchdog check thread running");
        loop {
            thread::park_timeout(self.check_interval);
            if self.epoch.load(Ordering::Acquire) != epoch {
                break;
            }
            self.check_at(monotonic_ns());
        }
        debug!(epoch, "watchdog check thread exiting");
    }

    #[inline]
    fn is_stale(&self, crane: CraneId, now_ns: i64) -> bool {
        let last = self.last_seen_ns[crane.index()].load(Ordering::Acquire);
        now_ns.saturating_sub(last) > self.timeout_ns
    }

    /// Cranes are checked oldest mark first, so when both are stale the one
    /// silent longest is reported before a callback can disarm the watchdog.
    fn check_at(&self, now_ns: i64) -> usize {
        let mut order = CraneId::ALL;
        order.sort_by_key(|crane| self.last_seen_ns[crane.index()].load(Ordering::Acquire));

        let mut fired = 0;
        for crane in order {
            if !self.armed.load(Ordering::Acquire) {
                break;
            }
            if !self.is_stale(crane, now_ns) {
                continue;
            }
            if self.fired[crane.index()]
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let silent_ms =
                    now_ns.saturating_sub(self.last_seen_ns[crane.index()].load(Ordering::Acquire))
                        / 1_000_000;
                warn!(%crane, silent_ms, "telemetry liveness timeout");
                fired += 1;
                self.on_timeout.notify(&crane);
            }
        }
        fired
    }
}
