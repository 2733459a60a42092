//! # Tandem Sync Service
//!
//! Orchestrator wiring ingestion, alignment, evaluation and dispatch:
//!
//! ```text
//! ingest_telemetry ─▶ aligner.record ─▶ watchdog.record_update ─▶ worker.schedule
//!                                                                    │
//!            ┌───────────────────────────────────────────────────────┘
//!            ▼
//!   evaluate_safety ─▶ closest pair ─▶ stale? ─▶ tilt > limit? ─▶ raise_fault
//!                                                                  │
//!   watchdog timeout ──────────────────────────────────────────────┤
//!   emergency_stop() ──────────────────────────────────────────────┘
//!                                                                  ▼
//!                            trip_fault (CAS) ─▶ HaltAll ─▶ listeners
//! ```
//!
//! Only the winner of the `Fault` transition dispatches, so each fault
//! episode produces exactly one `HaltAll`. The halt reaches both
//! controllers before any listener runs.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use crane_common::command::Command;
use crane_common::consts::{LIVENESS_TIMEOUT_NS, MAX_PROCESSING_WINDOW_NS};
use crane_common::motor::MotorController;
use crane_common::state::LiftState;
use crane_common::telemetry::{AlignedTelemetryPair, CraneId, TelemetryPulse};
use tracing::{debug, error, info, trace, warn};

use crate::clock::monotonic_ns;
use crate::command::dispatcher::CommandDispatcher;
use crate::command::{Admission, admit};
use crate::config::SyncConfig;
use crate::error::{FaultReason, SyncError};
use crate::listener::ListenerSlot;
use crate::safety::evaluator::{Evaluation, SafetyEvaluator};
use crate::state::machine::{LiftStateCell, TransitionResult};
use crate::telemetry::aligner::TelemetryAligner;
use crate::telemetry::drift::DriftModel;
use crate::watchdog::LivenessWatchdog;
use crate::worker::EvaluationWorker;

const WORKER_THREAD: &str = "safety-evaluator";

/// Sentinel for "no timestamp recorded".
const UNSET_NS: i64 = 0;

// ─── Shared Core ────────────────────────────────────────────────────

/// State reachable from the ingestion threads, the evaluation worker and
/// the watchdog thread.
struct SyncCore {
    state: LiftStateCell,
    aligner: TelemetryAligner,
    evaluator: SafetyEvaluator,
    dispatcher: CommandDispatcher,
    watchdog: LivenessWatchdog,
    stale_data: AtomicBool,
    accepting: AtomicBool,
    threshold_crossed_ns: AtomicI64,
    halt_issued_ns: AtomicI64,
    last_fault: ArcSwapOption<FaultReason>,
    fault_listener: ListenerSlot<FaultReason>,
    alignment_listener: ListenerSlot<AlignedTelemetryPair>,
}

impl SyncCore {
    fn record(&self, pulse: TelemetryPulse) -> Result<TelemetryPulse, SyncError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(SyncError::ShutDown);
        }
        let pulse = pulse.with_arrival(monotonic_ns());
        let newest = self.aligner.record(pulse);
        self.watchdog.record_update(pulse.crane_id, pulse.arrival_time_ns);
        trace!(
            crane = %pulse.crane_id,
            z_mm = pulse.z_axis_mm,
            device_ts = pulse.device_timestamp_ns,
            newest,
            "telemetry recorded"
        );
        Ok(pulse)
    }

    fn evaluate_safety(&self) {
        if self.state.get() == LiftState::Fault {
            return;
        }

        let evaluation = self.evaluator.evaluate(self.aligner.find_closest_aligned_pair());
        match evaluation {
            Evaluation::InsufficientData => return,
            Evaluation::Stale {
                gap_ns,
                arrival_gap_ns,
                ..
            } => {
                if !self.stale_data.swap(true, Ordering::AcqRel) {
                    warn!(
                        gap_ms = gap_ns / 1_000_000,
                        arrival_gap_ms = arrival_gap_ns / 1_000_000,
                        "telemetry cannot be aligned, motion blocked"
                    );
                }
            }
            Evaluation::Nominal { tilt_mm, .. } => {
                if self.stale_data.swap(false, Ordering::AcqRel) {
                    info!(tilt_mm, "telemetry realigned, motion unblocked");
                }
                trace!(tilt_mm, "tilt nominal");
            }
            Evaluation::TiltExceeded { tilt_mm, .. } => {
                let crossed_ns = monotonic_ns();
                self.stale_data.store(false, Ordering::Release);
                self.raise_fault(
                    FaultReason::TiltExceeded {
                        delta_mm: tilt_mm,
                        threshold_mm: self.evaluator.tilt_threshold_mm(),
                    },
                    crossed_ns,
                );
            }
        }

        if let Some(pair) = evaluation.pair() {
            self.alignment_listener.notify(pair);
        }
    }

    /// Latch `Fault` and broadcast the halt. Returns `true` for the caller
    /// that won the transition.
    fn raise_fault(&self, reason: FaultReason, crossed_ns: i64) -> bool {
        let Some(previous) = self.state.trip_fault() else {
            debug!(%reason, "fault already latched");
            return false;
        };

        let halt_ns = self
            .dispatcher
            .dispatch_timed(Command::halt_all().with_timestamp(crossed_ns));
        self.threshold_crossed_ns.store(crossed_ns, Ordering::Release);
        self.halt_issued_ns.store(halt_ns, Ordering::Release);

        self.watchdog.stop();
        error!(
            %reason,
            from = %previous,
            processing_us = (halt_ns - crossed_ns) / 1_000,
            "fault latched, HALT_ALL dispatched"
        );
        self.last_fault.store(Some(Arc::new(reason.clone())));
        self.fault_listener.notify(&reason);
        true
    }

    fn processing_time_ns(&self) -> Option<i64> {
        let crossed = self.threshold_crossed_ns.load(Ordering::Acquire);
        let halted = self.halt_issued_ns.load(Ordering::Acquire);
        if crossed == UNSET_NS || halted == UNSET_NS {
            return None;
        }
        Some(halted - crossed)
    }
}

// ─── Service ────────────────────────────────────────────────────────

/// Safety interlock for one two-crane tandem lift.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use crane_common::prelude::*;
/// use crane_sync::service::TandemSyncService;
/// use crane_sync::sim::SimulatedMotor;
///
/// let a = Arc::new(SimulatedMotor::new(CraneId::A));
/// let b = Arc::new(SimulatedMotor::new(CraneId::B));
/// let service = TandemSyncService::new(a.clone(), b.clone()).unwrap();
///
/// service.start().unwrap();
/// service.ingest_telemetry_sync(TelemetryPulse::new(CraneId::A, 0.0, 0)).unwrap();
/// service.ingest_telemetry_sync(TelemetryPulse::new(CraneId::B, 150.0, 0)).unwrap();
///
/// assert_eq!(service.state(), LiftState::Fault);
/// assert_eq!(a.count(CommandKind::HaltAll), 1);
/// assert_eq!(b.count(CommandKind::HaltAll), 1);
/// ```
pub struct TandemSyncService {
    core: Arc<SyncCore>,
    worker: EvaluationWorker,
    shutdown_grace: Duration,
}

impl TandemSyncService {
    /// Service with default operational settings.
    pub fn new(
        controller_a: Arc<dyn MotorController>,
        controller_b: Arc<dyn MotorController>,
    ) -> Result<Self, SyncError> {
        Self::with_config(controller_a, controller_b, &SyncConfig::default())
    }

    /// Service configured from `config`.
    pub fn with_config(
        controller_a: Arc<dyn MotorController>,
        controller_b: Arc<dyn MotorController>,
        config: &SyncConfig,
    ) -> Result<Self, SyncError> {
        config.validate()?;

        let core = Arc::new(SyncCore {
            state: LiftStateCell::new(),
            aligner: TelemetryAligner::new(config.drift.enabled),
            evaluator: SafetyEvaluator::new(),
            dispatcher: CommandDispatcher::new(controller_a, controller_b),
            watchdog: LivenessWatchdog::new(LIVENESS_TIMEOUT_NS, config.check_interval()),
            stale_data: AtomicBool::new(false),
            accepting: AtomicBool::new(true),
            threshold_crossed_ns: AtomicI64::new(UNSET_NS),
            halt_issued_ns: AtomicI64::new(UNSET_NS),
            last_fault: ArcSwapOption::empty(),
            fault_listener: ListenerSlot::new(),
            alignment_listener: ListenerSlot::new(),
        });

        let timeout_core: Weak<SyncCore> = Arc::downgrade(&core);
        core.watchdog.set_timeout_callback(move |crane| {
            if let Some(core) = timeout_core.upgrade() {
                core.raise_fault(FaultReason::LivenessTimeout { crane: *crane }, monotonic_ns());
            }
        });

        let worker_core: Weak<SyncCore> = Arc::downgrade(&core);
        let worker = EvaluationWorker::spawn(WORKER_THREAD, move || {
            if let Some(core) = worker_core.upgrade() {
                core.evaluate_safety();
            }
        })?;

        info!(
            service = %config.shared.service_name,
            drift_compensation = config.drift.enabled,
            "tandem sync service created"
        );
        Ok(Self {
            core,
            worker,
            shutdown_grace: config.shutdown_grace(),
        })
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// `Idle → Lifting` and arm the liveness watchdog.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidOperation`] while `Fault`: a fault needs an
    /// explicit [`reset`](Self::reset) first.
    pub fn start(&self) -> Result<(), SyncError> {
        match self.core.state.start() {
            TransitionResult::Ok(_) => {
                if let Err(e) = self.core.watchdog.start() {
                    self.core.state.stop();
                    return Err(e);
                }
                info!("tandem lift started");
                Ok(())
            }
            TransitionResult::Unchanged(state) => {
                debug!(%state, "start ignored");
                Ok(())
            }
            TransitionResult::Rejected(reason) => {
                warn!(reason, "start rejected");
                Err(SyncError::InvalidOperation {
                    operation: "start",
                    state: LiftState::Fault,
                })
            }
        }
    }

    /// Graceful `Lifting → Idle`. Disarms the watchdog. Never leaves `Fault`.
    pub fn stop(&self) {
        self.core.watchdog.stop();
        match self.core.state.stop() {
            TransitionResult::Ok(_) => info!("tandem lift stopped"),
            TransitionResult::Unchanged(_) => {}
            TransitionResult::Rejected(reason) => debug!(reason, "stop leaves fault latched"),
        }
    }

    /// Return to `Idle` from any state.
    ///
    /// Clears the watchdog, telemetry buffers, stale flag, SLA timestamps,
    /// fault reason and command history. The drift calibration survives.
    pub fn reset(&self) {
        let core = &self.core;
        core.watchdog.stop();
        core.watchdog.reset();
        core.aligner.clear();
        core.stale_data.store(false, Ordering::Release);
        core.threshold_crossed_ns.store(UNSET_NS, Ordering::Release);
        core.halt_issued_ns.store(UNSET_NS, Ordering::Release);
        core.last_fault.store(None);
        core.dispatcher.clear_history();
        let previous = core.state.reset();
        info!(from = %previous, "interlock reset");
    }

    /// Operator emergency stop: latch `Fault` and broadcast `HaltAll`.
    ///
    /// Returns `false` if a fault was already latched.
    pub fn emergency_stop(&self) -> bool {
        self.core.raise_fault(FaultReason::EmergencyStop, monotonic_ns())
    }

    /// Stop the watchdog, refuse further telemetry and drain the worker.
    ///
    /// Waits at most the configured grace period. Idempotent.
    pub fn shutdown(&self) {
        if !self.core.accepting.swap(false, Ordering::AcqRel) {
            return;
        }
        self.stop();
        let drained = self.worker.shutdown(self.shutdown_grace);
        info!(
            drained,
            evaluations = self.worker.evaluations(),
            "tandem sync service shut down"
        );
    }

    // ─── Ingestion ──────────────────────────────────────────────────

    /// Record `pulse` and schedule a safety evaluation. Never blocks.
    ///
    /// # Errors
    ///
    /// [`SyncError::ShutDown`] after [`shutdown`](Self::shutdown).
    pub fn ingest_telemetry(&self, pulse: TelemetryPulse) -> Result<(), SyncError> {
        self.core.record(pulse)?;
        self.worker.schedule();
        Ok(())
    }

    /// Record `pulse` and evaluate on the calling thread.
    pub fn ingest_telemetry_sync(&self, pulse: TelemetryPulse) -> Result<(), SyncError> {
        self.core.record(pulse)?;
        self.core.evaluate_safety();
        Ok(())
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Dispatch `command` unless policy refuses it.
    ///
    /// A `Move` is refused while `Fault` or while stale data is flagged;
    /// every other kind always passes.
    pub fn execute_command(&self, command: Command) -> bool {
        let state = self.core.state.get();
        let stale = self.core.stale_data.load(Ordering::Acquire);
        match admit(&command, state, stale) {
            Admission::Accepted => {
                self.core.dispatcher.dispatch(command);
                true
            }
            Admission::Rejected(reason) => {
                debug!(%command, ?reason, %state, "command rejected");
                false
            }
        }
    }

    /// Ordered copy of every dispatched command since the last reset.
    pub fn command_history(&self) -> Vec<Command> {
        self.core.dispatcher.history()
    }

    // ─── Observation ────────────────────────────────────────────────

    pub fn state(&self) -> LiftState {
        self.core.state.get()
    }

    pub fn is_stale_data_detected(&self) -> bool {
        self.core.stale_data.load(Ordering::Acquire)
    }

    /// Newest pulse (by device timestamp) received from `crane`.
    pub fn latest_pulse(&self, crane: CraneId) -> Option<TelemetryPulse> {
        self.core.aligner.latest_pulse(crane)
    }

    /// Closest-aligned pair across both histories.
    pub fn aligned_pair(&self) -> Option<AlignedTelemetryPair> {
        self.core.aligner.find_closest_aligned_pair()
    }

    /// Tilt of the closest-aligned pair [mm].
    pub fn calculate_tilt_delta(&self) -> Option<f64> {
        self.aligned_pair().map(|pair| pair.tilt_delta_mm())
    }

    /// Threshold-crossed to halt-dispatched latency of the current fault
    /// episode [ns].
    pub fn processing_time_ns(&self) -> Option<i64> {
        self.core.processing_time_ns()
    }

    /// Whether the current fault episode met the processing window.
    /// `false` when no fault has been measured.
    pub fn was_processing_within_window(&self) -> bool {
        self.core
            .processing_time_ns()
            .is_some_and(|ns| ns < MAX_PROCESSING_WINDOW_NS)
    }

    /// Monotonic time the current fault was detected [ns].
    pub fn threshold_crossed_timestamp_ns(&self) -> Option<i64> {
        Some(self.core.threshold_crossed_ns.load(Ordering::Acquire)).filter(|&ns| ns != UNSET_NS)
    }

    /// Monotonic time both controllers had accepted the halt [ns].
    pub fn halt_issued_timestamp_ns(&self) -> Option<i64> {
        Some(self.core.halt_issued_ns.load(Ordering::Acquire)).filter(|&ns| ns != UNSET_NS)
    }

    /// Cause of the current fault episode.
    pub fn last_fault_reason(&self) -> Option<FaultReason> {
        self.core.last_fault.load_full().map(|reason| (*reason).clone())
    }

    pub fn watchdog(&self) -> &LivenessWatchdog {
        &self.core.watchdog
    }

    /// Completed background evaluation passes.
    pub fn evaluations(&self) -> u64 {
        self.worker.evaluations()
    }

    // ─── Drift Compensation ─────────────────────────────────────────

    /// Record a simultaneous `(A, B)` device timestamp pair as calibration.
    /// Returns `false` when drift compensation is disabled.
    pub fn calibrate_clocks(&self, ts_a: i64, ts_b: i64) -> bool {
        self.core.aligner.calibrate(ts_a, ts_b)
    }

    /// Re-estimate the drift rate from a later simultaneous pair.
    pub fn update_drift(&self, ts_a: i64, ts_b: i64) -> bool {
        self.core.aligner.update_drift(ts_a, ts_b)
    }

    pub fn drift_model(&self) -> Option<DriftModel> {
        self.core.aligner.drift_model()
    }

    // ─── Listeners ──────────────────────────────────────────────────

    /// Called with every dispatched command, after the controllers.
    pub fn set_command_listener<F>(&self, listener: F)
    where
        F: Fn(&Command) + Send + Sync + 'static,
    {
        self.core.dispatcher.listener().set(listener);
    }

    /// Called once per fault episode, after the halt broadcast.
    pub fn set_fault_listener<F>(&self, listener: F)
    where
        F: Fn(&FaultReason) + Send + Sync + 'static,
    {
        self.core.fault_listener.set(listener);
    }

    /// Called with every evaluated pair.
    pub fn set_alignment_listener<F>(&self, listener: F)
    where
        F: Fn(&AlignedTelemetryPair) + Send + Sync + 'static,
    {
        self.core.alignment_listener.set(listener);
    }
}

impl Drop for TandemSyncService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TandemSyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TandemSyncService")
            .field("state", &self.state())
            .field("stale_data", &self.is_stale_data_detected())
            .field("watchdog_running", &self.core.watchdog.is_running())
            .field("worker_running", &self.worker.is_running())
            .finish()
    }
}
