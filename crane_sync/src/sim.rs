//! # Simulation Backends
//!
//! In-process stand-ins for the two external collaborators: a recording
//! [`SimulatedMotor`] for the motor controller contract and a
//! [`LiftProfile`] that synthesises telemetry for a running tandem lift.
//! The daemon uses both when no hardware is attached; tests use the motor
//! to observe routing.

use crane_common::command::{Command, CommandKind};
use crane_common::motor::MotorController;
use crane_common::telemetry::{CraneId, TelemetryPulse};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

// ─── Motor ──────────────────────────────────────────────────────────

/// Motor controller that records every command it receives.
///
/// A `Halt`, `HaltAll` or `EmergencyStop` parks the motor; a later `Move`
/// releases it again.
#[derive(Debug)]
pub struct SimulatedMotor {
    crane: CraneId,
    received: Mutex<Vec<Command>>,
    halted: AtomicBool,
}

impl SimulatedMotor {
    pub fn new(crane: CraneId) -> Self {
        Self {
            crane,
            received: Mutex::new(Vec::new()),
            halted: AtomicBool::new(false),
        }
    }

    /// Crane this motor drives.
    pub fn crane(&self) -> CraneId {
        self.crane
    }

    /// Copy of every command received, in order.
    pub fn received(&self) -> Vec<Command> {
        self.received.lock().clone()
    }

    /// Number of received commands of `kind`.
    pub fn count(&self, kind: CommandKind) -> usize {
        self.received.lock().iter().filter(|c| c.kind == kind).count()
    }

    /// Most recent command.
    pub fn last(&self) -> Option<Command> {
        self.received.lock().last().copied()
    }

    /// Whether the last stopping command has not been followed by a `Move`.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Forget received commands and release the brake.
    pub fn clear(&self) {
        self.received.lock().clear();
        self.halted.store(false, Ordering::Release);
    }
}

impl MotorController for SimulatedMotor {
    fn send_command(&self, command: &Command) {
        match command.kind {
            CommandKind::Halt | CommandKind::HaltAll | CommandKind::EmergencyStop => {
                if !self.halted.swap(true, Ordering::AcqRel) {
                    info!(crane = %self.crane, %command, "motor halted");
                }
            }
            CommandKind::Move => self.halted.store(false, Ordering::Release),
            CommandKind::Calibrate => {}
        }
        debug!(crane = %self.crane, %command, "motor command");
        self.received.lock().push(*command);
    }
}

// ─── Telemetry ──────────────────────────────────────────────────────

/// Kinematic profile of a simulated tandem lift.
///
/// Both cranes climb at `velocity_mm_s`; crane B additionally gains
/// `divergence_mm_s`, so any non-zero divergence eventually produces an
/// unsafe tilt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiftProfile {
    pub start_height_mm: f64,
    pub velocity_mm_s: f64,
    pub divergence_mm_s: f64,
}

impl LiftProfile {
    pub const fn new(velocity_mm_s: f64, divergence_mm_s: f64) -> Self {
        Self {
            start_height_mm: 0.0,
            velocity_mm_s,
            divergence_mm_s,
        }
    }

    /// Height of `crane` after `elapsed_ns` of lifting [mm].
    pub fn height_at(&self, crane: CraneId, elapsed_ns: i64) -> f64 {
        let seconds = elapsed_ns as f64 / 1e9;
        let speed = match crane {
            CraneId::A => self.velocity_mm_s,
            CraneId::B => self.velocity_mm_s + self.divergence_mm_s,
        };
        self.start_height_mm + speed * seconds
    }

    /// Pulse `crane` would report at device time `device_timestamp_ns`.
    pub fn pulse_at(&self, crane: CraneId, device_timestamp_ns: i64) -> TelemetryPulse {
        TelemetryPulse::new(crane, self.height_at(crane, device_timestamp_ns), device_timestamp_ns)
    }

    /// Device time at which the tilt first exceeds `threshold_mm`, if ever.
    pub fn tilt_crossing_ns(&self, threshold_mm: f64) -> Option<i64> {
        if self.divergence_mm_s == 0.0 {
            return None;
        }
        Some((threshold_mm / self.divergence_mm_s.abs() * 1e9).ceil() as i64)
    }
}
