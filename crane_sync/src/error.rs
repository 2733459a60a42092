//! Error and fault taxonomy for the interlock.
//!
//! - [`SyncError`] - failures surfaced synchronously to the caller
//!   (invalid lifecycle operation, ingestion after shutdown, thread spawn,
//!   configuration).
//! - [`FaultReason`] - why an operational fault latched. Never returned as
//!   an error: a fault is a state transition plus a halt broadcast.
//!
//! Stale data is a flag and rejected commands are a `bool`; neither is an
//! error.

use std::fmt;

use crane_common::config::ConfigError;
use crane_common::state::LiftState;
use crane_common::telemetry::CraneId;
use thiserror::Error;

/// Errors returned by interlock operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Lifecycle operation not permitted in the current state.
    #[error("cannot {operation}: system is in {state} state, manual reset required")]
    InvalidOperation {
        operation: &'static str,
        state: LiftState,
    },

    /// Telemetry offered after `shutdown()`.
    #[error("service is shut down, telemetry rejected")]
    ShutDown,

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn {thread} thread: {source}")]
    WorkerSpawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Cause of an operational fault.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultReason {
    /// Aligned height difference strictly exceeded the threshold.
    TiltExceeded { delta_mm: f64, threshold_mm: f64 },
    /// A crane went silent for longer than the liveness timeout.
    LivenessTimeout { crane: CraneId },
    /// Operator-requested emergency stop.
    EmergencyStop,
}

impl FaultReason {
    /// Crane blamed for the fault, if any.
    pub const fn crane(&self) -> Option<CraneId> {
        match self {
            Self::LivenessTimeout { crane } => Some(*crane),
            Self::TiltExceeded { .. } | Self::EmergencyStop => None,
        }
    }
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TiltExceeded {
                delta_mm,
                threshold_mm,
            } => write!(
                f,
                "Tilt threshold exceeded: {delta_mm:.2}mm > {threshold_mm:.2}mm"
            ),
            Self::LivenessTimeout { crane } => write!(f, "Communication timeout: {crane}"),
            Self::EmergencyStop => f.write_str("Emergency stop requested"),
        }
    }
}
