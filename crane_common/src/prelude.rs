//! Prelude module for common re-exports.
//!
//! ```rust
//! use crane_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Safety Contract ────────────────────────────────────────────────
pub use crate::consts::{
    LIVENESS_TIMEOUT_NS, MAX_ALIGNMENT_DELTA_NS, MAX_PROCESSING_WINDOW_NS, RING_BUFFER_CAPACITY,
    TILT_THRESHOLD_MM,
};

// ─── Value Types ────────────────────────────────────────────────────
pub use crate::command::{Command, CommandKind};
pub use crate::motor::MotorController;
pub use crate::state::LiftState;
pub use crate::telemetry::{AlignedTelemetryPair, CraneId, TelemetryPulse};
