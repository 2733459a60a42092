//! Actuator command types.
//!
//! A `Command` is immutable once built. Equality compares kind, target and
//! velocity only; the timestamp is audit metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::telemetry::CraneId;

/// Kind of actuator instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CommandKind {
    /// Drive the hoist at `target_velocity` [mm/s].
    Move = 0,
    /// Stop one crane (or both when untargeted).
    Halt = 1,
    /// Stop both cranes. Always broadcast.
    HaltAll = 2,
    /// Run a diagnostic/clock calibration.
    Calibrate = 3,
    /// Operator emergency stop.
    EmergencyStop = 4,
}

impl CommandKind {
    /// Kinds that may be blocked by the interlock. Everything else is a
    /// safety or diagnostic action and always passes.
    #[inline]
    pub const fn is_motion(self) -> bool {
        matches!(self, Self::Move)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Move => "MOVE",
            Self::Halt => "HALT",
            Self::HaltAll => "HALT_ALL",
            Self::Calibrate => "CALIBRATE",
            Self::EmergencyStop => "EMERGENCY_STOP",
        };
        f.write_str(name)
    }
}

/// One actuator instruction for one or both cranes.
///
/// `target_crane_id == None` means broadcast to both controllers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub target_crane_id: Option<CraneId>,
    /// Hoist velocity [mm/s]; 0.0 for non-motion commands.
    pub target_velocity: f64,
    /// Creation time [ns], 0 when unstamped.
    #[serde(default)]
    pub timestamp_ns: i64,
}

impl Command {
    const fn build(kind: CommandKind, target_crane_id: Option<CraneId>, target_velocity: f64) -> Self {
        Self {
            kind,
            target_crane_id,
            target_velocity,
            timestamp_ns: 0,
        }
    }

    /// Move a single crane.
    pub const fn move_crane(crane: CraneId, target_velocity: f64) -> Self {
        Self::build(CommandKind::Move, Some(crane), target_velocity)
    }

    /// Move both cranes together.
    pub const fn move_both(target_velocity: f64) -> Self {
        Self::build(CommandKind::Move, None, target_velocity)
    }

    /// Halt a single crane.
    pub const fn halt(crane: CraneId) -> Self {
        Self::build(CommandKind::Halt, Some(crane), 0.0)
    }

    /// Halt both cranes.
    pub const fn halt_all() -> Self {
        Self::build(CommandKind::HaltAll, None, 0.0)
    }

    /// Calibrate one crane, or both when `crane` is `None`.
    pub const fn calibrate(crane: Option<CraneId>) -> Self {
        Self::build(CommandKind::Calibrate, crane, 0.0)
    }

    /// Emergency stop, broadcast to both cranes.
    pub const fn emergency_stop() -> Self {
        Self::build(CommandKind::EmergencyStop, None, 0.0)
    }

    /// Copy of this command stamped with `timestamp_ns`.
    #[inline]
    pub const fn with_timestamp(self, timestamp_ns: i64) -> Self {
        Self {
            timestamp_ns,
            ..self
        }
    }

    /// True if this command must reach both controllers.
    #[inline]
    pub const fn is_broadcast(&self) -> bool {
        matches!(self.kind, CommandKind::HaltAll) || self.target_crane_id.is_none()
    }

    /// True if this command is addressed to `crane` (directly or by broadcast).
    #[inline]
    pub fn targets(&self, crane: CraneId) -> bool {
        self.is_broadcast() || self.target_crane_id == Some(crane)
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.target_crane_id == other.target_crane_id
            && self.target_velocity == other.target_velocity
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target_crane_id {
            Some(crane) => write!(f, "{}({crane})", self.kind)?,
            None => write!(f, "{}(*)", self.kind)?,
        }
        if self.kind.is_motion() {
            write!(f, " @ {:.1}mm/s", self.target_velocity)?;
        }
        Ok(())
    }
}
