//! Tandem lift lifecycle state.
//!
//! `Fault` is terminal: it exits only through an explicit reset to `Idle`.
//! A faulted lift never returns to `Lifting` directly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Three-state lift lifecycle, stored as `u8` in an atomic cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum LiftState {
    /// Not lifting. Initial state and the target of `stop()`/`reset()`.
    #[default]
    Idle = 0,
    /// Tandem lift in progress; liveness watchdog armed.
    Lifting = 1,
    /// Safety interlock tripped; requires reset.
    Fault = 2,
}

impl LiftState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Lifting),
            2 => Some(Self::Fault),
            _ => None,
        }
    }

    /// True for `Fault`.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fault)
    }
}

impl fmt::Display for LiftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("IDLE"),
            Self::Lifting => f.write_str("LIFTING"),
            Self::Fault => f.write_str("FAULT"),
        }
    }
}
