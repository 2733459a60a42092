//! Command module root.
//!
//! Command admission policy and routing to the two motor controllers.

pub mod dispatcher;

use crane_common::command::Command;
use crane_common::state::LiftState;

/// Why a command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Motion is blocked while the lift is faulted.
    Faulted,
    /// Motion is blocked while telemetry cannot be aligned.
    StaleData,
}

/// Result of the admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Rejected(RejectReason),
}

/// Decide whether `command` may be dispatched.
///
/// Only `Move` can be refused; halts, emergency stops and calibration are
/// safety or diagnostic actions and always pass.
#[inline]
pub fn admit(command: &Command, state: LiftState, stale_data: bool) -> Admission {
    if !command.kind.is_motion() {
        return Admission::Accepted;
    }
    if state == LiftState::Fault {
        return Admission::Rejected(RejectReason::Faulted);
    }
    if stale_data {
        return Admission::Rejected(RejectReason::StaleData);
    }
    Admission::Accepted
}
