//! Atomic `LiftState` transitions.
//!
//! ```text
//! Idle ──start()──▶ Lifting ──stop()──▶ Idle
//!   │                  │
//!   └──── fault ───────┴──▶ Fault ──reset()──▶ Idle
//! ```
//!
//! `Fault` never moves to `Lifting` directly. The cell is the single source
//! of truth for whether motion may be dispatched and must be read at the
//! moment of dispatch, never cached.

use crane_common::state::LiftState;
use std::sync::atomic::{AtomicU8, Ordering};

/// Result of a lifecycle transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded, carrying the new state.
    Ok(LiftState),
    /// Already in the requested state; nothing changed.
    Unchanged(LiftState),
    /// Transition rejected, with the reason.
    Rejected(&'static str),
}

/// Lock-free holder of the current lift state.
#[derive(Debug)]
pub struct LiftStateCell {
    state: AtomicU8,
}

impl LiftStateCell {
    /// Create a cell in `Idle`.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(LiftState::Idle as u8),
        }
    }

    /// Current state.
    #[inline]
    pub fn get(&self) -> LiftState {
        decode(self.state.load(Ordering::Acquire))
    }

    /// `Idle → Lifting`. Rejected while `Fault`.
    pub fn start(&self) -> TransitionResult {
        match self.state.compare_exchange(
            LiftState::Idle as u8,
            LiftState::Lifting as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => TransitionResult::Ok(LiftState::Lifting),
            Err(raw) => match decode(raw) {
                LiftState::Fault => {
                    TransitionResult::Rejected("Fault: manual reset required before start")
                }
                other => TransitionResult::Unchanged(other),
            },
        }
    }

    /// `Lifting → Idle`. A fault is never cleared by stopping.
    pub fn stop(&self) -> TransitionResult {
        match self.state.compare_exchange(
            LiftState::Lifting as u8,
            LiftState::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => TransitionResult::Ok(LiftState::Idle),
            Err(raw) => match decode(raw) {
                LiftState::Fault => TransitionResult::Rejected("Fault: only reset leaves FAULT"),
                other => TransitionResult::Unchanged(other),
            },
        }
    }

    /// Latch `Fault` from any other state.
    ///
    /// Returns the state the caller moved out of if this call won the
    /// transition, `None` if the cell was already `Fault`. Exactly one of
    /// any number of concurrent callers wins per fault episode.
    pub fn trip_fault(&self) -> Option<LiftState> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == LiftState::Fault as u8 {
                return None;
            }
            match self.state.compare_exchange_weak(
                current,
                LiftState::Fault as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => return Some(decode(previous)),
                Err(actual) => current = actual,
            }
        }
    }

    /// Unconditionally return to `Idle`. Returns the previous state.
    pub fn reset(&self) -> LiftState {
        decode(self.state.swap(LiftState::Idle as u8, Ordering::AcqRel))
    }
}

impl Default for LiftStateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn decode(raw: u8) -> LiftState {
    // Only this module writes the cell, always with a valid discriminant.
    LiftState::from_u8(raw).unwrap_or(LiftState::Fault)
}

// ─── Tests ──────────────────────────────────────────────────────────
