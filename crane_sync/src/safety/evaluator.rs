//! Per-update safety evaluation of an aligned telemetry pair.
//!
//! Pure decision logic; the orchestrator applies the outcome (stale flag,
//! fault transition, listener notification).
//!
//! Order of checks:
//! 1. no pair → insufficient data (not a fault)
//! 2. device-timestamp gap or arrival gap ≥ alignment bound → stale
//! 3. tilt delta > threshold → tilt violation
//! 4. otherwise nominal

use crane_common::consts::{MAX_ALIGNMENT_DELTA_NS, TILT_THRESHOLD_MM};
use crane_common::telemetry::AlignedTelemetryPair;

/// Outcome of one safety evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// One or both cranes have no buffered telemetry.
    InsufficientData,
    /// The best pair is too far apart in time to be compared.
    Stale {
        pair: AlignedTelemetryPair,
        gap_ns: i64,
        arrival_gap_ns: i64,
    },
    /// Aligned and within tilt tolerance.
    Nominal {
        pair: AlignedTelemetryPair,
        tilt_mm: f64,
    },
    /// Aligned and tilt strictly above the threshold.
    TiltExceeded {
        pair: AlignedTelemetryPair,
        tilt_mm: f64,
    },
}

impl Evaluation {
    /// Evaluated pair, if there was one.
    pub const fn pair(&self) -> Option<&AlignedTelemetryPair> {
        match self {
            Self::InsufficientData => None,
            Self::Stale { pair, .. } | Self::Nominal { pair, .. } | Self::TiltExceeded { pair, .. } => {
                Some(pair)
            }
        }
    }
}

/// Alignment and tilt thresholds applied to each evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyEvaluator {
    tilt_threshold_mm: f64,
    max_alignment_delta_ns: i64,
}

impl SafetyEvaluator {
    /// Evaluator with the contract thresholds.
    pub const fn new() -> Self {
        Self {
            tilt_threshold_mm: TILT_THRESHOLD_MM,
            max_alignment_delta_ns: MAX_ALIGNMENT_DELTA_NS,
        }
    }

    #[inline]
    pub const fn tilt_threshold_mm(&self) -> f64 {
        self.tilt_threshold_mm
    }

    #[inline]
    pub const fn max_alignment_delta_ns(&self) -> i64 {
        self.max_alignment_delta_ns
    }

    /// Classify the best-matched pair.
    pub fn evaluate(&self, pair: Option<AlignedTelemetryPair>) -> Evaluation {
        let Some(pair) = pair else {
            return Evaluation::InsufficientData;
        };

        if !pair.is_well_aligned(self.max_alignment_delta_ns)
            || !pair.arrived_together(self.max_alignment_delta_ns)
        {
            return Evaluation::Stale {
                pair,
                gap_ns: pair.timestamp_gap_ns(),
                arrival_gap_ns: pair.arrival_gap_ns(),
            };
        }

        let tilt_mm = pair.tilt_delta_mm();
        if tilt_mm > self.tilt_threshold_mm {
            Evaluation::TiltExceeded { pair, tilt_mm }
        } else {
            Evaluation::Nominal { pair, tilt_mm }
        }
    }
}

impl Default for SafetyEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
