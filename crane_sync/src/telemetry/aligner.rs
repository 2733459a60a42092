//! Closest-pair telemetry alignment.
//!
//! Holds one `PulseRing` and one `LatestPulse` per crane. The pair search is
//! an exhaustive 8×8 comparison: its worst case is fixed and tiny, which is
//! what the safety path needs.
//!
//! Selection order:
//! 1. smallest `|adjusted_ts_a - ts_b|`
//! 2. on equal gap, the pair whose newest timestamp is latest

use crane_common::telemetry::{AlignedTelemetryPair, CraneId, TelemetryPulse};
use tracing::warn;

use super::drift::{DriftCompensator, DriftModel};
use super::ring::{LatestPulse, PulseRing};

/// Per-crane telemetry history with cross-crane pairing.
#[derive(Debug)]
pub struct TelemetryAligner {
    rings: [PulseRing; 2],
    latest: [LatestPulse; 2],
    drift: DriftCompensator,
    drift_enabled: bool,
}

impl TelemetryAligner {
    /// Create an empty aligner. With `drift_enabled == false` calibration
    /// requests are ignored and A's timestamps are used as-is.
    pub fn new(drift_enabled: bool) -> Self {
        Self {
            rings: [PulseRing::new(), PulseRing::new()],
            latest: [LatestPulse::new(), LatestPulse::new()],
            drift: DriftCompensator::new(),
            drift_enabled,
        }
    }

    /// Store a pulse in its crane's history. O(1), never blocks.
    ///
    /// Returns `true` if the pulse became the crane's latest.
    #[inline]
    pub fn record(&self, pulse: TelemetryPulse) -> bool {
        let index = pulse.crane_id.index();
        self.rings[index].record(pulse);
        self.latest[index].offer(pulse)
    }

    /// Newest pulse by device timestamp for `crane`.
    pub fn latest_pulse(&self, crane: CraneId) -> Option<TelemetryPulse> {
        self.latest[crane.index()].get()
    }

    /// Number of buffered pulses for `crane`.
    pub fn buffered(&self, crane: CraneId) -> usize {
        self.rings[crane.index()].len()
    }

    /// Best-matched A/B pair from the buffered histories.
    ///
    /// `None` if either crane has no buffered pulse.
    pub fn find_closest_aligned_pair(&self) -> Option<AlignedTelemetryPair> {
        let history_a = self.rings[CraneId::A.index()].snapshot();
        let history_b = self.rings[CraneId::B.index()].snapshot();

        let mut best: Option<AlignedTelemetryPair> = None;
        for pulse_a in history_a.iter().flatten() {
            let adjusted_a = self.adjusted_timestamp(pulse_a);
            for pulse_b in history_b.iter().flatten() {
                let candidate = AlignedTelemetryPair::with_adjusted_a(*pulse_a, *pulse_b, adjusted_a);
                best = match best {
                    Some(current) if !is_better(&candidate, &current) => Some(current),
                    _ => Some(candidate),
                };
            }
        }
        best
    }

    /// A's device timestamp projected onto B's clock. B pulses pass through.
    #[inline]
    pub fn adjusted_timestamp(&self, pulse: &TelemetryPulse) -> i64 {
        match pulse.crane_id {
            CraneId::A if self.drift_enabled => self.drift.adjust(pulse.device_timestamp_ns),
            _ => pulse.device_timestamp_ns,
        }
    }

    /// Record a simultaneous reading pair as the clock calibration point.
    pub fn calibrate(&self, ts_a: i64, ts_b: i64) -> bool {
        if !self.drift_enabled {
            warn!("calibration ignored: drift compensation disabled");
            return false;
        }
        self.drift.calibrate(ts_a, ts_b);
        true
    }

    /// Re-estimate the drift rate from a later simultaneous reading pair.
    pub fn update_drift(&self, ts_a: i64, ts_b: i64) -> bool {
        if !self.drift_enabled {
            warn!("drift update ignored: drift compensation disabled");
            return false;
        }
        self.drift.update_drift(ts_a, ts_b)
    }

    /// Current drift model, if calibrated.
    pub fn drift_model(&self) -> Option<DriftModel> {
        self.drift.model()
    }

    /// Whether calibration requests are honoured.
    pub fn drift_enabled(&self) -> bool {
        self.drift_enabled
    }

    /// Drop all buffered and latest pulses. The drift calibration is kept.
    pub fn clear(&self) {
        for ring in &self.rings {
            ring.clear();
        }
        for latest in &self.latest {
            latest.clear();
        }
    }
}

#[inline]
fn is_better(candidate: &AlignedTelemetryPair, current: &AlignedTelemetryPair) -> bool {
    let (gap_new, gap_cur) = (candidate.timestamp_gap_ns(), current.timestamp_gap_ns());
    gap_new < gap_cur
        || (gap_new == gap_cur && candidate.newest_timestamp_ns() > current.newest_timestamp_ns())
}
