//! Clock drift compensation between the two crane controllers.
//!
//! The controllers are clocked independently. After an external calibration
//! supplies a simultaneous pair of readings, crane A's timestamps are
//! projected onto crane B's clock:
//!
//! ```text
//! offset(t_b) = offset_cal + rate × (t_b - t_b_cal)
//! ts_a        = t_b + offset(t_b)
//! adjusted_a  = ts_a - offset(t_b)
//! ```
//!
//! `rate` is re-estimated from a later simultaneous pair. Only A's
//! timestamps are ever adjusted; B is the reference frame.

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::{debug, warn};

/// Linear clock model of crane A relative to crane B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftModel {
    /// `ts_a - ts_b` at calibration [ns].
    pub offset_ns: i64,
    /// Crane B's device time at calibration [ns].
    pub reference_b_ns: i64,
    /// Offset growth per nanosecond of B time (dimensionless).
    pub rate: f64,
}

impl DriftModel {
    /// Project an A timestamp onto B's clock.
    ///
    /// Solves `ts_a = t_b + offset_ns + rate × (t_b - reference_b_ns)` for `t_b`.
    #[inline]
    pub fn project(&self, ts_a: i64) -> i64 {
        let relative = ts_a
            .saturating_sub(self.offset_ns)
            .saturating_sub(self.reference_b_ns) as f64;
        self.reference_b_ns
            .saturating_add((relative / (1.0 + self.rate)).round() as i64)
    }

    /// Estimated A-minus-B offset at B time `ts_b` [ns].
    #[inline]
    pub fn offset_at(&self, ts_b: i64) -> f64 {
        self.offset_ns as f64 + self.rate * (ts_b - self.reference_b_ns) as f64
    }
}

/// Shared, lock-free holder of the current drift model.
#[derive(Debug, Default)]
pub struct DriftCompensator {
    model: ArcSwapOption<DriftModel>,
}

impl DriftCompensator {
    pub fn new() -> Self {
        Self {
            model: ArcSwapOption::empty(),
        }
    }

    /// Record a simultaneous reading pair. Resets any drift rate.
    pub fn calibrate(&self, ts_a: i64, ts_b: i64) {
        let model = DriftModel {
            offset_ns: ts_a.saturating_sub(ts_b),
            reference_b_ns: ts_b,
            rate: 0.0,
        };
        debug!(offset_ns = model.offset_ns, reference_b_ns = ts_b, "clock calibration recorded");
        self.model.store(Some(Arc::new(model)));
    }

    /// Re-estimate the drift rate from a later simultaneous reading pair.
    ///
    /// Returns `false` if uncalibrated, if `ts_b` does not advance past
    /// the calibration point, or if the estimated rate would stop A's clock.
    pub fn update_drift(&self, ts_a: i64, ts_b: i64) -> bool {
        let Some(current) = self.model.load_full() else {
            warn!("drift update ignored: no calibration recorded");
            return false;
        };
        let elapsed_b = ts_b.saturating_sub(current.reference_b_ns);
        if elapsed_b <= 0 {
            warn!(elapsed_b, "drift update ignored: reference clock did not advance");
            return false;
        }

        let offset_now = ts_a.saturating_sub(ts_b);
        let rate = offset_now.saturating_sub(current.offset_ns) as f64 / elapsed_b as f64;
        if !rate.is_finite() || 1.0 + rate <= 0.0 {
            warn!(rate, "drift update ignored: A clock does not advance against B");
            return false;
        }
        debug!(rate, offset_now, "clock drift rate updated");
        self.model.store(Some(Arc::new(DriftModel { rate, ..*current })));
        true
    }

    /// A timestamp projected onto B's clock, or unchanged when uncalibrated.
    #[inline]
    pub fn adjust(&self, ts_a: i64) -> i64 {
        match self.model.load().as_deref() {
            Some(model) => model.project(ts_a),
            None => ts_a,
        }
    }

    /// Current model, if calibrated.
    pub fn model(&self) -> Option<DriftModel> {
        self.model.load().as_deref().copied()
    }

    /// Forget the calibration.
    pub fn clear(&self) {
        self.model.store(None);
    }
}
