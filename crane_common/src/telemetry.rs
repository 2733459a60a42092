//! Telemetry value types (crane ids, height pulses, aligned pairs).
//!
//! Pulses are immutable and `Copy`. `device_timestamp_ns` is the originating
//! controller's clock; `arrival_time_ns` is stamped on receipt from the local
//! monotonic clock and is only used for the secondary late-arrival check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::CRANE_COUNT;

/// Identifies one of the two crane units in a tandem lift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum CraneId {
    /// Crane A. Its clock is projected onto B's frame when drift
    /// compensation is active.
    A = 0,
    /// Crane B, the reference clock.
    B = 1,
}

impl CraneId {
    /// Both cranes, in index order.
    pub const ALL: [CraneId; CRANE_COUNT] = [CraneId::A, CraneId::B];

    /// Array index for per-crane storage.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The partner crane.
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::A),
            1 => Some(Self::B),
            _ => None,
        }
    }
}

impl fmt::Display for CraneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Error returned when parsing an unknown crane id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown crane id '{0}' (expected A or B)")]
pub struct ParseCraneIdError(pub String);

impl FromStr for CraneId {
    type Err = ParseCraneIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            other => Err(ParseCraneIdError(other.to_string())),
        }
    }
}

/// One timestamped height reading from a crane's hoist sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPulse {
    /// Reporting crane.
    pub crane_id: CraneId,
    /// Hook height [mm].
    pub z_axis_mm: f64,
    /// Timestamp from the crane controller's own clock [ns].
    pub device_timestamp_ns: i64,
    /// Local receipt time [ns], 0 until stamped.
    #[serde(default)]
    pub arrival_time_ns: i64,
}

impl TelemetryPulse {
    /// Create an unstamped pulse.
    #[inline]
    pub const fn new(crane_id: CraneId, z_axis_mm: f64, device_timestamp_ns: i64) -> Self {
        Self {
            crane_id,
            z_axis_mm,
            device_timestamp_ns,
            arrival_time_ns: 0,
        }
    }

    /// Copy of this pulse with the receipt time set.
    #[inline]
    pub const fn with_arrival(self, arrival_time_ns: i64) -> Self {
        Self {
            arrival_time_ns,
            ..self
        }
    }
}

/// A cross-crane pairing of pulses, computed on demand and never stored.
///
/// `adjusted_timestamp_a_ns` is A's device timestamp projected onto B's
/// clock. Without drift compensation it equals A's raw timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedTelemetryPair {
    pub pulse_a: TelemetryPulse,
    pub pulse_b: TelemetryPulse,
    pub adjusted_timestamp_a_ns: i64,
}

impl AlignedTelemetryPair {
    /// Pair two pulses without clock adjustment.
    #[inline]
    pub const fn new(pulse_a: TelemetryPulse, pulse_b: TelemetryPulse) -> Self {
        Self {
            pulse_a,
            pulse_b,
            adjusted_timestamp_a_ns: pulse_a.device_timestamp_ns,
        }
    }

    /// Pair two pulses using a projected timestamp for A.
    #[inline]
    pub const fn with_adjusted_a(
        pulse_a: TelemetryPulse,
        pulse_b: TelemetryPulse,
        adjusted_timestamp_a_ns: i64,
    ) -> Self {
        Self {
            pulse_a,
            pulse_b,
            adjusted_timestamp_a_ns,
        }
    }

    /// Absolute height difference between the two cranes [mm].
    #[inline]
    pub fn tilt_delta_mm(&self) -> f64 {
        (self.pulse_a.z_axis_mm - self.pulse_b.z_axis_mm).abs()
    }

    /// Device-clock gap between the two readings [ns].
    #[inline]
    pub fn timestamp_gap_ns(&self) -> i64 {
        self.adjusted_timestamp_a_ns
            .saturating_sub(self.pulse_b.device_timestamp_ns)
            .saturating_abs()
    }

    /// Gap between the two local receipt times [ns].
    #[inline]
    pub fn arrival_gap_ns(&self) -> i64 {
        self.pulse_a
            .arrival_time_ns
            .saturating_sub(self.pulse_b.arrival_time_ns)
            .saturating_abs()
    }

    /// True when the readings are close enough in time to be compared.
    ///
    /// The bound is exclusive: a gap equal to `max_delta_ns` is not aligned.
    #[inline]
    pub fn is_well_aligned(&self, max_delta_ns: i64) -> bool {
        self.timestamp_gap_ns() < max_delta_ns
    }

    /// True when both pulses were received within `max_delta_ns` of each other.
    #[inline]
    pub fn arrived_together(&self, max_delta_ns: i64) -> bool {
        self.arrival_gap_ns() < max_delta_ns
    }

    /// Newer of the two (adjusted) timestamps, used for tie-breaking.
    #[inline]
    pub fn newest_timestamp_ns(&self) -> i64 {
        self.adjusted_timestamp_a_ns
            .max(self.pulse_b.device_timestamp_ns)
    }
}
