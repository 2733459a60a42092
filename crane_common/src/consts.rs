//! Safety contract constants for the tandem lift interlock.
//!
//! Single source of truth for all thresholds and limits. These values are
//! part of the safety contract and are not configurable at runtime.

use static_assertions::const_assert;

/// Maximum permitted height difference between the two cranes [mm].
///
/// A fault is raised when the aligned tilt delta strictly exceeds this value.
pub const TILT_THRESHOLD_MM: f64 = 100.0;

/// Silence after which a crane is considered lost [ns] (150 ms).
pub const LIVENESS_TIMEOUT_NS: i64 = 150_000_000;

/// Maximum timestamp gap for two pulses to be paired [ns] (100 ms).
pub const MAX_ALIGNMENT_DELTA_NS: i64 = 100_000_000;

/// Budget from threshold crossing to halt dispatch [ns] (10 ms).
pub const MAX_PROCESSING_WINDOW_NS: i64 = 10_000_000;

/// Per-crane telemetry history depth.
pub const RING_BUFFER_CAPACITY: usize = 8;

/// Number of cranes taking part in a tandem lift.
pub const CRANE_COUNT: usize = 2;

/// Default liveness check period [ms].
pub const WATCHDOG_CHECK_INTERVAL_MS_DEFAULT: u64 = 10;

/// Smallest accepted liveness check period [ms].
pub const WATCHDOG_CHECK_INTERVAL_MS_MIN: u64 = 1;

/// Largest accepted liveness check period [ms] (half the liveness timeout).
pub const WATCHDOG_CHECK_INTERVAL_MS_MAX: u64 = (LIVENESS_TIMEOUT_NS / 2 / 1_000_000) as u64;

/// Default bounded drain wait for the evaluation worker on shutdown [ms].
pub const SHUTDOWN_GRACE_MS_DEFAULT: u64 = 100;

/// Smallest accepted shutdown drain wait [ms].
pub const SHUTDOWN_GRACE_MS_MIN: u64 = 1;

/// Largest accepted shutdown drain wait [ms].
pub const SHUTDOWN_GRACE_MS_MAX: u64 = 5_000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/crane/tandem_sync.toml";

const_assert!(RING_BUFFER_CAPACITY.is_power_of_two());
const_assert!(MAX_PROCESSING_WINDOW_NS < MAX_ALIGNMENT_DELTA_NS);
const_assert!(MAX_ALIGNMENT_DELTA_NS < LIVENESS_TIMEOUT_NS);
const_assert!(WATCHDOG_CHECK_INTERVAL_MS_DEFAULT <= WATCHDOG_CHECK_INTERVAL_MS_MAX);
