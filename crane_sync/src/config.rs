//! TOML configuration for the tandem sync service and its daemon.
//!
//! Only operational knobs live here. The safety contract values (tilt
//! threshold, liveness timeout, alignment window, processing window, ring
//! capacity) are compile-time constants in `crane_common::consts`.

use std::path::Path;
use std::time::Duration;

use crane_common::config::{ConfigError, ConfigLoader, SharedConfig};
use crane_common::consts::{
    SHUTDOWN_GRACE_MS_DEFAULT, SHUTDOWN_GRACE_MS_MAX, SHUTDOWN_GRACE_MS_MIN,
    WATCHDOG_CHECK_INTERVAL_MS_DEFAULT, WATCHDOG_CHECK_INTERVAL_MS_MAX,
    WATCHDOG_CHECK_INTERVAL_MS_MIN,
};
use crane_common::telemetry::CraneId;
use serde::{Deserialize, Serialize};

// ─── Sections ───────────────────────────────────────────────────────

/// `[watchdog]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Liveness check period [ms]; at most half the liveness timeout.
    pub check_interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: WATCHDOG_CHECK_INTERVAL_MS_DEFAULT,
        }
    }
}

/// `[worker]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Bounded wait for the evaluation worker to drain on shutdown [ms].
    pub shutdown_grace_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: SHUTDOWN_GRACE_MS_DEFAULT,
        }
    }
}

/// `[drift]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriftConfig {
    /// Project crane A's device clock onto crane B's once calibrated.
    pub enabled: bool,
}

/// `[simulation]` section, read by the daemon only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Total run time [ms].
    pub duration_ms: u64,
    /// Period between pulses of one crane [ms].
    pub pulse_interval_ms: u64,
    /// Common hoist speed [mm/s].
    pub lift_velocity_mm_s: f64,
    /// Extra speed of crane B [mm/s]; non-zero eventually trips the tilt limit.
    pub divergence_mm_s: f64,
    /// `"A"` or `"B"` stops reporting halfway through; empty for none.
    pub silent_crane: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2_000,
            pulse_interval_ms: 20,
            lift_velocity_mm_s: 50.0,
            divergence_mm_s: 0.0,
            silent_crane: String::new(),
        }
    }
}

impl SimulationConfig {
    /// Crane configured to go silent.
    pub fn silent_crane(&self) -> Result<Option<CraneId>, ConfigError> {
        let name = self.silent_crane.trim();
        if name.is_empty() {
            return Ok(None);
        }
        name.parse()
            .map(Some)
            .map_err(|e| ConfigError::ValidationError(format!("simulation.silent_crane: {e}")))
    }
}

// ─── Root ───────────────────────────────────────────────────────────

/// Complete service configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "tandem-sync-01"
///
/// [watchdog]
/// check_interval_ms = 5
///
/// [drift]
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub shared: SharedConfig,
    pub watchdog: WatchdogConfig,
    pub worker: WorkerConfig,
    pub drift: DriftConfig,
    pub simulation: SimulationConfig,
}

impl SyncConfig {
    /// Load and validate a configuration file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate an in-memory TOML document.
    pub fn from_toml_validated(content: &str) -> Result<Self, ConfigError> {
        let config = Self::from_toml(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let interval = self.watchdog.check_interval_ms;
        if !(WATCHDOG_CHECK_INTERVAL_MS_MIN..=WATCHDOG_CHECK_INTERVAL_MS_MAX).contains(&interval) {
            return Err(ConfigError::ValidationError(format!(
                "watchdog.check_interval_ms = {interval} outside \
                 [{WATCHDOG_CHECK_INTERVAL_MS_MIN}, {WATCHDOG_CHECK_INTERVAL_MS_MAX}]"
            )));
        }

        let grace = self.worker.shutdown_grace_ms;
        if !(SHUTDOWN_GRACE_MS_MIN..=SHUTDOWN_GRACE_MS_MAX).contains(&grace) {
            return Err(ConfigError::ValidationError(format!(
                "worker.shutdown_grace_ms = {grace} outside \
                 [{SHUTDOWN_GRACE_MS_MIN}, {SHUTDOWN_GRACE_MS_MAX}]"
            )));
        }

        let sim = &self.simulation;
        if sim.pulse_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.pulse_interval_ms must be > 0".to_string(),
            ));
        }
        if !sim.lift_velocity_mm_s.is_finite() || !sim.divergence_mm_s.is_finite() {
            return Err(ConfigError::ValidationError(
                "simulation velocities must be finite".to_string(),
            ));
        }
        sim.silent_crane()?;
        Ok(())
    }

    /// Watchdog check period.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog.check_interval_ms)
    }

    /// Worker drain wait.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.worker.shutdown_grace_ms)
    }
}
