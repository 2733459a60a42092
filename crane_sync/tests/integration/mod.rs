//! Shared rig for the integration suites.

mod concurrency;
mod drift;
mod jitter;
mod lifecycle;
mod scenarios;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crane_common::telemetry::{CraneId, TelemetryPulse};
use crane_sync::config::SyncConfig;
use crane_sync::service::TandemSyncService;
use crane_sync::sim::SimulatedMotor;

pub const MS: i64 = 1_000_000;

/// Service plus the two motors it drives.
pub struct Rig {
    pub service: TandemSyncService,
    pub a: Arc<SimulatedMotor>,
    pub b: Arc<SimulatedMotor>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(&SyncConfig::default())
    }

    pub fn with_config(config: &SyncConfig) -> Self {
        let a = Arc::new(SimulatedMotor::new(CraneId::A));
        let b = Arc::new(SimulatedMotor::new(CraneId::B));
        let service = TandemSyncService::with_config(a.clone(), b.clone(), config)
            .expect("service construction");
        Self { service, a, b }
    }

    pub fn ingest(&self, crane: CraneId, z_mm: f64, ts_ns: i64) {
        self.service
            .ingest_telemetry_sync(TelemetryPulse::new(crane, z_mm, ts_ns))
            .expect("ingest");
    }
}

/// Poll `done` until it holds or `timeout` elapses. Returns the final value.
pub fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if done() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}
