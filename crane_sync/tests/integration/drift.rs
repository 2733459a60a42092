//! Clock drift between the two controllers.
//!
//! Crane A's controller clock starts 50 ms ahead of B's and gains 30 ms per
//! second. After 5 s of B time the raw timestamps are 200 ms apart.

use crane_common::state::LiftState;
use crane_common::telemetry::CraneId;
use crane_sync::config::SyncConfig;

use super::{MS, Rig};

const OFFSET_NS: i64 = 50 * MS;
const RATE: f64 = 0.03;
const ELAPSED_B_NS: i64 = 5_000_000_000;

fn clock_a(ts_b: i64) -> i64 {
    OFFSET_NS + (ts_b as f64 * (1.0 + RATE)).round() as i64
}

fn drift_rig() -> Rig {
    let mut config = SyncConfig::default();
    config.drift.enabled = true;
    Rig::with_config(&config)
}

#[test]
fn uncompensated_drift_reads_as_stale() {
    let rig = Rig::new();
    rig.ingest(CraneId::A, 100.0, clock_a(ELAPSED_B_NS));
    rig.ingest(CraneId::B, 80.0, ELAPSED_B_NS);

    assert!(rig.service.is_stale_data_detected());
    assert!(!rig.service.calibrate_clocks(OFFSET_NS, 0));
    assert!(rig.service.drift_model().is_none());
}

#[test]
fn compensated_drift_realigns_pair() {
    let rig = drift_rig();
    assert!(rig.service.calibrate_clocks(clock_a(0), 0));
    assert!(rig.service.update_drift(clock_a(1_000_000_000), 1_000_000_000));
    let model = rig.service.drift_model().unwrap();
    assert!((model.rate - RATE).abs() < 1e-9);

    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 100.0, clock_a(ELAPSED_B_NS));
    rig.ingest(CraneId::B, 80.0, ELAPSED_B_NS);

    let pair = rig.service.aligned_pair().unwrap();
    assert!(pair.timestamp_gap_ns() < MS);
    assert_eq!(pair.pulse_a.device_timestamp_ns, clock_a(ELAPSED_B_NS));
    assert!(!rig.service.is_stale_data_detected());
    assert_eq!(rig.service.calculate_tilt_delta(), Some(20.0));
    assert_eq!(rig.service.state(), LiftState::Lifting);
    rig.service.stop();
}

#[test]
fn offset_only_calibration_without_rate() {
    let rig = drift_rig();
    rig.service.calibrate_clocks(OFFSET_NS, 0);

    // Early in the lift the offset dominates and rate is still unknown.
    rig.ingest(CraneId::A, 100.0, clock_a(100 * MS));
    rig.ingest(CraneId::B, 80.0, 100 * MS);
    assert!(!rig.service.is_stale_data_detected());

    // Uncorrected rate accumulates past the window.
    rig.service.reset();
    rig.ingest(CraneId::A, 100.0, clock_a(ELAPSED_B_NS));
    rig.ingest(CraneId::B, 80.0, ELAPSED_B_NS);
    assert!(rig.service.is_stale_data_detected());
}

#[test]
fn drift_update_requires_calibration() {
    let rig = drift_rig();
    assert!(!rig.service.update_drift(clock_a(MS), MS));
    rig.service.calibrate_clocks(clock_a(10 * MS), 10 * MS);
    assert!(!rig.service.update_drift(clock_a(5 * MS), 5 * MS));
}

#[test]
fn reset_keeps_calibration() {
    let rig = drift_rig();
    rig.service.calibrate_clocks(clock_a(0), 0);
    rig.service.update_drift(clock_a(1_000_000_000), 1_000_000_000);
    let before = rig.service.drift_model();
    rig.service.reset();
    assert_eq!(rig.service.drift_model(), before);
}
