//! Delivery jitter: late and reordered telemetry.

use std::thread;
use std::time::Duration;

use crane_common::command::Command;
use crane_common::state::LiftState;
use crane_common::telemetry::CraneId;

use super::{MS, Rig};

#[test]
fn gap_just_over_window_is_stale() {
    let rig = Rig::new();
    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 0.0, 100_000_001);

    assert!(rig.service.is_stale_data_detected());
    assert_eq!(rig.service.state(), LiftState::Lifting);
    assert!(!rig.service.execute_command(Command::move_both(10.0)));
    rig.service.stop();
}

#[test]
fn alignment_boundary() {
    let rig = Rig::new();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 0.0, 100 * MS);
    assert!(rig.service.is_stale_data_detected());

    let rig = Rig::new();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 0.0, 99 * MS);
    assert!(!rig.service.is_stale_data_detected());
}

#[test]
fn stale_data_masks_tilt_until_realigned() {
    let rig = Rig::new();
    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 500.0, 150 * MS);
    assert!(rig.service.is_stale_data_detected());
    assert_eq!(rig.service.state(), LiftState::Lifting);

    rig.ingest(CraneId::A, 0.0, 140 * MS);
    assert!(!rig.service.is_stale_data_detected());
    assert_eq!(rig.service.state(), LiftState::Fault);
}

#[test]
fn stale_flag_clears_when_alignment_recovers() {
    let rig = Rig::new();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 0.0, 300 * MS);
    assert!(rig.service.is_stale_data_detected());

    rig.ingest(CraneId::A, 0.0, 310 * MS);
    assert!(!rig.service.is_stale_data_detected());
    assert!(rig.service.execute_command(Command::move_both(10.0)));
}

#[test]
fn late_arrival_is_stale_even_with_matching_timestamps() {
    let rig = Rig::new();
    rig.ingest(CraneId::A, 0.0, 0);
    thread::sleep(Duration::from_millis(110));
    rig.ingest(CraneId::B, 0.0, 0);

    let pair = rig.service.aligned_pair().unwrap();
    assert_eq!(pair.timestamp_gap_ns(), 0);
    assert!(pair.arrival_gap_ns() > 100 * MS);
    assert!(rig.service.is_stale_data_detected());
}

#[test]
fn reordered_delivery_keeps_newest_latest() {
    let rig = Rig::new();
    rig.ingest(CraneId::A, 20.0, 50 * MS);
    rig.ingest(CraneId::A, 10.0, 30 * MS);

    let latest = rig.service.latest_pulse(CraneId::A).unwrap();
    assert_eq!(latest.device_timestamp_ns, 50 * MS);
    assert_eq!(latest.z_axis_mm, 20.0);
}

#[test]
fn closest_pair_survives_out_of_order_history() {
    let rig = Rig::new();
    rig.ingest(CraneId::A, 0.0, 40 * MS);
    rig.ingest(CraneId::B, 5.0, 0);
    rig.ingest(CraneId::A, 1.0, 2 * MS);

    let pair = rig.service.aligned_pair().unwrap();
    assert_eq!(pair.pulse_a.device_timestamp_ns, 2 * MS);
    assert_eq!(rig.service.calculate_tilt_delta(), Some(4.0));
}
