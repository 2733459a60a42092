//! Reference lift scenarios: nominal tilt, tilt fault, silent crane and
//! recovery through reset.

use std::time::Duration;

use crane_common::command::{Command, CommandKind};
use crane_common::state::LiftState;
use crane_common::telemetry::CraneId;
use crane_sync::error::FaultReason;

use super::{MS, Rig, wait_until};

#[test]
fn nominal_tilt_keeps_lifting() {
    let rig = Rig::new();
    rig.service.start().unwrap();

    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 50.0, 0);

    assert_eq!(rig.service.calculate_tilt_delta(), Some(50.0));
    assert!(rig.service.aligned_pair().unwrap().is_well_aligned(100 * MS));
    assert!(!rig.service.is_stale_data_detected());
    assert_eq!(rig.service.state(), LiftState::Lifting);
    assert!(rig.service.command_history().is_empty());
    rig.service.stop();
}

#[test]
fn excessive_tilt_latches_fault_and_halts_both() {
    let rig = Rig::new();
    rig.service.start().unwrap();

    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 150.0, 0);

    assert_eq!(rig.service.state(), LiftState::Fault);
    assert_eq!(rig.a.count(CommandKind::HaltAll), 1);
    assert_eq!(rig.b.count(CommandKind::HaltAll), 1);
    assert_eq!(rig.service.command_history(), vec![Command::halt_all()]);
    assert_eq!(
        rig.service.last_fault_reason(),
        Some(FaultReason::TiltExceeded {
            delta_mm: 150.0,
            threshold_mm: 100.0
        })
    );
}

#[test]
fn tilt_boundary_is_strict() {
    let rig = Rig::new();
    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 100.0, 0);
    assert_eq!(rig.service.state(), LiftState::Lifting);

    let rig = Rig::new();
    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 100.001, 0);
    assert_eq!(rig.service.state(), LiftState::Fault);
}

#[test]
fn silent_crane_b_trips_watchdog() {
    let rig = Rig::new();
    let reasons = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = reasons.clone();
    rig.service.set_fault_listener(move |reason| sink.lock().push(reason.clone()));

    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 0.0, 0);
    std::thread::sleep(Duration::from_millis(160));

    assert!(wait_until(Duration::from_millis(500), || !reasons.lock().is_empty()));
    assert_eq!(rig.service.state(), LiftState::Fault);
    let reason = rig.service.last_fault_reason().unwrap();
    assert_eq!(reason.crane(), Some(CraneId::B));
    assert_eq!(reason.to_string(), "Communication timeout: B");
    assert_eq!(reasons.lock().as_slice(), &[reason]);
    assert_eq!(rig.a.count(CommandKind::HaltAll), 1);
    assert_eq!(rig.b.count(CommandKind::HaltAll), 1);
    assert!(!rig.service.watchdog().is_running());
}

#[test]
fn reset_then_start_recovers_clean() {
    let rig = Rig::new();
    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 150.0, 0);
    assert_eq!(rig.service.state(), LiftState::Fault);

    rig.service.reset();
    assert_eq!(rig.service.state(), LiftState::Idle);
    assert!(rig.service.command_history().is_empty());
    assert!(rig.service.latest_pulse(CraneId::A).is_none());
    assert!(rig.service.latest_pulse(CraneId::B).is_none());
    assert!(rig.service.aligned_pair().is_none());
    assert!(!rig.service.is_stale_data_detected());
    assert_eq!(rig.service.processing_time_ns(), None);
    assert_eq!(rig.service.last_fault_reason(), None);

    rig.service.start().unwrap();
    assert_eq!(rig.service.state(), LiftState::Lifting);
    assert!(rig.service.watchdog().is_running());
    rig.service.stop();
}

#[test]
fn routing_through_execute_command() {
    let rig = Rig::new();
    assert!(rig.service.execute_command(Command::halt(CraneId::A)));
    assert_eq!(rig.a.received(), vec![Command::halt(CraneId::A)]);
    assert!(rig.b.received().is_empty());

    assert!(rig.service.execute_command(Command::halt_all()));
    assert_eq!(rig.a.count(CommandKind::HaltAll), 1);
    assert_eq!(rig.b.count(CommandKind::HaltAll), 1);

    assert!(rig.service.execute_command(Command::move_crane(CraneId::B, 12.5)));
    assert_eq!(rig.b.count(CommandKind::Move), 1);
    assert_eq!(rig.a.count(CommandKind::Move), 0);
}

#[test]
fn move_rejected_during_fault_reaches_nobody() {
    let rig = Rig::new();
    rig.service.emergency_stop();
    rig.a.clear();
    rig.b.clear();

    assert!(!rig.service.execute_command(Command::move_both(10.0)));
    assert!(!rig.service.execute_command(Command::move_crane(CraneId::A, 10.0)));
    assert!(rig.a.received().is_empty());
    assert!(rig.b.received().is_empty());

    assert!(rig.service.execute_command(Command::calibrate(None)));
    assert!(rig.service.execute_command(Command::halt_all()));
    assert!(rig.service.execute_command(Command::emergency_stop()));
}

#[test]
fn alignment_listener_sees_every_evaluated_pair() {
    let rig = Rig::new();
    let tilts = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = tilts.clone();
    rig.service
        .set_alignment_listener(move |pair| sink.lock().push(pair.tilt_delta_mm()));
    rig.service.start().unwrap();

    rig.ingest(CraneId::A, 10.0, 0);
    rig.ingest(CraneId::B, 30.0, 0);
    rig.ingest(CraneId::B, 500.0, 300 * MS);
    rig.ingest(CraneId::A, 0.0, 300 * MS);

    // A alone: no pair. Then nominal, still-closest nominal, then fault.
    assert_eq!(tilts.lock().as_slice(), &[20.0, 20.0, 500.0]);
    assert_eq!(rig.service.state(), LiftState::Fault);
}
