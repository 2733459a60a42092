//! Lifecycle transitions, SLA measurement and shutdown.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crane_common::command::{Command, CommandKind};
use crane_common::consts::MAX_PROCESSING_WINDOW_NS;
use crane_common::state::LiftState;
use crane_common::telemetry::{CraneId, TelemetryPulse};
use crane_sync::config::SyncConfig;
use crane_sync::error::SyncError;

use super::{MS, Rig};

#[test]
fn start_while_faulted_is_invalid() {
    let rig = Rig::new();
    rig.service.start().unwrap();
    rig.service.emergency_stop();

    let err = rig.service.start().unwrap_err();
    assert!(matches!(
        err,
        SyncError::InvalidOperation {
            operation: "start",
            state: LiftState::Fault
        }
    ));
    assert!(err.to_string().contains("manual reset required"));
    assert_eq!(rig.service.state(), LiftState::Fault);
}

#[test]
fn start_and_stop_cycle() {
    let rig = Rig::new();
    assert_eq!(rig.service.state(), LiftState::Idle);
    assert!(!rig.service.watchdog().is_running());

    rig.service.start().unwrap();
    rig.service.start().unwrap();
    assert_eq!(rig.service.state(), LiftState::Lifting);
    assert!(rig.service.watchdog().is_running());

    rig.service.stop();
    assert_eq!(rig.service.state(), LiftState::Idle);
    assert!(!rig.service.watchdog().is_running());
}

#[test]
fn reset_from_any_state_returns_idle() {
    let rig = Rig::new();
    rig.service.reset();
    assert_eq!(rig.service.state(), LiftState::Idle);

    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 0.0, 500 * MS);
    assert!(rig.service.is_stale_data_detected());
    rig.service.execute_command(Command::halt_all());

    rig.service.reset();
    assert_eq!(rig.service.state(), LiftState::Idle);
    assert!(!rig.service.is_stale_data_detected());
    assert!(rig.service.command_history().is_empty());
    assert!(rig.service.aligned_pair().is_none());
    assert!(!rig.service.watchdog().is_running());
}

#[test]
fn forced_tilt_meets_processing_window() {
    let rig = Rig::new();
    assert_eq!(rig.service.processing_time_ns(), None);
    assert!(!rig.service.was_processing_within_window());

    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 180.0, 0);

    let processing = rig.service.processing_time_ns().unwrap();
    assert!(processing >= 0);
    assert!(processing < MAX_PROCESSING_WINDOW_NS);
    assert!(rig.service.was_processing_within_window());

    let crossed = rig.service.threshold_crossed_timestamp_ns().unwrap();
    let halted = rig.service.halt_issued_timestamp_ns().unwrap();
    assert_eq!(halted - crossed, processing);
}

#[test]
fn halt_reaches_controllers_before_listeners() {
    let rig = Rig::new();
    let halts_seen = Arc::new(AtomicUsize::new(0));
    let (probe, a, b) = (halts_seen.clone(), rig.a.clone(), rig.b.clone());
    rig.service.set_command_listener(move |command| {
        if command.kind == CommandKind::HaltAll {
            probe.store(
                a.count(CommandKind::HaltAll) + b.count(CommandKind::HaltAll),
                Ordering::SeqCst,
            );
        }
    });

    rig.service.start().unwrap();
    rig.ingest(CraneId::A, 0.0, 0);
    rig.ingest(CraneId::B, 180.0, 0);
    assert_eq!(halts_seen.load(Ordering::SeqCst), 2);
}

#[test]
fn panicking_listener_cannot_block_halt() {
    let rig = Rig::new();
    rig.service.set_alignment_listener(|_| panic!("listener failure"));
    rig.service.start().unwrap();
    rig.service
        .ingest_telemetry(TelemetryPulse::new(CraneId::A, 0.0, 0))
        .unwrap();
    rig.service
        .ingest_telemetry(TelemetryPulse::new(CraneId::B, 10.0, 0))
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));

    rig.service
        .ingest_telemetry(TelemetryPulse::new(CraneId::A, 0.0, MS))
        .unwrap();
    rig.service
        .ingest_telemetry(TelemetryPulse::new(CraneId::B, 300.0, MS))
        .unwrap();
    assert!(super::wait_until(std::time::Duration::from_secs(1), || {
        rig.a.count(CommandKind::HaltAll) == 1
    }));
    assert_eq!(rig.service.state(), LiftState::Fault);
}

#[test]
fn shutdown_refuses_ingestion_and_is_idempotent() {
    let rig = Rig::new();
    rig.service.start().unwrap();
    rig.service.shutdown();
    rig.service.shutdown();

    assert_eq!(rig.service.state(), LiftState::Idle);
    assert!(!rig.service.watchdog().is_running());
    assert!(matches!(
        rig.service.ingest_telemetry(TelemetryPulse::new(CraneId::A, 0.0, 0)),
        Err(SyncError::ShutDown)
    ));
    assert!(matches!(
        rig.service.ingest_telemetry_sync(TelemetryPulse::new(CraneId::B, 0.0, 0)),
        Err(SyncError::ShutDown)
    ));
}

#[test]
fn service_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[shared]
service_name = "tandem-test"

[watchdog]
check_interval_ms = 5

[drift]
enabled = true
"#
    )
    .unwrap();

    let config = SyncConfig::load_validated(file.path()).unwrap();
    assert_eq!(config.watchdog.check_interval_ms, 5);

    let rig = Rig::with_config(&config);
    assert_eq!(
        rig.service.watchdog().check_interval(),
        std::time::Duration::from_millis(5)
    );
    assert!(rig.service.calibrate_clocks(0, 0));
}
