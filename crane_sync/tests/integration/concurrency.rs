//! Concurrent ingestion and fault latching.

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crane_common::command::CommandKind;
use crane_common::state::LiftState;
use crane_common::telemetry::{CraneId, TelemetryPulse};

use super::{MS, Rig, wait_until};

#[test]
fn racing_fault_sources_halt_exactly_once_per_episode() {
    let rig = Rig::new();
    let faults = Arc::new(AtomicUsize::new(0));
    let counter = faults.clone();
    rig.service.set_fault_listener(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    for episode in 1..=25 {
        rig.service.start().unwrap();
        let barrier = Barrier::new(4);
        thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    barrier.wait();
                    rig.service.emergency_stop();
                });
            }
            scope.spawn(|| {
                barrier.wait();
                rig.ingest(CraneId::A, 0.0, 0);
                rig.ingest(CraneId::B, 400.0, 0);
            });
            scope.spawn(|| {
                barrier.wait();
                rig.service.watchdog().check_at(i64::MAX);
            });
        });

        assert_eq!(rig.service.state(), LiftState::Fault);
        assert_eq!(rig.a.count(CommandKind::HaltAll), 1, "episode {episode}");
        assert_eq!(rig.b.count(CommandKind::HaltAll), 1, "episode {episode}");
        assert_eq!(faults.load(Ordering::SeqCst), episode);

        rig.service.reset();
        rig.a.clear();
        rig.b.clear();
    }
}

#[test]
fn background_ingestion_from_both_cranes() {
    let rig = Rig::new();
    rig.service.start().unwrap();

    thread::scope(|scope| {
        for crane in CraneId::ALL {
            let service = &rig.service;
            scope.spawn(move || {
                for i in 0..200_i64 {
                    let pulse = TelemetryPulse::new(crane, i as f64, i * MS);
                    service.ingest_telemetry(pulse).unwrap();
                }
            });
        }
    });

    assert!(wait_until(Duration::from_secs(1), || {
        rig.service.latest_pulse(CraneId::A).map(|p| p.device_timestamp_ns) == Some(199 * MS)
            && rig.service.latest_pulse(CraneId::B).map(|p| p.device_timestamp_ns) == Some(199 * MS)
    }));
    assert!(wait_until(Duration::from_secs(1), || rig.service.evaluations() > 0));
    assert!(rig.service.evaluations() <= 400);
    assert_eq!(rig.service.state(), LiftState::Lifting);
    assert_eq!(rig.service.calculate_tilt_delta(), Some(0.0));
    rig.service.stop();
}

#[test]
fn background_ingestion_detects_tilt() {
    let rig = Rig::new();
    rig.service.start().unwrap();
    rig.service
        .ingest_telemetry(TelemetryPulse::new(CraneId::A, 0.0, 0))
        .unwrap();
    rig.service
        .ingest_telemetry(TelemetryPulse::new(CraneId::B, 250.0, 0))
        .unwrap();

    assert!(wait_until(Duration::from_secs(1), || {
        rig.b.count(CommandKind::HaltAll) == 1
    }));
    assert_eq!(rig.service.state(), LiftState::Fault);
    assert_eq!(rig.a.count(CommandKind::HaltAll), 1);
}

#[test]
fn ingestion_does_not_wait_for_slow_listener() {
    let rig = Rig::new();
    rig.service
        .set_alignment_listener(|_| thread::sleep(Duration::from_millis(50)));
    rig.service.start().unwrap();
    rig.ingest_async(CraneId::A, 0);
    rig.ingest_async(CraneId::B, 0);
    thread::sleep(Duration::from_millis(5));

    let begin = Instant::now();
    for i in 1..=100 {
        rig.ingest_async(CraneId::A, i * MS);
        rig.ingest_async(CraneId::B, i * MS);
    }
    assert!(begin.elapsed() < Duration::from_millis(40));
    rig.service.stop();
}

#[test]
fn reordered_concurrent_pulses_keep_newest() {
    let rig = Rig::new();
    thread::scope(|scope| {
        for worker in 0..4_i64 {
            let service = &rig.service;
            scope.spawn(move || {
                for i in (0..250_i64).rev() {
                    let ts = i * 4 + worker;
                    service
                        .ingest_telemetry(TelemetryPulse::new(CraneId::A, ts as f64, ts))
                        .unwrap();
                }
            });
        }
    });
    assert_eq!(
        rig.service.latest_pulse(CraneId::A).map(|p| p.device_timestamp_ns),
        Some(999)
    );
}

impl Rig {
    fn ingest_async(&self, crane: CraneId, ts_ns: i64) {
        self.service
            .ingest_telemetry(TelemetryPulse::new(crane, 0.0, ts_ns))
            .unwrap();
    }
}
