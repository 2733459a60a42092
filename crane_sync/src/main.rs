//! # Tandem Sync Daemon
//!
//! Runs the interlock against two simulated cranes. Both hoists climb at the
//! configured speed; a non-zero `divergence_mm_s` makes crane B outrun A
//! until the tilt limit trips, and `silent_crane` cuts one telemetry stream
//! halfway through to exercise the liveness watchdog.

use clap::Parser;
use crane_common::command::Command;
use crane_common::config::LogLevel;
use crane_common::consts::TILT_THRESHOLD_MM;
use crane_common::state::LiftState;
use crane_common::telemetry::CraneId;
use crane_sync::config::SyncConfig;
use crane_sync::service::TandemSyncService;
use crane_sync::sim::{LiftProfile, SimulatedMotor};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Tandem Sync: two-crane tandem lift safety interlock
#[derive(Parser, Debug)]
#[command(name = "crane_sync")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Tilt and liveness interlock for two-crane tandem lifts")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply if it is missing.
    #[arg(default_value = "config/tandem_sync.toml")]
    config: PathBuf,

    /// Override `simulation.duration_ms`.
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Override `simulation.divergence_mm_s`.
    #[arg(long)]
    divergence: Option<f64>,

    /// Override `simulation.silent_crane` (A or B).
    #[arg(long)]
    silent_crane: Option<CraneId>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);
    let level = match &config {
        Ok(config) => config.shared.log_level,
        Err(_) => LogLevel::Info,
    };
    setup_tracing(&args, level);

    info!("Tandem Sync v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(|config| run(&config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Tandem Sync shutdown complete");
}

fn load_config(args: &Args) -> Result<SyncConfig, crane_common::config::ConfigError> {
    let mut config = if args.config.exists() {
        SyncConfig::load_validated(&args.config)?
    } else {
        SyncConfig::default()
    };

    if let Some(duration_ms) = args.duration_ms {
        config.simulation.duration_ms = duration_ms;
    }
    if let Some(divergence) = args.divergence {
        config.simulation.divergence_mm_s = divergence;
    }
    if let Some(crane) = args.silent_crane {
        config.simulation.silent_crane = crane.to_string();
    }
    config.validate()?;
    Ok(config)
}

fn run(config: &SyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let sim = &config.simulation;
    let silent = sim.silent_crane()?;
    let profile = LiftProfile::new(sim.lift_velocity_mm_s, sim.divergence_mm_s);
    let interval = Duration::from_millis(sim.pulse_interval_ms);
    let duration = Duration::from_millis(sim.duration_ms);

    info!(
        service = %config.shared.service_name,
        velocity_mm_s = sim.lift_velocity_mm_s,
        divergence_mm_s = sim.divergence_mm_s,
        silent = ?silent,
        expected_tilt_trip_ms = profile.tilt_crossing_ns(TILT_THRESHOLD_MM).map(|ns| ns / 1_000_000),
        "simulation configured"
    );

    let motors = [
        Arc::new(SimulatedMotor::new(CraneId::A)),
        Arc::new(SimulatedMotor::new(CraneId::B)),
    ];
    let service = TandemSyncService::with_config(motors[0].clone(), motors[1].clone(), config)?;

    let aligned = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&aligned);
    service.set_alignment_listener(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    service.set_fault_listener(|reason| warn!(%reason, "fault reported"));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    service.start()?;
    service.execute_command(Command::move_both(sim.lift_velocity_mm_s));

    let started = Instant::now();
    thread::scope(|scope| {
        for crane in CraneId::ALL {
            let motor = &motors[crane.index()];
            let service = &service;
            let running = &running;
            scope.spawn(move || {
                let mut tick: i64 = 0;
                let mut frozen_mm = None;
                while running.load(Ordering::SeqCst) && started.elapsed() < duration {
                    if service.state() == LiftState::Fault {
                        break;
                    }
                    let device_ts = tick * interval.as_nanos() as i64;
                    tick += 1;

                    let gone_silent =
                        silent == Some(crane) && started.elapsed() >= duration / 2;
                    if !gone_silent {
                        let mut pulse = profile.pulse_at(crane, device_ts);
                        if motor.is_halted() {
                            pulse.z_axis_mm = *frozen_mm.get_or_insert(pulse.z_axis_mm);
                        }
                        if service.ingest_telemetry(pulse).is_err() {
                            break;
                        }
                    }
                    thread::sleep(interval);
                }
            });
        }
    });

    // Give the watchdog a chance to observe a silent crane before summary.
    if silent.is_some() && service.state() != LiftState::Fault {
        thread::sleep(interval * 10);
    }

    info!(
        state = %service.state(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        evaluations = service.evaluations(),
        aligned_pairs = aligned.load(Ordering::Relaxed),
        commands = service.command_history().len(),
        tilt_mm = service.calculate_tilt_delta(),
        processing_us = service.processing_time_ns().map(|ns| ns / 1_000),
        within_window = service.was_processing_within_window(),
        fault = service.last_fault_reason().map(|r| r.to_string()).as_deref(),
        "simulation finished"
    );

    service.shutdown();
    Ok(())
}

fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
