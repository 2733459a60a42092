//! # Tandem Crane Sync
//!
//! Real-time safety interlock for two cranes sharing one load. Pulses from
//! both hoists are paired by timestamp; an unsafe tilt, a silent crane or an
//! operator emergency stop latches `Fault` and broadcasts `HaltAll` to both
//! motor controllers exactly once per episode.
//!
//! ## Modules
//!
//! - [`service`] - `TandemSyncService`, the public orchestrator
//! - [`telemetry`] - lock-free pulse rings, latest-pulse slots, pairing, drift model
//! - [`safety`] - alignment and tilt evaluation
//! - [`state`] - atomic lift state machine
//! - [`command`] - admission policy and controller routing
//! - [`watchdog`] - per-crane liveness detection
//! - [`worker`] - coalescing evaluation worker
//! - [`listener`] - single-consumer notification slots
//! - [`clock`] - monotonic nanosecond clock
//! - [`config`] - TOML configuration
//! - [`error`] - error and fault taxonomy
//! - [`sim`] - simulated motors and lift profile
//!
//! ## Hot Path
//!
//! Ingestion never takes a lock: ring slots and latest slots are atomically
//! swapped references, the write index is an atomic counter and the state is
//! a single `AtomicU8`. Evaluation runs on one worker thread.

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod listener;
pub mod safety;
pub mod service;
pub mod sim;
pub mod state;
pub mod telemetry;
pub mod watchdog;
pub mod worker;
