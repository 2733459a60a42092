//! Crane Common Library
//!
//! Shared value types, contract constants and configuration loading
//! utilities for the tandem crane workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Safety contract constants and configuration bounds
//! - [`telemetry`] - Crane ids, telemetry pulses and aligned pairs
//! - [`command`] - Actuator commands
//! - [`state`] - Tandem lift lifecycle state
//! - [`motor`] - Motor controller contract
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use crane_common::prelude::*;
//!
//! let pulse = TelemetryPulse::new(CraneId::A, 1250.0, 0);
//! assert_eq!(pulse.crane_id, CraneId::A);
//! assert!(TILT_THRESHOLD_MM > 0.0);
//! ```

pub mod command;
pub mod config;
pub mod consts;
pub mod motor;
pub mod prelude;
pub mod state;
pub mod telemetry;
