//! Safety module root.
//!
//! Alignment and tilt evaluation of the best-matched telemetry pair.

pub mod evaluator;
