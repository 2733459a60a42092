//! Telemetry ingestion storage and cross-crane alignment.
//!
//! Per-crane pulse history lives in fixed lock-free rings; the aligner pairs
//! the histories of both cranes, optionally projecting crane A's clock onto
//! crane B's with the drift model.

pub mod aligner;
pub mod drift;
pub mod ring;
