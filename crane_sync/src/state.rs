//! State machine module root.
//!
//! The lift lifecycle lives in a single atomic cell; every transition is a
//! compare-and-swap so concurrent triggers resolve to exactly one winner.

pub mod machine;
