//! Monotonic time source for arrival stamps, liveness marks and SLA timing.
//!
//! Reads `CLOCK_MONOTONIC` directly. All timestamps produced by this crate
//! share this single clock so differences between them are meaningful.

use nix::time::{ClockId, clock_gettime};
use std::sync::OnceLock;
use std::time::Instant;

/// Current monotonic time [ns].
#[inline]
pub fn monotonic_ns() -> i64 {
    match clock_gettime(ClockId::CLOCK_MONOTONIC) {
        Ok(ts) => ts.tv_sec() as i64 * 1_000_000_000 + ts.tv_nsec() as i64,
        Err(_) => fallback_ns(),
    }
}

// Only reached if the kernel refuses CLOCK_MONOTONIC.
fn fallback_ns() -> i64 {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    let anchor = ANCHOR.get_or_init(Instant::now);
    anchor.elapsed().as_nanos() as i64
}
