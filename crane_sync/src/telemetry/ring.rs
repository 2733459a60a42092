//! Lock-free per-crane pulse storage.
//!
//! `PulseRing` keeps the last `RING_BUFFER_CAPACITY` pulses in a fixed array
//! of atomically swapped slots, indexed by an atomically incremented write
//! counter. Two concurrent writers of the same crane may land on the same
//! slot; only the best cross-crane pair matters, so that loss is accepted.
//!
//! `LatestPulse` holds the newest pulse by device timestamp and never moves
//! backwards, which absorbs reordered delivery.

use arc_swap::ArcSwapOption;
use crane_common::consts::RING_BUFFER_CAPACITY;
use crane_common::telemetry::TelemetryPulse;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity FIFO history of one crane's pulses.
#[derive(Debug)]
pub struct PulseRing {
    slots: [ArcSwapOption<TelemetryPulse>; RING_BUFFER_CAPACITY],
    write_index: AtomicUsize,
}

impl PulseRing {
    /// Create an empty ring.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| ArcSwapOption::empty()),
            write_index: AtomicUsize::new(0),
        }
    }

    /// Store `pulse`, overwriting the oldest entry once full. O(1), never blocks.
    #[inline]
    pub fn record(&self, pulse: TelemetryPulse) {
        let index = self.write_index.fetch_add(1, Ordering::AcqRel) % RING_BUFFER_CAPACITY;
        self.slots[index].store(Some(Arc::new(pulse)));
    }

    /// Copy of every slot. Empty slots are `None`; order is slot order.
    pub fn snapshot(&self) -> [Option<TelemetryPulse>; RING_BUFFER_CAPACITY] {
        std::array::from_fn(|i| self.slots[i].load().as_deref().copied())
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.write_index
            .load(Ordering::Acquire)
            .min(RING_BUFFER_CAPACITY)
    }

    /// True if nothing has been recorded since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all history and rewind the write counter.
    pub fn clear(&self) {
        self.write_index.store(0, Ordering::Release);
        for slot in &self.slots {
            slot.store(None);
        }
    }
}

impl Default for PulseRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest-by-device-timestamp pulse of one crane.
#[derive(Debug, Default)]
pub struct LatestPulse {
    slot: ArcSwapOption<TelemetryPulse>,
}

impl LatestPulse {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// Replace the held pulse if `pulse` is strictly newer.
    ///
    /// Returns `true` if the slot now holds `pulse`.
    pub fn offer(&self, pulse: TelemetryPulse) -> bool {
        if let Some(held) = self.slot.load().as_deref() {
            if held.device_timestamp_ns >= pulse.device_timestamp_ns {
                return false;
            }
        }

        let incoming = Arc::new(pulse);
        let mut replaced = false;
        let _previous = self.slot.rcu(|current| match current {
            Some(held) if held.device_timestamp_ns >= incoming.device_timestamp_ns => {
                replaced = false;
                current.clone()
            }
            _ => {
                replaced = true;
                Some(Arc::clone(&incoming))
            }
        });
        replaced
    }

    /// Currently held pulse.
    pub fn get(&self) -> Option<TelemetryPulse> {
        self.slot.load().as_deref().copied()
    }

    /// Empty the slot.
    pub fn clear(&self) {
        self.slot.store(None);
    }
}
