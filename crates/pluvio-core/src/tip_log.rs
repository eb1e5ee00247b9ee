//! Debounced log of rain-gauge bucket-tip timestamps.
//!
//! One physical tip can raise several GPIO edges as the bucket settles; the
//! log rejects any tip closer than [`DEBOUNCE_SECONDS`] to the previously
//! accepted one. Accepted timestamps go into a retained ring buffer that holds
//! the [`TIP_LOG_CAPACITY`] most recent events.

use log::{debug, warn};

use crate::EpochSeconds;
use crate::ring_buffer::RingBuffer;

/// Minimum spacing between two accepted tips.
pub const DEBOUNCE_SECONDS: EpochSeconds = 5;

/// Retained event capacity. At 0.3 mm per tip this is roughly 75 mm of rain,
/// well past anything a 32-minute report window can cover.
pub const TIP_LOG_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipEventLog {
    /// Timestamp of the most recent accepted tip, 0 = never.
    last_tip: EpochSeconds,
    events: RingBuffer<EpochSeconds, TIP_LOG_CAPACITY>,
}

impl TipEventLog {
    pub fn new() -> Self {
        Self {
            last_tip: 0,
            events: RingBuffer::new(),
        }
    }

    /// Records a tip at `now` unless it falls inside the debounce window.
    ///
    /// Returns whether the tip was accepted. A rejected tip leaves the log
    /// untouched.
    pub fn record_tip(&mut self, now: EpochSeconds) -> bool {
        if self.last_tip != 0 && now.saturating_sub(self.last_tip) < DEBOUNCE_SECONDS {
            debug!(
                "tip at {now} ignored (debounce, last accepted at {})",
                self.last_tip
            );
            return false;
        }
        self.last_tip = now;
        if self.events.push(now) {
            warn!("tip log full, oldest event dropped");
        }
        true
    }

    /// Oldest-to-newest traversal over all retained tip timestamps.
    pub fn events(&self) -> impl Iterator<Item = EpochSeconds> + '_ {
        self.events.iter().copied()
    }

    pub fn last_tip(&self) -> EpochSeconds {
        self.last_tip
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clears all events and the debounce timestamp. Called on cold boot.
    pub fn reset(&mut self) {
        self.last_tip = 0;
        self.events.clear();
    }

    /// Rebuilds a log from persisted parts. Events must arrive oldest first.
    pub(crate) fn restore(
        last_tip: EpochSeconds,
        events: impl Iterator<Item = EpochSeconds>,
    ) -> Self {
        let mut log = Self::new();
        for t in events {
            log.events.push(t);
        }
        log.last_tip = last_tip;
        log
    }
}

impl Default for TipEventLog {
    fn default() -> Self {
        Self::new()
    }
}
