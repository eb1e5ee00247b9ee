//! Fixed-size aggregated weather report record.
//!
//! One record covers a trailing [`ENTRY_DURATION`]-second window aligned to an
//! interval boundary, split into [`NUM_INTERVALS`] sub-intervals. Tip counts
//! are packed two per byte as 4-bit nibbles, low nibble first.
//!
//! Binary image (little-endian, 15 bytes):
//! - window_end: 4 bytes (u32)
//! - temperature, pressure, humidity: 1 byte each
//! - tip_bitmask: 8 bytes (16 × 4-bit counters)

use serde::{Deserialize, Serialize};

use crate::EpochSeconds;

/// Length of the window one record covers: 32 minutes, so a 30-minute report
/// cadence always has one full spare interval of overlap.
pub const ENTRY_DURATION: EpochSeconds = 1_920;

/// Sub-intervals per record.
pub const NUM_INTERVALS: usize = 16;

/// Bits per tip counter.
pub const BITS_PER_INTERVAL: usize = 4;

/// Packed size of the counter array.
pub const BITMASK_SIZE_BYTES: usize = (NUM_INTERVALS * BITS_PER_INTERVAL + 7) / 8;

/// A counter saturates here; further tips in the same sub-interval are lost.
pub const MAX_TIPS_PER_INTERVAL: u8 = (1 << BITS_PER_INTERVAL) - 1;

/// Length of one sub-interval: 120 s.
pub const INTERVAL_DURATION: EpochSeconds = ENTRY_DURATION / NUM_INTERVALS as u32;

/// Size of the persisted binary image.
pub const RECORD_IMAGE_BYTES: usize = 4 + 3 + BITMASK_SIZE_BYTES;

/// Result of counting one tip event into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum TipCount {
    /// Counted into its sub-interval.
    Counted,
    /// Event falls outside the record's half-open window; filtered, not an
    /// error.
    OutOfWindow,
    /// The sub-interval counter is already at [`MAX_TIPS_PER_INTERVAL`]; the
    /// tip is capped, a documented lossy degradation.
    Saturated,
}

impl TipCount {
    pub fn is_counted(self) -> bool {
        matches!(self, Self::Counted)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Aligned end of the covered interval.
    pub window_end: EpochSeconds,
    pub temperature: u8,
    pub pressure: u8,
    pub humidity: u8,
    tip_bitmask: [u8; BITMASK_SIZE_BYTES],
}

impl ReportRecord {
    /// Creates an empty record for the window ending at `window_end`.
    ///
    /// `window_end` is expected to be aligned to [`INTERVAL_DURATION`]; the
    /// aggregator is responsible for the alignment.
    pub fn for_window_ending(window_end: EpochSeconds) -> Self {
        Self {
            window_end,
            ..Self::default()
        }
    }

    /// Inclusive start of the covered window.
    pub fn window_start(&self) -> EpochSeconds {
        self.window_end.saturating_sub(ENTRY_DURATION)
    }

    pub fn clear_bitmask(&mut self) {
        self.tip_bitmask = [0; BITMASK_SIZE_BYTES];
    }

    /// Reads the tip counter for a sub-interval. Out-of-range indices read 0.
    pub fn tip_count(&self, interval_index: usize) -> u8 {
        if interval_index >= NUM_INTERVALS {
            return 0;
        }
        let byte = self.tip_bitmask[interval_index / 2];
        if interval_index % 2 != 0 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    /// Writes a tip counter, clamping to [`MAX_TIPS_PER_INTERVAL`].
    ///
    /// Returns `false` for an out-of-range index.
    pub fn set_tip_count(&mut self, interval_index: usize, count: u8) -> bool {
        if interval_index >= NUM_INTERVALS {
            return false;
        }
        let count = count.min(MAX_TIPS_PER_INTERVAL);
        let byte = &mut self.tip_bitmask[interval_index / 2];
        if interval_index % 2 != 0 {
            *byte = (*byte & 0x0F) | (count << 4);
        } else {
            *byte = (*byte & 0xF0) | count;
        }
        true
    }

    /// Counts one tip event into the sub-interval covering `event_ts`.
    ///
    /// Events outside `[window_start, window_end)` are filtered; a counter at
    /// its maximum rejects the increment instead of wrapping.
    pub fn increment_tip_count(&mut self, event_ts: EpochSeconds) -> TipCount {
        let start = self.window_start();
        if event_ts < start || event_ts >= self.window_end {
            return TipCount::OutOfWindow;
        }
        let idx = ((event_ts - start) / INTERVAL_DURATION) as usize;
        let current = self.tip_count(idx);
        if current >= MAX_TIPS_PER_INTERVAL {
            return TipCount::Saturated;
        }
        self.set_tip_count(idx, current + 1);
        TipCount::Counted
    }

    pub fn tip_bitmask(&self) -> &[u8; BITMASK_SIZE_BYTES] {
        &self.tip_bitmask
    }

    /// Sum of all sub-interval counters.
    pub fn total_tips(&self) -> u32 {
        (0..NUM_INTERVALS).map(|i| self.tip_count(i) as u32).sum()
    }

    /// Converts the record to its binary image for retained storage.
    pub fn to_bytes(&self) -> [u8; RECORD_IMAGE_BYTES] {
        let mut bytes = [0u8; RECORD_IMAGE_BYTES];
        bytes[0..4].copy_from_slice(&self.window_end.to_le_bytes());
        bytes[4] = self.temperature;
        bytes[5] = self.pressure;
        bytes[6] = self.humidity;
        bytes[7..].copy_from_slice(&self.tip_bitmask);
        bytes
    }

    /// Rebuilds a record from its binary image.
    pub fn from_bytes(bytes: &[u8; RECORD_IMAGE_BYTES]) -> Self {
        let mut window_end_bytes = [0u8; 4];
        window_end_bytes.copy_from_slice(&bytes[0..4]);
        let mut tip_bitmask = [0u8; BITMASK_SIZE_BYTES];
        tip_bitmask.copy_from_slice(&bytes[7..]);

        Self {
            window_end: u32::from_le_bytes(window_end_bytes),
            temperature: bytes[4],
            pressure: bytes[5],
            humidity: bytes[6],
            tip_bitmask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_constants() {
        assert_eq!(INTERVAL_DURATION, 120);
        assert_eq!(BITMASK_SIZE_BYTES, 8);
        assert_eq!(MAX_TIPS_PER_INTERVAL, 15);
        assert_eq!(RECORD_IMAGE_BYTES, 15);
    }

    #[test]
    fn tip_count_round_trip_all_values() {
        let mut record = ReportRecord::for_window_ending(36_000);
        for idx in 0..NUM_INTERVALS {
            for count in 0..=MAX_TIPS_PER_INTERVAL {
                assert!(record.set_tip_count(idx, count));
                assert_eq!(record.tip_count(idx), count);
            }
        }
    }

    #[test]
    fn set_tip_count_does_not_disturb_neighbors() {
        let mut record = ReportRecord::for_window_ending(36_000);
        record.set_tip_count(4, 9);
        record.set_tip_count(5, 3);
        assert_eq!(record.tip_count(4), 9);
        assert_eq!(record.tip_count(5), 3);
    }

    #[test]
    fn set_tip_count_clamps_and_bounds_checks() {
        let mut record = ReportRecord::for_window_ending(36_000);
        assert!(record.set_tip_count(0, 200));
        assert_eq!(record.tip_count(0), MAX_TIPS_PER_INTERVAL);
        assert!(!record.set_tip_count(NUM_INTERVALS, 1));
        assert_eq!(record.tip_count(NUM_INTERVALS), 0);
    }

    #[test]
    fn increment_saturates_without_wrapping() {
        let mut record = ReportRecord::for_window_ending(36_000);
        let ts = record.window_start();
        for _ in 0..MAX_TIPS_PER_INTERVAL {
            assert_eq!(record.increment_tip_count(ts), TipCount::Counted);
        }
        assert_eq!(record.tip_count(0), MAX_TIPS_PER_INTERVAL);
        assert_eq!(record.increment_tip_count(ts), TipCount::Saturated);
        assert_eq!(record.tip_count(0), MAX_TIPS_PER_INTERVAL);
    }

    #[test]
    fn window_is_half_open() {
        let mut record = ReportRecord::for_window_ending(36_000);
        assert_eq!(record.window_start(), 34_080);
        // event exactly at window_start is included
        assert_eq!(record.increment_tip_count(34_080), TipCount::Counted);
        // event exactly at window_end is excluded
        assert_eq!(record.increment_tip_count(36_000), TipCount::OutOfWindow);
        assert_eq!(record.increment_tip_count(34_079), TipCount::OutOfWindow);
        assert_eq!(record.total_tips(), 1);
    }

    #[test]
    fn event_lands_in_expected_interval() {
        let mut record = ReportRecord::for_window_ending(36_000);
        assert_eq!(record.increment_tip_count(34_200), TipCount::Counted);
        assert_eq!(record.tip_count(1), 1);
        // last interval of the window
        assert_eq!(record.increment_tip_count(35_999), TipCount::Counted);
        assert_eq!(record.tip_count(NUM_INTERVALS - 1), 1);
    }

    #[test]
    fn binary_image_round_trip() {
        let mut record = ReportRecord::for_window_ending(36_000);
        record.temperature = 21;
        record.pressure = 101;
        record.humidity = 63;
        record.set_tip_count(0, 3);
        record.set_tip_count(15, 12);

        let restored = ReportRecord::from_bytes(&record.to_bytes());
        assert_eq!(restored, record);
    }
}
