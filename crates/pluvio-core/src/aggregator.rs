//! Builds one report record from the tip event log.
//!
//! The window ends at the last interval boundary at or before `now` and
//! reaches back [`ENTRY_DURATION`](crate::report::ENTRY_DURATION) seconds.
//! Every retained event is fed through the record's filter; events outside
//! the window are simply not this record's business and stay in the log.
//! Processed events are not removed either: they age out of the ring buffer
//! naturally, and consumers de-duplicate overlapping windows via
//! `window_end` + `instance_id`.

use log::{debug, info, warn};

use crate::EpochSeconds;
use crate::platform::AmbientReadings;
use crate::report::{INTERVAL_DURATION, ReportRecord, TipCount};
use crate::tip_log::TipEventLog;

/// Aligns `now` down to the previous interval boundary.
pub fn align_window_end(now: EpochSeconds) -> EpochSeconds {
    (now / INTERVAL_DURATION) * INTERVAL_DURATION
}

/// Builds the record covering the trailing aligned window at `now`.
///
/// Always produces exactly one record, however sparse the log is.
pub fn build_report(
    log: &TipEventLog,
    now: EpochSeconds,
    readings: AmbientReadings,
) -> ReportRecord {
    let window_end = align_window_end(now);
    let mut record = ReportRecord::for_window_ending(window_end);
    record.clear_bitmask();
    record.temperature = readings.temperature;
    record.pressure = readings.pressure;
    record.humidity = readings.humidity;

    debug!(
        "building report for window [{}, {window_end})",
        record.window_start()
    );

    let mut processed = 0usize;
    let mut in_window = 0usize;
    let mut saturated = 0usize;
    for event_ts in log.events() {
        processed += 1;
        match record.increment_tip_count(event_ts) {
            TipCount::Counted => in_window += 1,
            TipCount::OutOfWindow => {}
            TipCount::Saturated => saturated += 1,
        }
    }

    info!("report window {window_end}: {in_window} of {processed} logged tips in window");
    if saturated > 0 {
        warn!("{saturated} tips capped by saturated interval counters");
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ENTRY_DURATION, MAX_TIPS_PER_INTERVAL};

    #[test]
    fn window_aligns_down_to_interval_boundary() {
        assert_eq!(align_window_end(36_000), 36_000);
        assert_eq!(align_window_end(36_119), 36_000);
        assert_eq!(align_window_end(36_120), 36_120);
    }

    #[test]
    fn events_filtered_into_expected_intervals() {
        let mut log = TipEventLog::new();
        log.record_tip(34_079); // one second before the window
        log.record_tip(34_200); // interval index 1
        log.record_tip(35_990); // last interval
        log.record_tip(36_010); // after the aligned end

        let record = build_report(&log, 36_000, AmbientReadings::default());
        assert_eq!(record.window_end, 36_000);
        assert_eq!(record.window_start(), 36_000 - ENTRY_DURATION);
        assert_eq!(record.total_tips(), 2);
        assert_eq!(record.tip_count(1), 1);
        assert_eq!(record.tip_count(15), 1);
        // filtering never consumes the log
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn unaligned_now_still_produces_aligned_window() {
        let log = TipEventLog::new();
        let record = build_report(&log, 36_115, AmbientReadings::default());
        assert_eq!(record.window_end, 36_000);
    }

    #[test]
    fn ambient_readings_copied_into_record() {
        let log = TipEventLog::new();
        let readings = AmbientReadings {
            temperature: 19,
            pressure: 101,
            humidity: 77,
        };
        let record = build_report(&log, 36_000, readings);
        assert_eq!(record.temperature, 19);
        assert_eq!(record.pressure, 101);
        assert_eq!(record.humidity, 77);
    }

    #[test]
    fn burst_beyond_counter_max_is_capped() {
        let mut log = TipEventLog::new();
        // 20 tips inside one 120 s sub-interval, spaced at the debounce limit
        for i in 0..20u32 {
            assert!(log.record_tip(34_080 + i * 5));
        }
        let record = build_report(&log, 36_000, AmbientReadings::default());
        assert_eq!(record.tip_count(0), MAX_TIPS_PER_INTERVAL);
    }
}
