//! Store-and-forward queue of unconfirmed report records.
//!
//! Records that could not be published stay here across sleep cycles and are
//! retried oldest-first on the next reporting wake. The queue is bounded:
//! under a sustained outage the oldest unconfirmed record is overwritten,
//! trading bounded data loss for bounded memory.

use log::{error, warn};

use crate::report::ReportRecord;
use crate::ring_buffer::RingBuffer;

/// How many unconfirmed reports survive an outage: 10 cycles = 5 hours at the
/// default 30-minute cadence.
pub const DELIVERY_QUEUE_CAPACITY: usize = 10;

/// Outcome of one publish attempt during a drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Broker accepted the message; the record is confirmed and removed.
    Delivered,
    /// Transient failure; the record stays queued and the drain stops so
    /// delivery order is preserved.
    Failed,
    /// The record cannot be encoded and will never succeed; it is removed
    /// without delivery.
    Unencodable,
}

/// Counters from one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryQueue {
    queue: RingBuffer<ReportRecord, DELIVERY_QUEUE_CAPACITY>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a record for a later delivery attempt.
    ///
    /// Returns `true` when a full queue forced the oldest unconfirmed record
    /// to be overwritten.
    pub fn enqueue(&mut self, record: ReportRecord) -> bool {
        let overwrote = self.queue.push(record);
        if overwrote {
            warn!(
                "delivery queue full, oldest unconfirmed report overwritten (window {})",
                record.window_end
            );
        }
        overwrote
    }

    /// Retries queued records oldest-first.
    ///
    /// Stops at the first transient failure so records are never reordered
    /// relative to arrival; newer records stay queued for the next cycle even
    /// if they might have succeeded. The pass is bounded by the queue length
    /// at entry.
    pub fn drain_with(
        &mut self,
        mut attempt: impl FnMut(&ReportRecord) -> PublishOutcome,
    ) -> DrainStats {
        let mut stats = DrainStats::default();
        let mut stop = false;
        for _ in 0..self.queue.len() {
            if stop {
                break;
            }
            self.queue.retry_oldest(|record| match attempt(record) {
                PublishOutcome::Delivered => {
                    stats.delivered += 1;
                    true
                }
                PublishOutcome::Failed => {
                    stop = true;
                    false
                }
                PublishOutcome::Unencodable => {
                    error!(
                        "queued report (window {}) cannot be encoded, dropping it",
                        record.window_end
                    );
                    stats.dropped += 1;
                    true
                }
            });
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Oldest-to-newest view of the unconfirmed records.
    pub fn iter(&self) -> impl Iterator<Item = &ReportRecord> + '_ {
        self.queue.iter()
    }

    /// Discards all unconfirmed records. Called on cold boot.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Rebuilds a queue from persisted parts, oldest first.
    pub(crate) fn restore(records: impl Iterator<Item = ReportRecord>) -> Self {
        let mut queue = Self::new();
        for record in records {
            queue.queue.push(record);
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(window_end: u32) -> ReportRecord {
        ReportRecord::for_window_ending(window_end)
    }

    #[test]
    fn sustained_outage_keeps_newest_ten() {
        let mut queue = DeliveryQueue::new();
        let mut overwrites = 0;
        // 12 consecutive failed cycles while offline
        for i in 0..12u32 {
            if queue.enqueue(record(1_000 + i)) {
                overwrites += 1;
            }
        }
        assert_eq!(overwrites, 2);
        assert_eq!(queue.len(), DELIVERY_QUEUE_CAPACITY);
        let windows: Vec<u32> = queue.iter().map(|r| r.window_end).collect();
        assert_eq!(windows, (1_002..1_012).collect::<Vec<u32>>());
    }

    #[test]
    fn drain_stops_on_first_failure_without_reordering() {
        let mut queue = DeliveryQueue::new();
        for w in [100, 200, 300] {
            queue.enqueue(record(w));
        }

        // A delivers, B fails, C must not even be attempted
        let mut attempted = Vec::new();
        let stats = queue.drain_with(|r| {
            attempted.push(r.window_end);
            if r.window_end == 200 {
                PublishOutcome::Failed
            } else {
                PublishOutcome::Delivered
            }
        });

        assert_eq!(attempted, [100, 200]);
        assert_eq!(stats, DrainStats { delivered: 1, dropped: 0 });
        let remaining: Vec<u32> = queue.iter().map(|r| r.window_end).collect();
        assert_eq!(remaining, [200, 300]);
    }

    #[test]
    fn drain_delivers_everything_when_transport_is_healthy() {
        let mut queue = DeliveryQueue::new();
        for w in [100, 200, 300] {
            queue.enqueue(record(w));
        }
        let stats = queue.drain_with(|_| PublishOutcome::Delivered);
        assert_eq!(stats.delivered, 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn unencodable_records_dropped_and_drain_continues() {
        let mut queue = DeliveryQueue::new();
        for w in [100, 200, 300] {
            queue.enqueue(record(w));
        }
        let stats = queue.drain_with(|r| {
            if r.window_end == 100 {
                PublishOutcome::Unencodable
            } else {
                PublishOutcome::Delivered
            }
        });
        assert_eq!(stats, DrainStats { delivered: 2, dropped: 1 });
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_on_empty_queue_is_a_no_op() {
        let mut queue = DeliveryQueue::new();
        let stats = queue.drain_with(|_| PublishOutcome::Delivered);
        assert_eq!(stats, DrainStats::default());
    }

    #[test]
    fn restore_round_trip() {
        let mut queue = DeliveryQueue::new();
        queue.enqueue(record(100));
        queue.enqueue(record(200));
        let copy = DeliveryQueue::restore(queue.iter().copied());
        assert_eq!(copy, queue);
    }
}
