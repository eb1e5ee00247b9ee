//! One reporting cycle: build, drain backlog, publish, re-queue on failure.
//!
//! The record for the current window is always built, whatever the network is
//! doing; the only question each cycle answers is whether it (and the backlog)
//! leaves the device now or on a later wake. No failure in here is fatal and
//! none propagates: the caller is the dispatcher, whose only remedy is to
//! sleep and try again next cycle.

use log::{error, info, warn};

use crate::EpochSeconds;
use crate::aggregator::build_report;
use crate::config::{MQTT_MSG_BUFFER_SIZE, NodeConfig};
use crate::delivery::{DrainStats, PublishOutcome};
use crate::encode::RecordEncoder;
use crate::platform::{AmbientReadings, Transport};
use crate::state::RetainedState;

/// What one reporting cycle did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Whether transport setup succeeded this cycle.
    pub connected: bool,
    /// Backlog records confirmed by the broker.
    pub drained: usize,
    /// Records dropped because they could not be encoded.
    pub dropped: usize,
    /// Whether the freshly built record was delivered (vs queued or dropped).
    pub current_delivered: bool,
    /// Whether queuing overwrote an older unconfirmed record.
    pub queue_overwrote: bool,
    /// Unconfirmed records left in the queue after the cycle.
    pub pending: usize,
}

pub struct ReportPipeline<'a, T: Transport, E: RecordEncoder> {
    transport: &'a mut T,
    encoder: &'a E,
    config: &'a NodeConfig<'a>,
}

impl<'a, T: Transport, E: RecordEncoder> ReportPipeline<'a, T, E> {
    pub fn new(transport: &'a mut T, encoder: &'a E, config: &'a NodeConfig<'a>) -> Self {
        Self {
            transport,
            encoder,
            config,
        }
    }

    /// Runs one full reporting cycle against the retained state.
    pub fn run(
        &mut self,
        state: &mut RetainedState,
        now: EpochSeconds,
        readings: AmbientReadings,
    ) -> CycleOutcome {
        let record = build_report(&state.tip_log, now, readings);
        let mut outcome = CycleOutcome::default();

        outcome.connected = self.transport.connect(self.config.connect_timeout_ms);
        if outcome.connected {
            let device = self.config.device_info(state.instance_id);
            let topic = self.config.broker.topic;
            let mut payload = [0u8; MQTT_MSG_BUFFER_SIZE];

            // Backlog first, oldest-first, so delivery order matches arrival.
            let DrainStats { delivered, dropped } = state.delivery_queue.drain_with(|queued| {
                match self.encoder.encode(queued, &device, &mut payload) {
                    Ok(len) => {
                        if self.transport.publish(topic, &payload[..len]) {
                            PublishOutcome::Delivered
                        } else {
                            PublishOutcome::Failed
                        }
                    }
                    Err(e) => {
                        error!("encoding queued report failed: {e}");
                        PublishOutcome::Unencodable
                    }
                }
            });
            outcome.drained = delivered;
            outcome.dropped = dropped;

            match self.encoder.encode(&record, &device, &mut payload) {
                Ok(len) => {
                    if self.transport.publish(topic, &payload[..len]) {
                        info!(
                            "report for window {} published ({} tips)",
                            record.window_end,
                            record.total_tips()
                        );
                        outcome.current_delivered = true;
                    } else {
                        warn!(
                            "publish failed, report for window {} queued for retry",
                            record.window_end
                        );
                        outcome.queue_overwrote = state.delivery_queue.enqueue(record);
                    }
                }
                // Dropped with no retry: a record the encoder rejects can
                // never succeed without a format fix.
                Err(e) => {
                    error!(
                        "encoding report for window {} failed, record dropped: {e}",
                        record.window_end
                    );
                    outcome.dropped += 1;
                }
            }

            self.transport.disconnect();
        } else {
            warn!(
                "transport unavailable, report for window {} queued for retry",
                record.window_end
            );
            outcome.queue_overwrote = state.delivery_queue.enqueue(record);
        }

        outcome.pending = state.delivery_queue.len();
        outcome
    }
}
