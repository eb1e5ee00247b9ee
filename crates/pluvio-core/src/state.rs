//! State that must survive deep sleep.
//!
//! On ESP-class hardware this lives in RTC slow memory and simply persists; on
//! other platforms (or across firmware updates) the shell can serialize it
//! through the fixed little-endian image below. The core never touches the
//! persistence mechanism itself, only the value.
//!
//! Binary image (little-endian, variable length):
//! - last_reset_timestamp: 4 bytes (u32)
//! - instance_id: 4 bytes (u32)
//! - last_tip_timestamp: 4 bytes (u32)
//! - tip event count: 2 bytes (u16), then that many u32 timestamps
//! - queued report count: 1 byte (u8), then that many 15-byte record images

use heapless::Vec;
use thiserror_no_std::Error;

use crate::EpochSeconds;
use crate::delivery::{DELIVERY_QUEUE_CAPACITY, DeliveryQueue};
use crate::report::{RECORD_IMAGE_BYTES, ReportRecord};
use crate::tip_log::{TIP_LOG_CAPACITY, TipEventLog};

/// Upper bound of the serialized image: header + full tip log + full queue.
pub const RETAINED_IMAGE_MAX_BYTES: usize =
    4 + 4 + 4 + 2 + TIP_LOG_CAPACITY * 4 + 1 + DELIVERY_QUEUE_CAPACITY * RECORD_IMAGE_BYTES;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateCodecError {
    #[error("retained state image truncated")]
    Truncated,
    #[error("retained state image has an out-of-range element count")]
    CorruptCount,
}

/// Everything the node remembers between wakes.
///
/// Exclusively owned and mutated by whichever wake handler is currently
/// executing; the wake model guarantees there never is a second one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetainedState {
    /// Baseline set at the last cold boot / reset.
    pub last_reset_timestamp: EpochSeconds,
    /// Random value drawn once per cold boot, attached to every report.
    pub instance_id: u32,
    pub tip_log: TipEventLog,
    pub delivery_queue: DeliveryQueue,
}

impl RetainedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-baselines the node: clears both retained collections, stamps the
    /// reset time, and adopts a fresh per-boot instance id.
    pub fn reset(&mut self, baseline: EpochSeconds, instance_id: u32) {
        self.last_reset_timestamp = baseline;
        self.instance_id = instance_id;
        self.tip_log.reset();
        self.delivery_queue.clear();
    }

    /// Serializes the state into its binary image.
    pub fn to_bytes(&self) -> Vec<u8, RETAINED_IMAGE_MAX_BYTES> {
        let mut bytes = Vec::new();
        // the image max is derived from the same capacities we serialize, so
        // none of these pushes can fail
        let _ = bytes.extend_from_slice(&self.last_reset_timestamp.to_le_bytes());
        let _ = bytes.extend_from_slice(&self.instance_id.to_le_bytes());
        let _ = bytes.extend_from_slice(&self.tip_log.last_tip().to_le_bytes());

        let _ = bytes.extend_from_slice(&(self.tip_log.len() as u16).to_le_bytes());
        for event_ts in self.tip_log.events() {
            let _ = bytes.extend_from_slice(&event_ts.to_le_bytes());
        }

        let _ = bytes.push(self.delivery_queue.len() as u8);
        for record in self.delivery_queue.iter() {
            let _ = bytes.extend_from_slice(&record.to_bytes());
        }
        bytes
    }

    /// Rebuilds the state from its binary image.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self, StateCodecError> {
        let last_reset_timestamp = read_u32(&mut bytes)?;
        let instance_id = read_u32(&mut bytes)?;
        let last_tip = read_u32(&mut bytes)?;

        let tip_count = read_u16(&mut bytes)? as usize;
        if tip_count > TIP_LOG_CAPACITY {
            return Err(StateCodecError::CorruptCount);
        }
        let mut events = [0u32; TIP_LOG_CAPACITY];
        for slot in events.iter_mut().take(tip_count) {
            *slot = read_u32(&mut bytes)?;
        }
        let tip_log = TipEventLog::restore(last_tip, events.iter().take(tip_count).copied());

        let queue_count = read_u8(&mut bytes)? as usize;
        if queue_count > DELIVERY_QUEUE_CAPACITY {
            return Err(StateCodecError::CorruptCount);
        }
        let mut records = [ReportRecord::default(); DELIVERY_QUEUE_CAPACITY];
        for slot in records.iter_mut().take(queue_count) {
            let mut image = [0u8; RECORD_IMAGE_BYTES];
            image.copy_from_slice(take(&mut bytes, RECORD_IMAGE_BYTES)?);
            *slot = ReportRecord::from_bytes(&image);
        }
        let delivery_queue = DeliveryQueue::restore(records.iter().take(queue_count).copied());

        Ok(Self {
            last_reset_timestamp,
            instance_id,
            tip_log,
            delivery_queue,
        })
    }
}

/// Persistence boundary for platforms without retention-through-sleep memory.
///
/// Failures are non-fatal: a load miss means starting from defaults (the same
/// thing a cold boot does), a store miss costs at most one cycle of events.
pub trait RetainedStore {
    /// Loads the previously stored state, if any survived.
    fn load(&mut self) -> Option<RetainedState>;

    /// Stores the state before sleep. Returns whether the write succeeded.
    fn store(&mut self, state: &RetainedState) -> bool;
}

fn take<'a>(bytes: &mut &'a [u8], n: usize) -> Result<&'a [u8], StateCodecError> {
    if bytes.len() < n {
        return Err(StateCodecError::Truncated);
    }
    let (head, rest) = bytes.split_at(n);
    *bytes = rest;
    Ok(head)
}

fn read_u8(bytes: &mut &[u8]) -> Result<u8, StateCodecError> {
    Ok(take(bytes, 1)?[0])
}

fn read_u16(bytes: &mut &[u8]) -> Result<u16, StateCodecError> {
    let mut word = [0u8; 2];
    word.copy_from_slice(take(bytes, 2)?);
    Ok(u16::from_le_bytes(word))
}

fn read_u32(bytes: &mut &[u8]) -> Result<u32, StateCodecError> {
    let mut word = [0u8; 4];
    word.copy_from_slice(take(bytes, 4)?);
    Ok(u32::from_le_bytes(word))
}
