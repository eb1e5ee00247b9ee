//! Report wire encoding boundary.
//!
//! The concrete wire layout is pluggable: the pipeline only sees the
//! [`RecordEncoder`] trait. [`PostcardEncoder`] is the stock implementation.
//! An encode failure is the one record-losing path that is not a
//! capacity/network issue: a record that does not fit the message buffer can
//! never succeed without a format fix, so it is dropped instead of queued.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::report::ReportRecord;

/// Per-device metadata attached to every encoded report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct DeviceInfo<'a> {
    pub device_id: &'a str,
    /// Gauge calibration the consumer needs to turn tip counts into mm.
    pub mm_per_tip: f32,
    /// Random value drawn once per cold boot; lets the consumer spot resets
    /// and de-duplicate re-deliveries across them.
    pub instance_id: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("encode buffer too small for report")]
    BufferTooSmall,
    #[error("report serialization failed")]
    Serialize,
}

pub trait RecordEncoder {
    /// Encodes `record` plus `device` into `out`, returning the payload
    /// length.
    fn encode(
        &self,
        record: &ReportRecord,
        device: &DeviceInfo<'_>,
        out: &mut [u8],
    ) -> Result<usize, EncodeError>;
}

/// The message as it crosses the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "'de: 'a"))]
struct WireReport<'a> {
    device: DeviceInfo<'a>,
    record: ReportRecord,
}

/// Default encoder: postcard over the serde model above.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostcardEncoder;

impl RecordEncoder for PostcardEncoder {
    fn encode(
        &self,
        record: &ReportRecord,
        device: &DeviceInfo<'_>,
        out: &mut [u8],
    ) -> Result<usize, EncodeError> {
        let message = WireReport {
            device: *device,
            record: *record,
        };
        postcard::to_slice(&message, out)
            .map(|used| used.len())
            .map_err(|e| match e {
                postcard::Error::SerializeBufferFull => EncodeError::BufferTooSmall,
                _ => EncodeError::Serialize,
            })
    }
}
