//! Node configuration.
//!
//! The captive-portal UI that writes these values lives outside the core; the
//! core consumes them as opaque read-only values. Strings are borrowed so the
//! shell can hand in references into its persisted config image.

use serde::{Deserialize, Serialize};

use crate::encode::DeviceInfo;

/// Wi-Fi association timeout.
pub const WIFI_CONNECT_TIMEOUT_MS: u32 = 15_000;

/// MQTT broker connect timeout.
pub const MQTT_CONNECT_TIMEOUT_MS: u32 = 5_000;

/// NTP sync timeout.
pub const NTP_SYNC_TIMEOUT_MS: u32 = 10_000;

/// Report timer period: 30 minutes, one interval shorter than the 32-minute
/// window each report covers.
pub const REPORT_INTERVAL_S: u32 = 1_800;

/// Encode buffer for one published report.
pub const MQTT_MSG_BUFFER_SIZE: usize = 256;

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct BrokerConfig<'a> {
    pub host: &'a str,
    pub port: u16,
    pub topic: &'a str,
    pub client_id_prefix: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct DeviceConfig<'a> {
    /// Stable device identifier, usually derived from the chip MAC.
    pub device_id: &'a str,
    /// Gauge calibration: rain volume represented by one bucket tip.
    pub mm_per_tip: f32,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct NodeConfig<'a> {
    pub broker: BrokerConfig<'a>,
    pub device: DeviceConfig<'a>,
    pub report_interval_s: u32,
    pub connect_timeout_ms: u32,
    pub ntp_timeout_ms: u32,
}

impl<'a> NodeConfig<'a> {
    pub fn device_info(&self, instance_id: u32) -> DeviceInfo<'a> {
        DeviceInfo {
            device_id: self.device.device_id,
            mm_per_tip: self.device.mm_per_tip,
            instance_id,
        }
    }
}

impl Default for NodeConfig<'_> {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            device: DeviceConfig::default(),
            report_interval_s: REPORT_INTERVAL_S,
            connect_timeout_ms: MQTT_CONNECT_TIMEOUT_MS,
            ntp_timeout_ms: NTP_SYNC_TIMEOUT_MS,
        }
    }
}
