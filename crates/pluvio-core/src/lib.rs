//! Hardware-independent core library for pluvio-rs
//!
//! This crate contains all platform-agnostic logic for the pluvio rain-gauge /
//! weather node: the retained state that survives deep sleep, the debounced tip
//! event log, interval-aligned report aggregation, the store-and-forward
//! delivery queue, and the wake-cause dispatcher.
//!
//! Everything hardware-specific (GPIO/timer wakeup programming, the actual
//! Wi-Fi/MQTT stack, NTP sync, RTC slow memory) lives behind the traits in
//! [`platform`] and [`encode`] so the crate compiles on both embedded targets
//! and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod aggregator;
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod encode;
pub mod pipeline;
pub mod platform;
pub mod report;
pub mod ring_buffer;
pub mod state;
pub mod tip_log;

pub use config::NodeConfig;
pub use dispatcher::{WakeCause, WakeDispatcher};
pub use report::ReportRecord;
pub use state::RetainedState;

/// Seconds since the Unix epoch, as kept by the node's RTC.
///
/// `u32` covers dates until 2106, far beyond the service life of a AA-powered
/// rain gauge.
pub type EpochSeconds = u32;
