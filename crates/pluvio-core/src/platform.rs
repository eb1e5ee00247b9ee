//! Trait boundaries to the hardware and network stack.
//!
//! The core never talks to GPIO registers, the Wi-Fi/MQTT stack, or NTP
//! directly; the firmware shell (or the simulator) injects implementations of
//! these traits. All failures at this boundary are reported as plain `bool`s
//! and handled locally: there is nobody above the dispatcher to propagate to,
//! the only remedy is to sleep and try again next cycle.

use crate::EpochSeconds;

/// Epoch-seconds plausibility floor: 2000-01-01T00:00:00Z. An RTC that has
/// never been synced reads as seconds-since-boot and lands far below this.
pub const CLOCK_VALID_EPOCH: EpochSeconds = 946_684_800;

/// Wall-clock source, typically the on-chip RTC plus NTP.
pub trait Clock {
    /// Best available current time, valid or not.
    fn now(&mut self) -> EpochSeconds;

    /// Attempts an external sync (e.g. NTP), blocking at most `timeout_ms`.
    /// Returns whether the clock is now synchronized.
    fn sync(&mut self, timeout_ms: u32) -> bool;

    /// Plausibility check for a timestamp read from this clock.
    fn is_valid(&self, t: EpochSeconds) -> bool {
        t > CLOCK_VALID_EPOCH
    }
}

/// Broker transport, typically Wi-Fi plus an MQTT client.
///
/// Connect and publish failures are expected operating conditions for a node
/// at the edge of Wi-Fi range; the pipeline treats them as non-fatal.
pub trait Transport {
    /// Brings the link up, blocking at most `timeout_ms`.
    fn connect(&mut self, timeout_ms: u32) -> bool;

    /// Publishes one message. Only meaningful after a successful `connect`.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;

    fn disconnect(&mut self);
}

/// Arms the next wake sources and enters deep sleep.
///
/// On real hardware `enter_deep_sleep` does not return; the next thing that
/// runs is the bootloader. The simulator's implementation just records the
/// request so the host loop can continue.
pub trait SleepControl {
    /// Arms both wake sources: the tip GPIO edge and the report timer.
    fn arm_wakeup_sources(&mut self, report_interval_s: u32);

    fn enter_deep_sleep(&mut self);
}

/// Opaque environmental readings attached to each report. How they are
/// obtained (I2C sensors, constants, ...) is the shell's business.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmbientReadings {
    pub temperature: u8,
    pub pressure: u8,
    pub humidity: u8,
}

pub trait AmbientSensor {
    fn sample(&mut self) -> AmbientReadings;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock(EpochSeconds);

    impl Clock for FixedClock {
        fn now(&mut self) -> EpochSeconds {
            self.0
        }

        fn sync(&mut self, _timeout_ms: u32) -> bool {
            false
        }
    }

    #[test]
    fn default_validity_check_uses_epoch_floor() {
        let clock = FixedClock(0);
        assert!(!clock.is_valid(0));
        assert!(!clock.is_valid(CLOCK_VALID_EPOCH));
        assert!(clock.is_valid(CLOCK_VALID_EPOCH + 1));
    }
}
