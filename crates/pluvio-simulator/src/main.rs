//! Desktop simulator for the pluvio node wake cycle.
//!
//! Replays a scripted rainy afternoon against the real core: cold boot, a
//! burst of tip wakes (including bounces the debounce filter must eat), and
//! periodic report wakes over a transport that drops offline partway through.
//! Each wake builds the whole object graph from scratch, like a real power-on
//! episode; only [`RetainedState`] survives in between, standing in for RTC
//! slow memory. Run with `RUST_LOG=debug` for the full picture.

use log::info;

use pluvio_core::config::{BrokerConfig, DeviceConfig, NodeConfig};
use pluvio_core::encode::PostcardEncoder;
use pluvio_core::platform::{AmbientReadings, AmbientSensor, Clock, SleepControl, Transport};
use pluvio_core::{EpochSeconds, RetainedState, WakeCause, WakeDispatcher};

/// Wall clock frozen at the moment of the simulated wake.
struct SimClock {
    now: EpochSeconds,
}

impl Clock for SimClock {
    fn now(&mut self) -> EpochSeconds {
        self.now
    }

    fn sync(&mut self, _timeout_ms: u32) -> bool {
        true
    }
}

struct SimTransport {
    online: bool,
}

impl Transport for SimTransport {
    fn connect(&mut self, _timeout_ms: u32) -> bool {
        if !self.online {
            info!("[sim] broker unreachable this cycle");
        }
        self.online
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        let hex: String = payload.iter().map(|b| format!("{b:02X}")).collect();
        info!("[sim] publish {topic} ({} bytes): {hex}", payload.len());
        true
    }

    fn disconnect(&mut self) {}
}

struct SimAmbient;

impl AmbientSensor for SimAmbient {
    fn sample(&mut self) -> AmbientReadings {
        AmbientReadings {
            temperature: 18,
            pressure: 99,
            humidity: 85,
        }
    }
}

/// Records the sleep request instead of powering anything down.
struct SimSleep;

impl SleepControl for SimSleep {
    fn arm_wakeup_sources(&mut self, report_interval_s: u32) {
        info!("[sim] wake sources armed (tip GPIO + {report_interval_s}s timer)");
    }

    fn enter_deep_sleep(&mut self) {
        info!("[sim] deep sleep requested");
    }
}

/// One simulated power-on episode.
fn run_wake(
    cause: WakeCause,
    now: EpochSeconds,
    online: bool,
    config: &NodeConfig<'_>,
    state: &mut RetainedState,
) {
    let mut dispatcher = WakeDispatcher::new(
        SimClock { now },
        SimAmbient,
        SimTransport { online },
        PostcardEncoder,
        SimSleep,
        config,
        rand_seed(),
    );
    dispatcher.dispatch(cause, state);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = NodeConfig {
        broker: BrokerConfig {
            host: "192.168.1.10",
            port: 1883,
            topic: "weather/update",
            client_id_prefix: "WS-",
        },
        device: DeviceConfig {
            device_id: "WS-SIM001",
            mm_per_tip: 0.2794,
        },
        ..NodeConfig::default()
    };

    let start: EpochSeconds = 1_717_000_320; // aligned to an interval boundary
    let mut state = RetainedState::new();

    info!("=== power on ===");
    run_wake(WakeCause::ColdBootOrReset, start, true, &config, &mut state);

    // Four report periods of intermittent rain; periods 1 and 2 happen during
    // a Wi-Fi outage, so their reports queue up and drain in period 3.
    for period in 0..4u32 {
        let period_start = start + period * config.report_interval_s;
        let online = period == 0 || period == 3;

        // a few tips per period; the 302 s one is a bounce 2 s after a real
        // tip and must be debounced away
        for offset in [300u32, 302, 420, 900, 1500] {
            info!("=== wake: tip at +{offset}s, period {period} ===");
            run_wake(
                WakeCause::SensorTip,
                period_start + offset,
                online,
                &config,
                &mut state,
            );
        }

        info!("=== wake: report timer, period {period} ===");
        run_wake(
            WakeCause::TimerReport,
            period_start + config.report_interval_s + 7,
            online,
            &config,
            &mut state,
        );
        info!(
            "[sim] after period {period}: {} tips logged, {} reports pending",
            state.tip_log.len(),
            state.delivery_queue.len()
        );
    }
}

/// Stand-in for the hardware RNG that seeds the per-boot instance id.
fn rand_seed() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0x5EED_0001)
}
