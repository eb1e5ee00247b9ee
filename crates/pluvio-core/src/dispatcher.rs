//! Wake-cause dispatch: one wake, one handler, then back to sleep.
//!
//! Each power-on episode runs exactly one of three behaviors to completion,
//! then unconditionally arms both wake sources and requests sleep. The
//! dispatcher itself is stateless between wakes; everything that matters
//! lives in [`RetainedState`].

use log::{info, warn};

use crate::config::NodeConfig;
use crate::encode::RecordEncoder;
use crate::pipeline::{CycleOutcome, ReportPipeline};
use crate::platform::{AmbientSensor, Clock, SleepControl, Transport};
use crate::state::RetainedState;

/// Hardware-reported reason the device resumed from deep sleep.
///
/// Selected once per wake and immutable for that cycle. Anything the shell
/// cannot classify (brownout, watchdog, first power-on) maps to the default,
/// which re-baselines the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WakeCause {
    #[default]
    ColdBootOrReset,
    TimerReport,
    SensorTip,
}

pub struct WakeDispatcher<'a, C, A, T, E, S>
where
    C: Clock,
    A: AmbientSensor,
    T: Transport,
    E: RecordEncoder,
    S: SleepControl,
{
    clock: C,
    ambient: A,
    transport: T,
    encoder: E,
    sleep: S,
    config: &'a NodeConfig<'a>,
    /// Entropy for the per-boot instance id, drawn by the shell at startup
    /// and consumed only by a cold-boot wake.
    instance_seed: u32,
}

impl<'a, C, A, T, E, S> WakeDispatcher<'a, C, A, T, E, S>
where
    C: Clock,
    A: AmbientSensor,
    T: Transport,
    E: RecordEncoder,
    S: SleepControl,
{
    pub fn new(
        clock: C,
        ambient: A,
        transport: T,
        encoder: E,
        sleep: S,
        config: &'a NodeConfig<'a>,
        instance_seed: u32,
    ) -> Self {
        Self {
            clock,
            ambient,
            transport,
            encoder,
            sleep,
            config,
            instance_seed,
        }
    }

    /// Runs the handler for `cause`, then arms the wake sources and requests
    /// sleep. On real hardware the sleep request does not return; control
    /// resumes at the next wake, starting a fresh dispatch from scratch.
    pub fn dispatch(&mut self, cause: WakeCause, state: &mut RetainedState) {
        match cause {
            WakeCause::ColdBootOrReset => self.handle_cold_boot(state),
            WakeCause::SensorTip => self.handle_tip(state),
            WakeCause::TimerReport => {
                self.handle_report(state);
            }
        }
        self.sleep.arm_wakeup_sources(self.config.report_interval_s);
        self.sleep.enter_deep_sleep();
    }

    /// Cold boot / reset: best-effort time sync, then re-baseline everything.
    fn handle_cold_boot(&mut self, state: &mut RetainedState) {
        info!("wake: cold boot or reset, re-baselining retained state");
        if !self.clock.sync(self.config.ntp_timeout_ms) {
            warn!("time sync failed, continuing with unsynced clock");
        }
        state.reset(self.clock.now(), self.instance_seed);
    }

    /// Tip GPIO wake: log the event, unless the clock cannot be trusted.
    fn handle_tip(&mut self, state: &mut RetainedState) {
        let now = self.clock.now();
        if !self.clock.is_valid(now) {
            warn!("clock unsynchronized ({now}), tip not logged");
            return;
        }
        if state.tip_log.record_tip(now) {
            info!("tip logged at {now} ({} events held)", state.tip_log.len());
        }
    }

    /// Report timer wake: run the full reporting cycle.
    fn handle_report(&mut self, state: &mut RetainedState) -> CycleOutcome {
        let now = self.clock.now();
        let readings = self.ambient.sample();
        let outcome = ReportPipeline::new(&mut self.transport, &self.encoder, self.config)
            .run(state, now, readings);
        info!(
            "report cycle done: connected={} drained={} delivered={} pending={}",
            outcome.connected, outcome.drained, outcome.current_delivered, outcome.pending
        );
        outcome
    }
}
