//! Flap auto-retract.
//!
//! Watches indicated airspeed each frame and pulls the flap handle to zero
//! once the aircraft is faster than the retract speed. The retract speed is
//! published to the host so other plugins and the cockpit can read or tune
//! it, and a host action toggles the whole feature.

use crate::config::FlapsConfig;
use plugbind_api::{
    at_least, Capability, Command, DataRef, LogLevel, NextCall, Outcome, OwnedEntry, Phase,
    Plugin, PluginContext,
};
use plugbind_runtime::BindingResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Host value: non-zero while the simulation is paused.
pub const SIM_PAUSED: &str = "sim/time/paused";
/// Host value: pilot-side indicated airspeed in knots.
pub const INDICATED_AIRSPEED: &str = "sim/cockpit2/gauges/indicators/airspeed_kts_pilot";
/// Host value: flap handle position, 0.0 (up) to 1.0 (full).
pub const FLAP_RATIO: &str = "sim/cockpit2/controls/flap_ratio";

/// Leaf name of the published retract speed.
pub const RETRACT_SPEED_LEAF: &str = "flap_retract_speed_kts";
/// Leaf name of the arm/disarm action.
pub const TOGGLE_LEAF: &str = "toggle_auto_retract";

pub struct FlapRetract {
    paused: DataRef<i32>,
    airspeed: DataRef<f32>,
    flaps: DataRef<f32>,
    retract_speed: OwnedEntry<f32>,
    armed: Arc<AtomicBool>,
    toggle: Command,
    max_frame_delta: f32,
    sim_time: f32,
    retractions: u32,
}

impl FlapRetract {
    /// Declare proxies and register the retract speed and toggle action.
    pub fn new(ctx: &PluginContext, settings: &FlapsConfig) -> BindingResult<Self> {
        let retract_speed = OwnedEntry::with_value(
            ctx,
            &ctx.manifest().qualify(RETRACT_SPEED_LEAF),
            Capability::ReadWrite,
            true,
            settings.retract_speed_kts,
        )?;

        let armed = Arc::new(AtomicBool::new(settings.auto_retract));
        let toggle = {
            let armed = Arc::clone(&armed);
            Command::new(
                ctx,
                &ctx.manifest().qualify(TOGGLE_LEAF),
                "Toggle flap auto-retract",
                false,
                move |phase: Phase| {
                    if phase == Phase::Begin {
                        let now_armed = !armed.fetch_xor(true, Ordering::SeqCst);
                        info!(armed = now_armed, "Flap auto-retract toggled");
                    }
                    Outcome::Pass
                },
            )?
        };

        Ok(Self {
            paused: DataRef::read_only(ctx, SIM_PAUSED),
            airspeed: DataRef::read_only(ctx, INDICATED_AIRSPEED),
            flaps: DataRef::read_write(ctx, FLAP_RATIO),
            retract_speed,
            armed,
            toggle,
            max_frame_delta: settings.max_frame_delta,
            sim_time: 0.0,
            retractions: 0,
        })
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Current retract speed, including any change the host made.
    pub fn retract_speed(&self) -> f32 {
        self.retract_speed.get()
    }

    /// Times the flaps have been pulled up.
    pub fn retractions(&self) -> u32 {
        self.retractions
    }

    /// Unpaused simulated time seen so far, with each frame clamped.
    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    pub fn toggle_action(&self) -> &str {
        self.toggle.name()
    }

    fn auto_retract(&mut self, ctx: &PluginContext) {
        if !self.is_armed() {
            return;
        }
        if !(at_least(&self.airspeed, &self.retract_speed) && self.flaps.read() > 0.0) {
            return;
        }
        if self.flaps.write(0.0).is_ok() {
            self.retractions += 1;
            ctx.log(
                LogLevel::Info,
                &format!(
                    "Flaps auto-retracted as airspeed is greater than {}",
                    self.retract_speed.get()
                ),
            );
        }
    }
}

impl Plugin for FlapRetract {
    fn start(ctx: &PluginContext) -> BindingResult<Self> {
        Self::new(ctx, &FlapsConfig::default())
    }

    fn enable(&mut self, _ctx: &PluginContext) -> bool {
        debug!(armed = self.is_armed(), "Flap auto-retract enabled");
        true
    }

    fn frame(&mut self, ctx: &PluginContext, elapsed: f32, _counter: u64) -> NextCall {
        if self.paused.read() == 0 {
            self.sim_time += elapsed.max(0.0).min(self.max_frame_delta);
            self.auto_retract(ctx);
        }
        NextCall::EveryFrame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugbind_api::{InMemoryHost, PluginInstance, Value};
    use plugbind_runtime::PluginManifest;

    fn host() -> Arc<InMemoryHost> {
        let host = Arc::new(InMemoryHost::new());
        host.define(SIM_PAUSED, Value::Int(0), false);
        host.define(INDICATED_AIRSPEED, Value::Float(60.0), false);
        host.define(FLAP_RATIO, Value::Float(0.5), true);
        host
    }

    fn manifest() -> PluginManifest {
        PluginManifest::new("test.flaps", "Flaps").with_namespace("test/flaps")
    }

    #[test]
    fn test_retracts_at_speed() {
        let host = host();
        let mut instance: PluginInstance<FlapRetract> =
            PluginInstance::start(host.clone(), manifest()).unwrap();
        instance.enable();

        instance.frame(0.05, 1);
        assert_eq!(host.peek(FLAP_RATIO), Some(Value::Float(0.5)));

        host.define(INDICATED_AIRSPEED, Value::Float(80.0), false);
        instance.frame(0.05, 2);
        assert_eq!(host.peek(FLAP_RATIO), Some(Value::Float(0.0)));
        assert_eq!(instance.plugin().map(FlapRetract::retractions), Some(1));

        instance.frame(0.05, 3);
        assert_eq!(instance.plugin().map(FlapRetract::retractions), Some(1));
    }

    #[test]
    fn test_paused_frames_do_nothing() {
        let host = host();
        host.define(SIM_PAUSED, Value::Int(1), false);
        host.define(INDICATED_AIRSPEED, Value::Float(150.0), false);
        let mut instance: PluginInstance<FlapRetract> =
            PluginInstance::start(host.clone(), manifest()).unwrap();
        instance.enable();

        instance.frame(0.05, 1);
        assert_eq!(host.peek(FLAP_RATIO), Some(Value::Float(0.5)));
        assert_eq!(instance.plugin().map(FlapRetract::sim_time), Some(0.0));
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let host = host();
        let mut instance: PluginInstance<FlapRetract> =
            PluginInstance::start(host, manifest()).unwrap();
        instance.enable();

        instance.frame(2.0, 1);
        instance.frame(0.05, 2);
        let sim_time = instance.plugin().map(FlapRetract::sim_time).unwrap();
        assert!((sim_time - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_host_tunes_retract_speed() {
        let host = host();
        let mut instance: PluginInstance<FlapRetract> =
            PluginInstance::start(host.clone(), manifest()).unwrap();
        instance.enable();

        assert_eq!(
            host.published(),
            vec!["test/flaps/flap_retract_speed_kts".to_string()]
        );
        assert!(host.invoke_set("test/flaps/flap_retract_speed_kts", Value::Float(50.0)));

        instance.frame(0.05, 1);
        assert_eq!(host.peek(FLAP_RATIO), Some(Value::Float(0.0)));
    }

    #[test]
    fn test_toggle_disarms() {
        let host = host();
        host.define(INDICATED_AIRSPEED, Value::Float(150.0), false);
        let mut instance: PluginInstance<FlapRetract> =
            PluginInstance::start(host.clone(), manifest()).unwrap();
        instance.enable();

        host.issue_phase("test/flaps/toggle_auto_retract", Phase::Begin);
        host.issue_phase("test/flaps/toggle_auto_retract", Phase::End);
        assert_eq!(instance.plugin().map(FlapRetract::is_armed), Some(false));

        instance.frame(0.05, 1);
        assert_eq!(host.peek(FLAP_RATIO), Some(Value::Float(0.5)));
    }

    #[test]
    fn test_stop_unregisters() {
        let host = host();
        let instance: PluginInstance<FlapRetract> =
            PluginInstance::start(host.clone(), manifest()).unwrap();
        assert!(host.is_registered("test/flaps/flap_retract_speed_kts"));

        instance.stop();
        assert!(!host.is_registered("test/flaps/flap_retract_speed_kts"));
        assert_eq!(host.action_handler_count("test/flaps/toggle_auto_retract"), 0);
    }
}
