//! A scripted takeoff roll against the in-memory host.

use crate::config::SimulationConfig;
use crate::flaps::{FlapRetract, FLAP_RATIO, INDICATED_AIRSPEED, SIM_PAUSED};
use plugbind_api::{DiagnosticsReport, InMemoryHost, PluginInstance, Value};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Host-side view of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub final_airspeed_kts: f32,
    pub final_flap_ratio: f32,
    pub retract_speed_kts: f32,
    pub retractions: u32,
    pub armed: bool,
    pub diagnostics: DiagnosticsReport,
}

/// Drives a host with accelerating airspeed.
pub struct Simulation {
    host: Arc<InMemoryHost>,
    settings: SimulationConfig,
}

impl Simulation {
    /// Create a host holding the values the plugin reads.
    pub fn new(host: Arc<InMemoryHost>, settings: SimulationConfig) -> Self {
        host.define(SIM_PAUSED, Value::Int(0), false);
        host.define(
            INDICATED_AIRSPEED,
            Value::Float(settings.initial_airspeed_kts),
            false,
        );
        host.define(FLAP_RATIO, Value::Float(settings.initial_flap_ratio), true);
        Self { host, settings }
    }

    pub fn host(&self) -> &Arc<InMemoryHost> {
        &self.host
    }

    /// Airspeed at the start of a given frame.
    pub fn airspeed_at(&self, frame: u64) -> f32 {
        self.settings.initial_airspeed_kts
            + self.settings.acceleration_kts * self.settings.frame_delta * frame as f32
    }

    /// Run every configured frame, stopping early if the plugin asks to.
    ///
    /// Only frames the plugin actually received are counted.
    pub fn run(&self, instance: &mut PluginInstance<FlapRetract>) -> RunSummary {
        let mut frames = 0;
        for counter in 0..self.settings.frames {
            self.host.define(
                INDICATED_AIRSPEED,
                Value::Float(self.airspeed_at(counter)),
                false,
            );
            match instance.frame(self.settings.frame_delta, counter) {
                Some(plugbind_api::NextCall::Stop) => {
                    frames += 1;
                    debug!(counter, "Plugin stopped frame delivery");
                    break;
                }
                Some(_) => frames += 1,
                None => {
                    debug!(counter, "Plugin is not taking frames");
                    break;
                }
            }
        }
        self.summary(instance, frames)
    }

    fn summary(&self, instance: &PluginInstance<FlapRetract>, frames: u64) -> RunSummary {
        let read_float = |name: &str| match self.host.peek(name) {
            Some(Value::Float(v)) => v,
            _ => 0.0,
        };
        let plugin = instance.plugin();
        RunSummary {
            frames,
            final_airspeed_kts: read_float(INDICATED_AIRSPEED),
            final_flap_ratio: read_float(FLAP_RATIO),
            retract_speed_kts: plugin.map(FlapRetract::retract_speed).unwrap_or(0.0),
            retractions: plugin.map(FlapRetract::retractions).unwrap_or(0),
            armed: plugin.map(FlapRetract::is_armed).unwrap_or(false),
            diagnostics: instance.context().diagnostics().snapshot(),
        }
    }
}
