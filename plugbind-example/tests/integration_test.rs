//! Integration tests for the example plugin.

use plugbind_api::{InMemoryHost, Phase, PluginContext, PluginInstance, Value};
use plugbind_example::config::Config;
use plugbind_example::flaps::{FlapRetract, FLAP_RATIO};
use plugbind_example::simulation::Simulation;
use plugbind_runtime::PluginManifest;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn start(host: &Arc<InMemoryHost>, config: &Config) -> PluginInstance<FlapRetract> {
    let manifest = PluginManifest::new("test.example", "Example")
        .with_namespace(config.plugin.namespace.clone());
    let ctx = PluginContext::new(host.clone(), manifest);
    let mut instance =
        PluginInstance::start_with_builder(ctx, |ctx| FlapRetract::new(ctx, &config.flaps))
            .unwrap();
    assert!(instance.enable());
    instance
}

#[test]
fn test_default_file_is_created_and_loads() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested/config.toml");

    Config::create_default_file(&path).unwrap();
    assert!(path.exists());

    let config = Config::load(&path).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_invalid_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[flaps]\nmax_frame_delta = -1.0\n").unwrap();

    assert!(Config::load(&path).is_err());
    assert!(Config::load(temp_dir.path().join("missing.toml")).is_err());
}

#[test]
fn test_configured_run() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[plugin]
namespace = "acme/trainer"

[flaps]
retract_speed_kts = 65.0

[simulation]
frames = 100
initial_airspeed_kts = 50.0
acceleration_kts = 10.0
"#,
    )
    .unwrap();
    let config = Config::load(&path).unwrap();

    let host = Arc::new(InMemoryHost::new());
    let simulation = Simulation::new(host.clone(), config.simulation.clone());
    let mut instance = start(&host, &config);

    assert_eq!(
        host.published(),
        vec!["acme/trainer/flap_retract_speed_kts".to_string()]
    );

    let summary = simulation.run(&mut instance);
    assert_eq!(summary.frames, 100);
    assert_eq!(summary.retract_speed_kts, 65.0);
    assert_eq!(summary.retractions, 1);
    assert_eq!(host.peek(FLAP_RATIO), Some(Value::Float(0.0)));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["retractions"], 1);
    assert!(json["diagnostics"]["entries"].as_array().unwrap().is_empty());

    instance.stop();
    assert!(!host.is_registered("acme/trainer/flap_retract_speed_kts"));
}

#[test]
fn test_missing_host_values_are_diagnosed_not_fatal() {
    let host = Arc::new(InMemoryHost::new());
    let config = Config::default();
    let mut instance = start(&host, &config);

    for counter in 0..10 {
        instance.frame(0.05, counter);
    }

    let report = instance.context().diagnostics().snapshot();
    let subjects: Vec<&str> = report.entries.iter().map(|e| e.subject.as_str()).collect();
    assert!(subjects.contains(&"sim/time/paused"));
    assert!(report.entries.iter().all(|e| e.count >= 1));
    assert_eq!(instance.plugin().map(FlapRetract::retractions), Some(0));
}

#[test]
fn test_toggle_action_through_host() {
    let host = Arc::new(InMemoryHost::new());
    let config = Config::default();
    let simulation = Simulation::new(host.clone(), config.simulation.clone());
    let mut instance = start(&host, &config);
    let action = instance.plugin().unwrap().toggle_action().to_string();
    assert_eq!(action, "plugbind/example/toggle_auto_retract");

    for phase in [Phase::Begin, Phase::End, Phase::Begin, Phase::End] {
        host.issue_phase(&action, phase);
    }
    assert_eq!(instance.plugin().map(FlapRetract::is_armed), Some(true));

    host.issue_phase(&action, Phase::Begin);
    host.issue_phase(&action, Phase::End);
    let summary = simulation.run(&mut instance);
    assert_eq!(summary.retractions, 0);
    assert!(!summary.armed);
}
