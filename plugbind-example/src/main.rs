//! # plugbind-example
//!
//! Runs the flap auto-retract plugin against a simulated host.
//!
//! The binary:
//! - Loads configuration (creating a documented default if missing)
//! - Installs logging, optionally to a file under the host working directory
//! - Starts and enables the plugin
//! - Drives a takeoff roll frame by frame
//! - Prints the run summary and diagnostics as JSON, then stops the plugin
//!
//! ## Running
//!
//! ```bash
//! cargo run --bin plugbind-example
//!
//! # With debug logging
//! RUST_LOG=debug cargo run --bin plugbind-example
//! ```

use anyhow::{Context, Result};
use plugbind_api::{InMemoryHost, PluginContext, PluginInstance};
use plugbind_example::config::Config;
use plugbind_example::flaps::FlapRetract;
use plugbind_example::logging;
use plugbind_example::simulation::Simulation;
use plugbind_runtime::{PathResolver, PluginManifest};
use std::sync::Arc;
use tracing::{info, warn};

fn main() -> Result<()> {
    let (config, load_error) = match Config::load_default() {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let host = Arc::new(InMemoryHost::new());
    let paths = PathResolver::new(std::env::current_dir().context("Failed to read working directory")?);
    let log_path = logging::init(&config.plugin, &paths)?;

    info!("Starting plugbind-example v{}", env!("CARGO_PKG_VERSION"));
    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {:#}", e);
    }
    if let Some(path) = &log_path {
        info!("Logging to {}", path.display());
    }

    let manifest = PluginManifest::new("plugbind.example", "plugbind example")
        .with_description("Retracts flaps once indicated airspeed passes a set speed")
        .with_namespace(config.plugin.namespace.clone());
    let ctx = PluginContext::with_paths(host.clone(), manifest, paths);

    let simulation = Simulation::new(host.clone(), config.simulation.clone());
    let mut instance =
        PluginInstance::start_with_builder(ctx, |ctx| FlapRetract::new(ctx, &config.flaps))
            .context("Failed to start plugin")?;
    if !instance.enable() {
        anyhow::bail!("Plugin refused to enable");
    }

    let summary = simulation.run(&mut instance);
    info!(
        frames = summary.frames,
        retractions = summary.retractions,
        "Simulation finished"
    );

    let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    println!("{}", json);

    instance.stop();
    info!("Plugin stopped");
    Ok(())
}
