//! Configuration file loading and management
//!
//! Settings come from `$XDG_CONFIG_HOME/plugbind-example/config.toml`. If the
//! file doesn't exist, a default one is written with documented comments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Plugin identity and logging
    #[serde(default)]
    pub plugin: PluginConfig,
    /// Auto-retract behaviour
    #[serde(default)]
    pub flaps: FlapsConfig,
    /// Simulated host run driven by the binary
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Plugin identity and logging
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PluginConfig {
    /// Prefix for every name the plugin registers
    /// Default: "plugbind/example"
    pub namespace: String,
    /// Log level (trace, debug, info, warn, error)
    /// Default: "info"
    pub log_level: String,
    /// Log file, relative to the host working directory
    /// Default: none (stderr only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

/// Auto-retract behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlapsConfig {
    /// Indicated airspeed at which flaps retract, in knots
    /// Default: 80.0
    pub retract_speed_kts: f32,
    /// Whether auto-retract starts armed
    /// Default: true
    pub auto_retract: bool,
    /// Upper bound for frame delta time, in seconds
    /// Default: 0.1
    pub max_frame_delta: f32,
}

/// Simulated host run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of frames to run
    /// Default: 300
    pub frames: u64,
    /// Seconds between frames
    /// Default: 0.05
    pub frame_delta: f32,
    /// Airspeed at the first frame, in knots
    /// Default: 40.0
    pub initial_airspeed_kts: f32,
    /// Airspeed gained per second, in knots
    /// Default: 4.0
    pub acceleration_kts: f32,
    /// Flap ratio at the first frame (0.0 - 1.0)
    /// Default: 0.5
    pub initial_flap_ratio: f32,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            namespace: "plugbind/example".to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Default for FlapsConfig {
    fn default() -> Self {
        Self {
            retract_speed_kts: 80.0,
            auto_retract: true,
            max_frame_delta: 0.1,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frames: 300,
            frame_delta: 0.05,
            initial_airspeed_kts: 40.0,
            acceleration_kts: 4.0,
            initial_flap_ratio: 0.5,
        }
    }
}

impl Config {
    /// Load configuration from the specified path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default XDG config location
    ///
    /// If the configuration file doesn't exist, creates a default configuration
    /// file with documented comments.
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_file(&config_path)?;
        }

        Self::load(&config_path)
    }

    /// Get the default configuration file path
    ///
    /// Returns `$XDG_CONFIG_HOME/plugbind-example/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let dir = plugbind_runtime::user_config_dir("plugbind", "plugbind-example")
            .context("Failed to determine project directories")?;

        Ok(dir.join("config.toml"))
    }

    /// Create a default configuration file with documented comments
    pub fn create_default_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

        tracing::info!("Created default configuration file at: {}", path.display());
        Ok(())
    }

    /// Generate the default configuration file content with comments
    fn default_config_content() -> &'static str {
        r#"# plugbind example plugin configuration

[plugin]
# Prefix for every name the plugin registers with the host
namespace = "plugbind/example"

# Log level: trace, debug, info, warn, error
# RUST_LOG overrides this when set
log_level = "info"

# Log file, relative to the host working directory
# log_file = "Output/plugbind-example.log"

[flaps]
# Indicated airspeed at which flaps retract, in knots
# Published to the host as <namespace>/flap_retract_speed_kts
retract_speed_kts = 80.0

# Whether auto-retract starts armed
# <namespace>/toggle_auto_retract flips it at runtime
auto_retract = true

# Upper bound for frame delta time, in seconds
max_frame_delta = 0.1

[simulation]
# Frames the simulated host runs before stopping the plugin
frames = 300

# Seconds between frames
frame_delta = 0.05

# Starting conditions
initial_airspeed_kts = 40.0
acceleration_kts = 4.0
initial_flap_ratio = 0.5
"#
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are valid and within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.plugin.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log_level: {}. Must be one of: {}",
                self.plugin.log_level,
                valid_log_levels.join(", ")
            );
        }

        plugbind_api::handle::validate_name(&self.plugin.namespace)
            .with_context(|| format!("Invalid namespace: {}", self.plugin.namespace))?;

        if !(self.flaps.retract_speed_kts.is_finite() && self.flaps.retract_speed_kts > 0.0) {
            anyhow::bail!("flaps.retract_speed_kts must be a positive number");
        }
        if !(self.flaps.max_frame_delta.is_finite() && self.flaps.max_frame_delta > 0.0) {
            anyhow::bail!("flaps.max_frame_delta must be a positive number");
        }

        if self.simulation.frames == 0 {
            anyhow::bail!("simulation.frames must be greater than 0");
        }
        if !(self.simulation.frame_delta.is_finite() && self.simulation.frame_delta > 0.0) {
            anyhow::bail!("simulation.frame_delta must be a positive number");
        }
        if !(0.0..=1.0).contains(&self.simulation.initial_flap_ratio) {
            anyhow::bail!("simulation.initial_flap_ratio must be between 0.0 and 1.0");
        }

        Ok(())
    }
}
