//! Plugin manifest parsing.
//!
//! Each plugin has a `manifest.toml` file that describes the identity it
//! reports to the host at start: signature, name and description.

use crate::error::{BindingError, BindingResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Plugin manifest structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin metadata.
    pub plugin: PluginMetadata,

    /// Prefix owned entries and actions are expected to live under.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Plugin metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Unique signature, conventionally `Author.PluginName`.
    pub signature: String,

    /// Human-readable name.
    pub name: String,

    /// Version string (semver).
    #[serde(default = "default_version")]
    pub version: String,

    /// Plugin description.
    #[serde(default)]
    pub description: Option<String>,

    /// Plugin author(s).
    #[serde(default)]
    pub authors: Vec<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl PluginManifest {
    /// Build a manifest in code, for plugins that do not ship a file.
    pub fn new(signature: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            plugin: PluginMetadata {
                signature: signature.into(),
                name: name.into(),
                version: default_version(),
                description: None,
                authors: Vec::new(),
            },
            namespace: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.plugin.description = Some(description.into());
        self
    }

    /// Set the namespace prefix.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Load a manifest from a TOML file.
    pub fn from_file(path: &Path) -> BindingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a manifest from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> BindingResult<Self> {
        let manifest: PluginManifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest.
    fn validate(&self) -> BindingResult<()> {
        if self.plugin.signature.is_empty() {
            return Err(BindingError::InvalidManifest(
                "Plugin signature cannot be empty".to_string(),
            ));
        }

        if self.plugin.signature.chars().any(char::is_whitespace) {
            return Err(BindingError::InvalidManifest(format!(
                "Plugin signature '{}' contains whitespace",
                self.plugin.signature
            )));
        }

        if self.plugin.name.is_empty() {
            return Err(BindingError::InvalidManifest(
                "Plugin name cannot be empty".to_string(),
            ));
        }

        if let Some(ns) = &self.namespace {
            if ns.is_empty() || ns.starts_with('/') || ns.ends_with('/') {
                return Err(BindingError::InvalidManifest(format!(
                    "Namespace '{}' must be non-empty without leading or trailing '/'",
                    ns
                )));
            }
        }

        Ok(())
    }

    /// Signature reported to the host.
    pub fn signature(&self) -> &str {
        &self.plugin.signature
    }

    /// Name reported to the host.
    pub fn name(&self) -> &str {
        &self.plugin.name
    }

    /// Description reported to the host; empty when not set.
    pub fn description(&self) -> &str {
        self.plugin.description.as_deref().unwrap_or("")
    }

    /// Join a leaf name onto the namespace, if there is one.
    pub fn qualify(&self, leaf: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, leaf),
            None => leaf.to_string(),
        }
    }
}
