//! Path resolution relative to the host's working context.
//!
//! Relative file names are resolved against one of two roots:
//!
//! 1. The host working directory (where the host keeps the current
//!    session's files)
//! 2. The plugin's own directory, when the host told us where it is
//!
//! Absolute paths pass through unchanged.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Maps relative file names to absolute paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Root of the host's current working context.
    host_root: PathBuf,

    /// Directory the plugin was loaded from.
    plugin_dir: Option<PathBuf>,
}

impl PathResolver {
    /// Create a resolver rooted at the host working directory.
    pub fn new(host_root: impl Into<PathBuf>) -> Self {
        Self {
            host_root: host_root.into(),
            plugin_dir: None,
        }
    }

    /// Set the plugin directory.
    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = Some(dir.into());
        self
    }

    /// Get the host root.
    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    /// Get the plugin directory, if known.
    pub fn plugin_dir(&self) -> Option<&Path> {
        self.plugin_dir.as_deref()
    }

    /// Resolve a name against the host working directory.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        join_onto(&self.host_root, relative.as_ref())
    }

    /// Resolve a name against the plugin directory.
    ///
    /// Falls back to the host working directory when the plugin directory
    /// is unknown.
    pub fn resolve_in_plugin(&self, relative: impl AsRef<Path>) -> PathBuf {
        let root = self.plugin_dir.as_deref().unwrap_or(&self.host_root);
        join_onto(root, relative.as_ref())
    }
}

fn join_onto(root: &Path, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        return root.to_path_buf();
    }
    if relative.is_absolute() {
        return relative.to_path_buf();
    }
    let resolved = root.join(relative);
    debug!("Resolved {:?} to {:?}", relative, resolved);
    resolved
}

/// Get the user configuration directory for an application.
pub fn user_config_dir(organization: &str, application: &str) -> Option<PathBuf> {
    directories::ProjectDirs::from("", organization, application)
        .map(|dirs| dirs.config_dir().to_path_buf())
}
