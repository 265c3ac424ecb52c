//! Process-wide plugin state.
//!
//! A [`PluginContext`] is created when the plugin starts and torn down when
//! it stops. It is passed by reference into every proxy, entry and command
//! constructor instead of living in a global.

use crate::diagnostics::Diagnostics;
use crate::host::{Host, HostHandle, LogLevel};
use plugbind_runtime::{BindingError, BindingResult, PathResolver, PluginManifest};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Shared state for one plugin: host, diagnostics, identity, paths.
///
/// Cloning is cheap; all clones refer to the same state.
#[derive(Clone)]
pub struct PluginContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    host: Arc<dyn Host>,
    diagnostics: Diagnostics,
    manifest: PluginManifest,
    paths: PathResolver,
    claims: Mutex<HashSet<(ClaimKind, String)>>,
}

/// What a name is claimed for within this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ClaimKind {
    Entry,
    Action,
}

impl ClaimKind {
    fn as_str(&self) -> &'static str {
        match self {
            ClaimKind::Entry => "entry",
            ClaimKind::Action => "action",
        }
    }
}

impl PluginContext {
    /// Create a context with paths rooted at the host working directory.
    pub fn new(host: Arc<dyn Host>, manifest: PluginManifest) -> Self {
        let paths = PathResolver::new(host.working_dir());
        Self::with_paths(host, manifest, paths)
    }

    /// Create a context with an explicit path resolver.
    pub fn with_paths(host: Arc<dyn Host>, manifest: PluginManifest, paths: PathResolver) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                host,
                diagnostics: Diagnostics::new(),
                manifest,
                paths,
                claims: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Get the host.
    pub fn host(&self) -> &dyn Host {
        self.inner.host.as_ref()
    }

    /// Get a shared handle to the host.
    pub fn host_arc(&self) -> Arc<dyn Host> {
        Arc::clone(&self.inner.host)
    }

    /// Get the diagnostics side channel.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    /// Get the plugin manifest.
    pub fn manifest(&self) -> &PluginManifest {
        &self.inner.manifest
    }

    /// Get the path resolver.
    pub fn paths(&self) -> &PathResolver {
        &self.inner.paths
    }

    /// Log a message tagged with this plugin's signature.
    pub fn log(&self, level: LogLevel, message: &str) {
        let plugin = self.inner.manifest.signature();
        match level {
            LogLevel::Trace => tracing::trace!(plugin, "{}", message),
            LogLevel::Debug => tracing::debug!(plugin, "{}", message),
            LogLevel::Info => tracing::info!(plugin, "{}", message),
            LogLevel::Warn => tracing::warn!(plugin, "{}", message),
            LogLevel::Error => tracing::error!(plugin, "{}", message),
        }
    }

    /// Check if a name is currently claimed by a live entry or command.
    pub fn is_claimed(&self, name: &str) -> bool {
        self.claims()
            .iter()
            .any(|(_, claimed)| claimed == name)
    }

    fn claims(&self) -> MutexGuard<'_, HashSet<(ClaimKind, String)>> {
        self.inner
            .claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a name for this process until the returned claim drops.
    pub(crate) fn claim(&self, kind: ClaimKind, name: &str) -> BindingResult<Claim> {
        let mut claims = self.claims();
        if !claims.insert((kind, name.to_string())) {
            return Err(BindingError::registration(
                name,
                format!("{} already registered by this plugin", kind.as_str()),
            ));
        }
        debug!(name, kind = kind.as_str(), "Claimed name");
        Ok(Claim {
            context: self.clone(),
            kind,
            name: name.to_string(),
        })
    }
}

/// A process-local reservation of a name.
pub(crate) struct Claim {
    context: PluginContext,
    kind: ClaimKind,
    name: String,
}

impl Drop for Claim {
    fn drop(&mut self) {
        let key = (self.kind, std::mem::take(&mut self.name));
        self.context.claims().remove(&key);
    }
}

/// A live host registration. Dropping it unregisters from the host, then
/// releases the name.
pub(crate) struct Registration {
    host: Arc<dyn Host>,
    handle: HostHandle,
    claim: Claim,
}

impl Registration {
    pub(crate) fn new(host: Arc<dyn Host>, handle: HostHandle, claim: Claim) -> Self {
        Self {
            host,
            handle,
            claim,
        }
    }

    pub(crate) fn handle(&self) -> HostHandle {
        self.handle
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        match self.claim.kind {
            ClaimKind::Entry => self.host.unregister_entry(self.handle),
            ClaimKind::Action => self.host.unregister_action(self.handle),
        }
    }
}
