//! Name to handle resolution.
//!
//! A [`NamedHandle`] remembers the handle the host gave for a name. The
//! first successful lookup is cached for the life of the handle; a failed
//! lookup is not cached, so the next access asks the host again.

use crate::host::{Host, HostHandle};
use plugbind_runtime::{BindingError, BindingResult, ValueKind};
use std::sync::OnceLock;
use tracing::debug;

/// Longest name accepted for registration.
pub const MAX_NAME_LEN: usize = 255;

/// A stable name plus its lazily resolved host handle.
#[derive(Debug)]
pub struct NamedHandle {
    name: String,
    kind: ValueKind,
    resolved: OnceLock<HostHandle>,
    length: OnceLock<usize>,
}

impl NamedHandle {
    /// Create an unresolved handle. Does not talk to the host.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            resolved: OnceLock::new(),
            length: OnceLock::new(),
        }
    }

    /// Get the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the declared kind.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Get the cached handle without asking the host.
    pub fn resolved(&self) -> Option<HostHandle> {
        self.resolved.get().copied()
    }

    /// Check if resolution has succeeded.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Resolve the name, asking the host only while unresolved.
    ///
    /// A name the host knows under a different kind is rejected rather than
    /// reinterpreted, and is not cached either.
    pub fn resolve(&self, host: &dyn Host) -> BindingResult<HostHandle> {
        if let Some(handle) = self.resolved.get() {
            return Ok(*handle);
        }

        let handle = host
            .lookup(&self.name)
            .ok_or_else(|| BindingError::Unresolved(self.name.clone()))?;

        if !host.supports_kind(handle, self.kind) {
            return Err(BindingError::KindMismatch {
                name: self.name.clone(),
                expected: self.kind,
            });
        }

        let handle = *self.resolved.get_or_init(|| handle);
        debug!(name = %self.name, %handle, kind = %self.kind, "Resolved host value");
        Ok(handle)
    }

    /// Array length, queried from the host once and then cached.
    pub fn array_length(&self, host: &dyn Host, handle: HostHandle) -> usize {
        *self.length.get_or_init(|| host.array_length(handle))
    }
}

/// Check a name against the format hosts accept.
///
/// Names are `/`-separated paths: non-empty, at most [`MAX_NAME_LEN`] bytes,
/// no whitespace or control characters, no leading or trailing `/`, and no
/// empty segments.
pub fn validate_name(name: &str) -> BindingResult<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.len() > MAX_NAME_LEN {
        Some("name is too long")
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("name contains whitespace or control characters")
    } else if name.starts_with('/') || name.ends_with('/') {
        Some("name has a leading or trailing '/'")
    } else if name.contains("//") {
        Some("name has an empty path segment")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(BindingError::registration(name, reason)),
        None => Ok(()),
    }
}
