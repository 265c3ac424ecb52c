//! Error types for the binding layer.

use crate::value::ValueKind;
use thiserror::Error;

/// Errors that can occur while binding to host values and actions.
#[derive(Error, Debug)]
pub enum BindingError {
    /// Name not found in the host registry. Recoverable, retried on next access.
    #[error("Unresolved name: {0}")]
    Unresolved(String),

    /// Name resolved to a host value of a different kind than declared.
    #[error("Kind mismatch for '{name}': declared {expected}, host does not provide it")]
    KindMismatch { name: String, expected: ValueKind },

    /// Write attempted through a read-only binding.
    #[error("Capability violation: '{0}' is read-only")]
    CapabilityViolation(String),

    /// Range request outside the reported array length.
    #[error("Array bounds error on '{name}': offset {offset} + count {count} exceeds length {length}")]
    ArrayBounds {
        name: String,
        offset: usize,
        count: usize,
        length: usize,
    },

    /// Duplicate or malformed name at registration time.
    #[error("Registration of '{name}' failed: {reason}")]
    Registration { name: String, reason: String },

    /// Phase event received outside the expected state.
    #[error("Protocol violation on '{action}': {detail}")]
    ProtocolViolation { action: String, detail: String },

    /// Failed to parse a plugin manifest.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BindingError {
    /// Build a registration error.
    pub fn registration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        BindingError::Registration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a resolution-class failure (missing name or wrong kind).
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            BindingError::Unresolved(_) | BindingError::KindMismatch { .. }
        )
    }

    /// Whether the failure is recoverable at runtime.
    ///
    /// Capability and registration errors point at a defect in the plugin
    /// itself and are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BindingError::Unresolved(_)
                | BindingError::KindMismatch { .. }
                | BindingError::ArrayBounds { .. }
                | BindingError::ProtocolViolation { .. }
        )
    }
}

/// Result type for binding operations.
pub type BindingResult<T> = std::result::Result<T, BindingError>;
