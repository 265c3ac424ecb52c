//! Access capability of a binding.
//!
//! Every proxy and owned entry carries a capability fixed at construction.
//! A read-only binding never issues a write call to the host.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a binding may only read or may also write the underlying value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Reads only.
    #[default]
    ReadOnly,

    /// Reads and writes.
    ReadWrite,
}

impl Capability {
    /// Parse a capability from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read_only" | "ro" => Some(Capability::ReadOnly),
            "read_write" | "rw" => Some(Capability::ReadWrite),
            _ => None,
        }
    }

    /// Convert capability to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ReadOnly => "read_only",
            Capability::ReadWrite => "read_write",
        }
    }

    /// Check if writes are permitted.
    pub fn allows_write(&self) -> bool {
        matches!(self, Capability::ReadWrite)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
