//! # plugbind-runtime
//!
//! Shared types for the plugbind binding layer.
//!
//! This crate provides:
//! - The closed set of value kinds a host can expose
//! - Read-only / read-write capabilities
//! - Plugin manifest parsing
//! - Path resolution against the host's working context
//! - The error taxonomy used across the layer
//!
//! Nothing here talks to a host; see `plugbind-api` for that.

pub mod capability;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod value;

pub use capability::Capability;
pub use error::{BindingError, BindingResult};
pub use manifest::{PluginManifest, PluginMetadata};
pub use paths::{user_config_dir, PathResolver};
pub use value::{HostValue, Value, ValueKind};
