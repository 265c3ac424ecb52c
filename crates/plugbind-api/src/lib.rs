//! # plugbind-api
//!
//! Binding layer between a plugin and the host process that loads it.
//!
//! The host exposes named values ("datarefs") and named actions. This crate
//! gives a plugin:
//!
//! - Lazy, cached resolution of names to host handles
//! - Typed proxies that pick the right host call from the value type
//! - Values owned by the plugin and served to the host through trampolines
//! - Actions driven by begin/continue/end phase events
//! - A diagnostics side channel for everything that fails softly
//!
//! ## Writing a plugin
//!
//! Implement [`Plugin`], keep proxies, owned entries and commands as fields,
//! and run it inside a [`PluginInstance`]. Dropping the instance unregisters
//! everything the plugin registered. [`InMemoryHost`] stands in for a real
//! host in tests and demos.

pub mod command;
pub mod context;
pub mod diagnostics;
pub mod handle;
pub mod host;
pub mod memory;
pub mod owned;
pub mod plugin;
pub mod proxy;

pub use command::{ActionState, Command, CommandHandler};
pub use context::PluginContext;
pub use diagnostics::{DiagnosticEntry, DiagnosticKind, Diagnostics, DiagnosticsReport};
pub use handle::NamedHandle;
pub use host::{Host, HostHandle, LogLevel, Outcome, Phase};
pub use memory::InMemoryHost;
pub use owned::OwnedEntry;
pub use plugin::{NextCall, Plugin, PluginInstance};
pub use proxy::{at_least, compare, equals, ArrayRef, DataRef, Element, Readable, Scalar};

pub use plugbind_runtime::{BindingError, BindingResult, Capability, Value, ValueKind};
