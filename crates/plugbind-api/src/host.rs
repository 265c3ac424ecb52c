//! The host boundary.
//!
//! Everything the binding layer needs from the host process goes through
//! the [`Host`] trait: name lookup, typed reads and writes, array lengths,
//! and registration of plugin-owned entries and actions. Callbacks the host
//! makes into the plugin are shared closures stored in the host's
//! registration table under the handle it issued.

use plugbind_runtime::{BindingResult, Value, ValueKind};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Opaque identifier issued by the host for a named value or action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostHandle(u64);

impl HostHandle {
    /// Wrap a raw host identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw host identifier.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One stage of a host-driven action invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Begin,
    Continue,
    End,
}

/// What a phase handler tells the host about default handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Let other handlers and the default handling run.
    #[default]
    Pass,
    /// Stop the event here.
    Consume,
}

/// Get trampoline: returns the current value of a plugin-owned entry.
pub type Getter = Arc<dyn Fn() -> Value + Send + Sync>;

/// Set trampoline: stores a new value into a plugin-owned entry.
pub type Setter = Arc<dyn Fn(Value) + Send + Sync>;

/// Phase trampoline: `(handle, phase, call_before) -> outcome`.
pub type PhaseCallback = Arc<dyn Fn(HostHandle, Phase, bool) -> Outcome + Send + Sync>;

/// Trampolines lent to the host for one plugin-owned entry.
#[derive(Clone)]
pub struct EntryTrampolines {
    /// Kind the entry is exchanged as.
    pub kind: ValueKind,

    /// Read callback.
    pub get: Getter,

    /// Write callback; `None` for read-only entries.
    pub set: Option<Setter>,
}

impl fmt::Debug for EntryTrampolines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryTrampolines")
            .field("kind", &self.kind)
            .field("writable", &self.set.is_some())
            .finish()
    }
}

/// Calls a plugin can make into its host.
///
/// All calls are synchronous and bounded. Implementations must not hold an
/// internal lock while invoking a trampoline, since the trampoline may call
/// back into the host.
pub trait Host: Send + Sync {
    /// Look up a named value. `None` when the host has no such name (yet).
    fn lookup(&self, name: &str) -> Option<HostHandle>;

    /// Whether the value behind `handle` can be accessed as `kind`.
    fn supports_kind(&self, handle: HostHandle, kind: ValueKind) -> bool;

    fn read_int(&self, handle: HostHandle) -> i32;
    fn read_float(&self, handle: HostHandle) -> f32;
    fn read_double(&self, handle: HostHandle) -> f64;

    fn write_int(&self, handle: HostHandle, value: i32);
    fn write_float(&self, handle: HostHandle, value: f32);
    fn write_double(&self, handle: HostHandle, value: f64);

    /// Element count of an array value.
    fn array_length(&self, handle: HostHandle) -> usize;

    fn read_int_array(&self, handle: HostHandle, offset: usize, count: usize) -> Vec<i32>;
    fn read_float_array(&self, handle: HostHandle, offset: usize, count: usize) -> Vec<f32>;
    fn read_byte_array(&self, handle: HostHandle, offset: usize, count: usize) -> Vec<u8>;

    fn write_int_array(&self, handle: HostHandle, offset: usize, values: &[i32]);
    fn write_float_array(&self, handle: HostHandle, offset: usize, values: &[f32]);
    fn write_byte_array(&self, handle: HostHandle, offset: usize, values: &[u8]);

    /// Register a plugin-owned entry under `name`.
    ///
    /// Fails with a registration error if the name already exists or is
    /// malformed.
    fn register_entry(&self, name: &str, trampolines: EntryTrampolines)
        -> BindingResult<HostHandle>;

    /// Remove a plugin-owned entry. The host must not call its trampolines
    /// after this returns.
    fn unregister_entry(&self, handle: HostHandle);

    /// Advertise a registered entry for discovery by other plugins and tools.
    fn publish(&self, name: &str);

    /// Attach a phase handler to the named action, creating the action if needed.
    fn register_action(
        &self,
        name: &str,
        description: &str,
        call_before: bool,
        callback: PhaseCallback,
    ) -> BindingResult<HostHandle>;

    /// Detach a phase handler.
    fn unregister_action(&self, handle: HostHandle);

    /// Root of the host's current working context.
    fn working_dir(&self) -> PathBuf;
}

/// Log level for plugin logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}
