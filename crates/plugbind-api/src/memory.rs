//! In-memory host.
//!
//! [`InMemoryHost`] keeps native values, plugin-owned entries and actions in
//! one mutex-guarded table. It stands in for the real host process in tests
//! and in the example plugin, and exposes host-side controls (`define`,
//! `invoke_get`, `invoke_set`, `issue_phase`) to drive a plugin from outside.
//!
//! The table lock is never held while a trampoline runs.

use crate::handle::validate_name;
use crate::host::{
    EntryTrampolines, Host, HostHandle, Outcome, Phase, PhaseCallback,
};
use plugbind_runtime::{BindingError, BindingResult, Value, ValueKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// A host process simulated in memory.
pub struct InMemoryHost {
    state: Mutex<HostState>,
    working_dir: PathBuf,
}

#[derive(Default)]
struct HostState {
    next_handle: u64,
    names: HashMap<String, HostHandle>,
    slots: HashMap<HostHandle, Slot>,
    actions: HashMap<String, ActionSlot>,
    action_handles: HashMap<HostHandle, String>,
    published: Vec<String>,
    lookups: HashMap<String, usize>,
    reads: usize,
    writes: usize,
}

enum Slot {
    Native { value: Value, writable: bool },
    Owned(Arc<EntryTrampolines>),
}

struct ActionSlot {
    description: String,
    handlers: Vec<ActionHandler>,
    default_runs: usize,
}

#[derive(Clone)]
struct ActionHandler {
    handle: HostHandle,
    call_before: bool,
    callback: PhaseCallback,
}

impl HostState {
    fn allocate(&mut self) -> HostHandle {
        self.next_handle += 1;
        HostHandle::from_raw(self.next_handle)
    }

    fn handle_for(&self, name: &str) -> Option<HostHandle> {
        self.names.get(name).copied()
    }
}

impl InMemoryHost {
    /// Create an empty host whose working directory is the process cwd.
    pub fn new() -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_working_dir(working_dir)
    }

    /// Create an empty host with the given working directory.
    pub fn with_working_dir(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(HostState::default()),
            working_dir: working_dir.into(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a native host value.
    ///
    /// Names owned by a plugin entry are left alone.
    pub fn define(&self, name: &str, value: Value, writable: bool) -> HostHandle {
        let mut state = self.lock();
        if let Some(handle) = state.handle_for(name) {
            match state.slots.get_mut(&handle) {
                Some(Slot::Native {
                    value: current,
                    writable: current_writable,
                }) => {
                    *current = value;
                    *current_writable = writable;
                }
                _ => warn!(name, "Refusing to redefine a plugin-owned entry"),
            }
            return handle;
        }

        let handle = state.allocate();
        state.names.insert(name.to_string(), handle);
        state.slots.insert(handle, Slot::Native { value, writable });
        debug!(name, %handle, "Defined host value");
        handle
    }

    /// Read a value by name without counting it as a plugin read.
    pub fn peek(&self, name: &str) -> Option<Value> {
        let trampolines = {
            let state = self.lock();
            let handle = state.handle_for(name)?;
            match state.slots.get(&handle)? {
                Slot::Native { value, .. } => return Some(value.clone()),
                Slot::Owned(trampolines) => Arc::clone(trampolines),
            }
        };
        Some((trampolines.get)())
    }

    /// Call the get trampoline of a plugin-owned entry.
    pub fn invoke_get(&self, name: &str) -> Option<Value> {
        let trampolines = self.owned(name)?;
        Some((trampolines.get)())
    }

    /// Call the set trampoline of a plugin-owned entry.
    ///
    /// Returns `false` when there is no such entry or it is read-only.
    pub fn invoke_set(&self, name: &str, value: Value) -> bool {
        let Some(trampolines) = self.owned(name) else {
            return false;
        };
        match &trampolines.set {
            Some(set) => {
                set(value);
                true
            }
            None => false,
        }
    }

    fn owned(&self, name: &str) -> Option<Arc<EntryTrampolines>> {
        let state = self.lock();
        let handle = state.handle_for(name)?;
        match state.slots.get(&handle)? {
            Slot::Owned(trampolines) => Some(Arc::clone(trampolines)),
            Slot::Native { .. } => None,
        }
    }

    /// Issue a phase event for an action, the way the host would.
    ///
    /// Before-handlers run first, in registration order; if one consumes the
    /// event nothing else runs. Then the default handling runs, then the
    /// after-handlers. Returns whether the default handling ran.
    pub fn issue_phase(&self, name: &str, phase: Phase) -> bool {
        let handlers = {
            let state = self.lock();
            match state.actions.get(name) {
                Some(slot) => slot.handlers.clone(),
                None => {
                    warn!(action = name, ?phase, "Phase issued for unknown action");
                    return false;
                }
            }
        };

        for handler in handlers.iter().filter(|h| h.call_before) {
            if (handler.callback)(handler.handle, phase, true) == Outcome::Consume {
                debug!(action = name, ?phase, "Phase consumed before default handling");
                return false;
            }
        }

        if let Some(slot) = self.lock().actions.get_mut(name) {
            slot.default_runs += 1;
        }

        for handler in handlers.iter().filter(|h| !h.call_before) {
            (handler.callback)(handler.handle, phase, false);
        }
        true
    }

    /// Create an action with no handlers, as a host built-in would exist.
    pub fn define_action(&self, name: &str, description: &str) {
        self.lock()
            .actions
            .entry(name.to_string())
            .or_insert_with(|| ActionSlot {
                description: description.to_string(),
                handlers: Vec::new(),
                default_runs: 0,
            });
    }

    /// Description an action was created with.
    pub fn action_description(&self, name: &str) -> Option<String> {
        self.lock().actions.get(name).map(|a| a.description.clone())
    }

    /// Number of handlers attached to an action.
    pub fn action_handler_count(&self, name: &str) -> usize {
        self.lock()
            .actions
            .get(name)
            .map(|a| a.handlers.len())
            .unwrap_or(0)
    }

    /// How many times the default handling of an action ran.
    pub fn default_run_count(&self, name: &str) -> usize {
        self.lock()
            .actions
            .get(name)
            .map(|a| a.default_runs)
            .unwrap_or(0)
    }

    /// Check if a name is currently known to the host.
    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().names.contains_key(name)
    }

    /// Names advertised for discovery.
    pub fn published(&self) -> Vec<String> {
        self.lock().published.clone()
    }

    /// How many times `lookup` was called for a name.
    pub fn lookup_count(&self, name: &str) -> usize {
        self.lock().lookups.get(name).copied().unwrap_or(0)
    }

    /// Total typed read calls made by plugins.
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Total typed write calls made by plugins.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn snapshot(&self, handle: HostHandle) -> Option<Value> {
        let trampolines = {
            let mut state = self.lock();
            state.reads += 1;
            match state.slots.get(&handle) {
                Some(Slot::Native { value, .. }) => return Some(value.clone()),
                Some(Slot::Owned(trampolines)) => Arc::clone(trampolines),
                None => {
                    warn!(%handle, "Read through unknown handle");
                    return None;
                }
            }
        };
        Some((trampolines.get)())
    }

    fn modify(&self, handle: HostHandle, kind: ValueKind, apply: impl FnOnce(&mut Value)) {
        let trampolines = {
            let mut state = self.lock();
            state.writes += 1;
            match state.slots.get_mut(&handle) {
                Some(Slot::Native { value, writable }) => {
                    if !*writable {
                        warn!(%handle, "Write to read-only host value ignored");
                    } else if value.kind() != kind {
                        warn!(%handle, %kind, "Write with wrong kind ignored");
                    } else {
                        apply(value);
                    }
                    return;
                }
                Some(Slot::Owned(trampolines)) => Arc::clone(trampolines),
                None => {
                    warn!(%handle, "Write through unknown handle");
                    return;
                }
            }
        };

        let Some(set) = &trampolines.set else {
            warn!(%handle, "Write to read-only plugin entry ignored");
            return;
        };
        let mut value = (trampolines.get)();
        if value.kind() != kind {
            warn!(%handle, %kind, "Write with wrong kind ignored");
            return;
        }
        apply(&mut value);
        set(value);
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

fn slice_of<T: Clone>(values: &[T], offset: usize, count: usize) -> Vec<T> {
    let end = offset.saturating_add(count).min(values.len());
    if offset >= end {
        return Vec::new();
    }
    values[offset..end].to_vec()
}

fn splice_into<T: Clone>(target: &mut [T], offset: usize, values: &[T]) {
    for (slot, value) in target.iter_mut().skip(offset).zip(values) {
        *slot = value.clone();
    }
}

impl Host for InMemoryHost {
    fn lookup(&self, name: &str) -> Option<HostHandle> {
        let mut state = self.lock();
        *state.lookups.entry(name.to_string()).or_insert(0) += 1;
        state.handle_for(name)
    }

    fn supports_kind(&self, handle: HostHandle, kind: ValueKind) -> bool {
        match self.lock().slots.get(&handle) {
            Some(Slot::Native { value, .. }) => value.kind() == kind,
            Some(Slot::Owned(trampolines)) => trampolines.kind == kind,
            None => false,
        }
    }

    fn read_int(&self, handle: HostHandle) -> i32 {
        match self.snapshot(handle) {
            Some(Value::Int(v)) => v,
            _ => 0,
        }
    }

    fn read_float(&self, handle: HostHandle) -> f32 {
        match self.snapshot(handle) {
            Some(Value::Float(v)) => v,
            _ => 0.0,
        }
    }

    fn read_double(&self, handle: HostHandle) -> f64 {
        match self.snapshot(handle) {
            Some(Value::Double(v)) => v,
            _ => 0.0,
        }
    }

    fn write_int(&self, handle: HostHandle, value: i32) {
        self.modify(handle, ValueKind::Int, |v| *v = Value::Int(value));
    }

    fn write_float(&self, handle: HostHandle, value: f32) {
        self.modify(handle, ValueKind::Float, |v| *v = Value::Float(value));
    }

    fn write_double(&self, handle: HostHandle, value: f64) {
        self.modify(handle, ValueKind::Double, |v| *v = Value::Double(value));
    }

    fn array_length(&self, handle: HostHandle) -> usize {
        self.snapshot(handle)
            .and_then(|v| v.array_len())
            .unwrap_or(0)
    }

    fn read_int_array(&self, handle: HostHandle, offset: usize, count: usize) -> Vec<i32> {
        match self.snapshot(handle) {
            Some(Value::IntArray(v)) => slice_of(&v, offset, count),
            _ => Vec::new(),
        }
    }

    fn read_float_array(&self, handle: HostHandle, offset: usize, count: usize) -> Vec<f32> {
        match self.snapshot(handle) {
            Some(Value::FloatArray(v)) => slice_of(&v, offset, count),
            _ => Vec::new(),
        }
    }

    fn read_byte_array(&self, handle: HostHandle, offset: usize, count: usize) -> Vec<u8> {
        match self.snapshot(handle) {
            Some(Value::ByteArray(v)) => slice_of(&v, offset, count),
            _ => Vec::new(),
        }
    }

    fn write_int_array(&self, handle: HostHandle, offset: usize, values: &[i32]) {
        self.modify(handle, ValueKind::IntArray, |v| {
            if let Value::IntArray(target) = v {
                splice_into(target, offset, values);
            }
        });
    }

    fn write_float_array(&self, handle: HostHandle, offset: usize, values: &[f32]) {
        self.modify(handle, ValueKind::FloatArray, |v| {
            if let Value::FloatArray(target) = v {
                splice_into(target, offset, values);
            }
        });
    }

    fn write_byte_array(&self, handle: HostHandle, offset: usize, values: &[u8]) {
        self.modify(handle, ValueKind::ByteArray, |v| {
            if let Value::ByteArray(target) = v {
                splice_into(target, offset, values);
            }
        });
    }

    fn register_entry(
        &self,
        name: &str,
        trampolines: EntryTrampolines,
    ) -> BindingResult<HostHandle> {
        validate_name(name)?;

        let mut state = self.lock();
        if state.names.contains_key(name) {
            return Err(BindingError::registration(name, "name already exists"));
        }

        let handle = state.allocate();
        state.names.insert(name.to_string(), handle);
        state.slots.insert(handle, Slot::Owned(Arc::new(trampolines)));
        info!(name, %handle, "Registered plugin entry");
        Ok(handle)
    }

    fn unregister_entry(&self, handle: HostHandle) {
        let mut state = self.lock();
        if !matches!(state.slots.get(&handle), Some(Slot::Owned(_))) {
            warn!(%handle, "Unregister of unknown plugin entry");
            return;
        }
        state.slots.remove(&handle);

        let name = state
            .names
            .iter()
            .find(|(_, h)| **h == handle)
            .map(|(name, _)| name.clone());
        if let Some(name) = name {
            state.names.remove(&name);
            state.published.retain(|n| n != &name);
            info!(name = %name, %handle, "Unregistered plugin entry");
        }
    }

    fn publish(&self, name: &str) {
        let mut state = self.lock();
        if !state.names.contains_key(name) {
            warn!(name, "Publish of unknown name ignored");
            return;
        }
        if !state.published.iter().any(|n| n == name) {
            state.published.push(name.to_string());
            info!(name, "Published entry for discovery");
        }
    }

    fn register_action(
        &self,
        name: &str,
        description: &str,
        call_before: bool,
        callback: PhaseCallback,
    ) -> BindingResult<HostHandle> {
        validate_name(name)?;

        let mut state = self.lock();
        let handle = state.allocate();
        let slot = state
            .actions
            .entry(name.to_string())
            .or_insert_with(|| ActionSlot {
                description: description.to_string(),
                handlers: Vec::new(),
                default_runs: 0,
            });
        slot.handlers.push(ActionHandler {
            handle,
            call_before,
            callback,
        });
        state.action_handles.insert(handle, name.to_string());
        info!(action = name, %handle, call_before, "Registered action handler");
        Ok(handle)
    }

    fn unregister_action(&self, handle: HostHandle) {
        let mut state = self.lock();
        let Some(name) = state.action_handles.remove(&handle) else {
            warn!(%handle, "Unregister of unknown action handler");
            return;
        };
        if let Some(slot) = state.actions.get_mut(&name) {
            slot.handlers.retain(|h| h.handle != handle);
        }
        info!(action = %name, %handle, "Unregistered action handler");
    }

    fn working_dir(&self) -> PathBuf {
        self.working_dir.clone()
    }
}
