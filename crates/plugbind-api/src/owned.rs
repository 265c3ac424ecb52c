//! Named values owned by the plugin.
//!
//! An [`OwnedEntry`] creates a new name in the host registry backed by
//! storage the plugin owns. The host reads and writes it only through the
//! get/set trampolines registered here; the plugin assigns to the storage
//! directly.

use crate::context::{ClaimKind, PluginContext, Registration};
use crate::diagnostics::DiagnosticKind;
use crate::host::{EntryTrampolines, Getter, HostHandle, Setter};
use crate::proxy::{Readable, Scalar};
use plugbind_runtime::{BindingResult, Capability, HostValue, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::info;

fn lock<T>(storage: &Mutex<T>) -> MutexGuard<'_, T> {
    storage.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A host-visible value whose source of truth is plugin storage.
pub struct OwnedEntry<T: HostValue> {
    // Declared first so it drops first: the host forgets the trampolines
    // before the storage goes away.
    registration: Registration,
    name: String,
    capability: Capability,
    published: bool,
    storage: Arc<Mutex<T>>,
}

impl<T: HostValue> OwnedEntry<T> {
    /// Register a new entry holding `T::zero()`.
    ///
    /// Installs a get trampoline always and a set trampoline only for
    /// `ReadWrite`. With `publish`, the name is also advertised for
    /// discovery. Fails if this plugin already owns the name, or the host
    /// rejects it.
    pub fn new(
        ctx: &PluginContext,
        name: &str,
        capability: Capability,
        publish: bool,
    ) -> BindingResult<Self> {
        let claim = ctx.claim(ClaimKind::Entry, name)?;
        let storage = Arc::new(Mutex::new(T::zero()));

        let trampolines = EntryTrampolines {
            kind: T::KIND,
            get: getter(Arc::downgrade(&storage)),
            set: capability
                .allows_write()
                .then(|| setter(ctx.clone(), name.to_string(), Arc::downgrade(&storage))),
        };

        let handle = ctx.host().register_entry(name, trampolines)?;
        if publish {
            ctx.host().publish(name);
        }
        info!(name, %handle, %capability, publish, kind = %T::KIND, "Owned entry registered");

        Ok(Self {
            registration: Registration::new(ctx.host_arc(), handle, claim),
            name: name.to_string(),
            capability,
            published: publish,
            storage,
        })
    }

    /// Register with an initial value.
    pub fn with_value(
        ctx: &PluginContext,
        name: &str,
        capability: Capability,
        publish: bool,
        value: T,
    ) -> BindingResult<Self> {
        let entry = Self::new(ctx, name, capability, publish)?;
        entry.set(value);
        Ok(entry)
    }

    /// Current value of the storage.
    pub fn get(&self) -> T {
        lock(&self.storage).clone()
    }

    /// Assign straight into the storage. No host call is made.
    pub fn set(&self, value: T) {
        *lock(&self.storage) = value;
    }

    /// Modify the value and store the result.
    ///
    /// `f` runs on a copy with the storage unlocked, so it may read this
    /// entry back through the host.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Handle the host issued for this entry.
    pub fn handle(&self) -> HostHandle {
        self.registration.handle()
    }
}

impl<T: HostValue> fmt::Debug for OwnedEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedEntry")
            .field("name", &self.name)
            .field("kind", &T::KIND)
            .field("capability", &self.capability)
            .field("published", &self.published)
            .finish()
    }
}

impl<T: Scalar> Readable for OwnedEntry<T> {
    type Output = T;

    fn get(&self) -> T {
        OwnedEntry::get(self)
    }
}

fn getter<T: HostValue>(storage: Weak<Mutex<T>>) -> Getter {
    Arc::new(move || match storage.upgrade() {
        Some(storage) => lock(&storage).clone().into_value(),
        None => Value::zero(T::KIND),
    })
}

fn setter<T: HostValue>(ctx: PluginContext, name: String, storage: Weak<Mutex<T>>) -> Setter {
    Arc::new(move |value: Value| {
        let Some(storage) = storage.upgrade() else {
            return;
        };
        let actual = value.kind();
        match T::from_value(value) {
            Some(value) => *lock(&storage) = value,
            None => {
                ctx.diagnostics()
                    .record_with(DiagnosticKind::TrampolineMismatch, &name, || {
                        format!("set with {} on a {} entry", actual, T::KIND)
                    });
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryHost;
    use crate::proxy::DataRef;
    use plugbind_runtime::{BindingError, PluginManifest};

    fn setup() -> (Arc<InMemoryHost>, PluginContext) {
        let host = Arc::new(InMemoryHost::new());
        let ctx = PluginContext::new(host.clone(), PluginManifest::new("test.owned", "Owned"));
        (host, ctx)
    }

    #[test]
    fn test_starts_at_zero() {
        let (host, ctx) = setup();
        let entry: OwnedEntry<i32> =
            OwnedEntry::new(&ctx, "app/count", Capability::ReadOnly, false).unwrap();
        assert_eq!(entry.get(), 0);
        assert_eq!(host.invoke_get("app/count"), Some(Value::Int(0)));
    }

    #[test]
    fn test_read_only_has_no_setter() {
        let (host, ctx) = setup();
        let entry: OwnedEntry<f32> =
            OwnedEntry::with_value(&ctx, "app/ro", Capability::ReadOnly, false, 1.5).unwrap();

        assert!(!host.invoke_set("app/ro", Value::Float(9.0)));
        assert_eq!(entry.get(), 1.5);
    }

    #[test]
    fn test_wrong_kind_set_is_recorded() {
        let (host, ctx) = setup();
        let entry: OwnedEntry<f32> =
            OwnedEntry::new(&ctx, "app/rw", Capability::ReadWrite, false).unwrap();

        assert!(host.invoke_set("app/rw", Value::Int(3)));
        assert_eq!(entry.get(), 0.0);
        assert_eq!(
            ctx.diagnostics()
                .count(DiagnosticKind::TrampolineMismatch, "app/rw"),
            1
        );
    }

    #[test]
    fn test_drop_unregisters_and_frees_name() {
        let (host, ctx) = setup();
        let entry: OwnedEntry<i32> =
            OwnedEntry::new(&ctx, "app/tmp", Capability::ReadWrite, true).unwrap();
        assert!(host.is_registered("app/tmp"));
        assert_eq!(host.published(), vec!["app/tmp".to_string()]);

        drop(entry);
        assert!(!host.is_registered("app/tmp"));
        assert!(!ctx.is_claimed("app/tmp"));
        assert_eq!(host.invoke_get("app/tmp"), None);

        let again: BindingResult<OwnedEntry<i32>> =
            OwnedEntry::new(&ctx, "app/tmp", Capability::ReadWrite, false);
        assert!(again.is_ok());
    }

    #[test]
    fn test_malformed_name_releases_claim() {
        let (_host, ctx) = setup();
        let result: BindingResult<OwnedEntry<i32>> =
            OwnedEntry::new(&ctx, "bad name", Capability::ReadOnly, false);
        assert!(matches!(result, Err(BindingError::Registration { .. })));
        assert!(!ctx.is_claimed("bad name"));
    }

    #[test]
    fn test_update_in_place() {
        let (host, ctx) = setup();
        let entry: OwnedEntry<Vec<u8>> =
            OwnedEntry::with_value(&ctx, "app/bytes", Capability::ReadWrite, false, vec![1, 2])
                .unwrap();
        entry.update(|bytes| bytes.push(3));
        assert_eq!(host.invoke_get("app/bytes"), Some(Value::ByteArray(vec![1, 2, 3])));
    }

    #[test]
    fn test_update_can_read_through_host() {
        let (host, ctx) = setup();
        let entry: OwnedEntry<f32> =
            OwnedEntry::with_value(&ctx, "app/counter", Capability::ReadWrite, false, 1.0)
                .unwrap();
        let view: DataRef<f32> = DataRef::read_only(&ctx, "app/counter");

        entry.update(|v| {
            assert_eq!(host.invoke_get("app/counter"), Some(Value::Float(1.0)));
            *v = view.read() + 1.0;
        });
        assert_eq!(entry.get(), 2.0);
        assert_eq!(view.read(), 2.0);
    }
}
