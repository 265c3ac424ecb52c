//! Typed, capability-checked views over named host values.
//!
//! [`DataRef`] covers the scalar kinds and [`ArrayRef`] the array kinds.
//! Which host call a proxy makes is fixed by its type parameter: a
//! `DataRef<f32>` only ever issues float reads and writes.
//!
//! Proxies resolve their name on first use. Until the host knows the name,
//! reads return zero and writes are dropped, with the failure recorded in
//! the context's diagnostics rather than raised.

use crate::context::PluginContext;
use crate::handle::NamedHandle;
use crate::host::{Host, HostHandle};
use plugbind_runtime::{BindingError, BindingResult, Capability, HostValue, ValueKind};
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// A scalar type with a matching pair of host calls.
pub trait Scalar: HostValue + Copy + PartialOrd {
    fn host_read(host: &dyn Host, handle: HostHandle) -> Self;
    fn host_write(host: &dyn Host, handle: HostHandle, value: Self);
}

impl Scalar for i32 {
    fn host_read(host: &dyn Host, handle: HostHandle) -> Self {
        host.read_int(handle)
    }

    fn host_write(host: &dyn Host, handle: HostHandle, value: Self) {
        host.write_int(handle, value)
    }
}

impl Scalar for f32 {
    fn host_read(host: &dyn Host, handle: HostHandle) -> Self {
        host.read_float(handle)
    }

    fn host_write(host: &dyn Host, handle: HostHandle, value: Self) {
        host.write_float(handle, value)
    }
}

impl Scalar for f64 {
    fn host_read(host: &dyn Host, handle: HostHandle) -> Self {
        host.read_double(handle)
    }

    fn host_write(host: &dyn Host, handle: HostHandle, value: Self) {
        host.write_double(handle, value)
    }
}

/// An array element type with a matching pair of ranged host calls.
pub trait Element: Clone + PartialEq + Send + Sync + 'static {
    /// Kind of an array of this element.
    const ARRAY_KIND: ValueKind;

    fn host_read_range(host: &dyn Host, handle: HostHandle, offset: usize, count: usize)
        -> Vec<Self>;
    fn host_write_range(host: &dyn Host, handle: HostHandle, offset: usize, values: &[Self]);
}

impl Element for i32 {
    const ARRAY_KIND: ValueKind = ValueKind::IntArray;

    fn host_read_range(host: &dyn Host, handle: HostHandle, offset: usize, count: usize) -> Vec<Self> {
        host.read_int_array(handle, offset, count)
    }

    fn host_write_range(host: &dyn Host, handle: HostHandle, offset: usize, values: &[Self]) {
        host.write_int_array(handle, offset, values)
    }
}

impl Element for f32 {
    const ARRAY_KIND: ValueKind = ValueKind::FloatArray;

    fn host_read_range(host: &dyn Host, handle: HostHandle, offset: usize, count: usize) -> Vec<Self> {
        host.read_float_array(handle, offset, count)
    }

    fn host_write_range(host: &dyn Host, handle: HostHandle, offset: usize, values: &[Self]) {
        host.write_float_array(handle, offset, values)
    }
}

impl Element for u8 {
    const ARRAY_KIND: ValueKind = ValueKind::ByteArray;

    fn host_read_range(host: &dyn Host, handle: HostHandle, offset: usize, count: usize) -> Vec<Self> {
        host.read_byte_array(handle, offset, count)
    }

    fn host_write_range(host: &dyn Host, handle: HostHandle, offset: usize, values: &[Self]) {
        host.write_byte_array(handle, offset, values)
    }
}

/// Shared name/capability plumbing for both proxy kinds.
struct Binding {
    ctx: PluginContext,
    handle: NamedHandle,
    capability: Capability,
}

impl Binding {
    fn new(ctx: &PluginContext, name: &str, kind: ValueKind, capability: Capability) -> Self {
        Self {
            ctx: ctx.clone(),
            handle: NamedHandle::new(name, kind),
            capability,
        }
    }

    /// Resolve, recording any failure.
    fn resolve(&self) -> BindingResult<HostHandle> {
        self.handle.resolve(self.ctx.host()).map_err(|err| {
            self.ctx.diagnostics().report(&err);
            err
        })
    }

    fn check_writable(&self) -> BindingResult<()> {
        if self.capability.allows_write() {
            return Ok(());
        }
        let err = BindingError::CapabilityViolation(self.handle.name().to_string());
        self.ctx.diagnostics().report(&err);
        Err(err)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("handle", &self.handle)
            .field("capability", &self.capability)
            .finish()
    }
}

/// A scalar host value seen through a name.
#[derive(Debug)]
pub struct DataRef<T: Scalar> {
    binding: Binding,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Scalar> DataRef<T> {
    /// Declare a proxy. Does not resolve yet.
    pub fn new(ctx: &PluginContext, name: &str, capability: Capability) -> Self {
        Self {
            binding: Binding::new(ctx, name, T::KIND, capability),
            _marker: PhantomData,
        }
    }

    /// Declare a read-only proxy.
    pub fn read_only(ctx: &PluginContext, name: &str) -> Self {
        Self::new(ctx, name, Capability::ReadOnly)
    }

    /// Declare a read-write proxy.
    pub fn read_write(ctx: &PluginContext, name: &str) -> Self {
        Self::new(ctx, name, Capability::ReadWrite)
    }

    pub fn name(&self) -> &str {
        self.binding.handle.name()
    }

    pub fn capability(&self) -> Capability {
        self.binding.capability
    }

    /// Check if the name has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.binding.handle.is_resolved()
    }

    /// Read the current value; zero while unresolved.
    pub fn read(&self) -> T {
        match self.binding.resolve() {
            Ok(handle) => T::host_read(self.binding.ctx.host(), handle),
            Err(_) => T::zero(),
        }
    }

    /// Write a new value.
    ///
    /// Fails with `CapabilityViolation` on a read-only proxy without touching
    /// the host, and with `Unresolved` while the host does not know the name.
    pub fn write(&self, value: T) -> BindingResult<()> {
        self.binding.check_writable()?;
        let handle = self.binding.resolve()?;
        T::host_write(self.binding.ctx.host(), handle, value);
        Ok(())
    }
}

/// An array host value seen through a name.
#[derive(Debug)]
pub struct ArrayRef<E: Element> {
    binding: Binding,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Element> ArrayRef<E> {
    /// Declare a proxy. Does not resolve yet.
    pub fn new(ctx: &PluginContext, name: &str, capability: Capability) -> Self {
        Self {
            binding: Binding::new(ctx, name, E::ARRAY_KIND, capability),
            _marker: PhantomData,
        }
    }

    /// Declare a read-only proxy.
    pub fn read_only(ctx: &PluginContext, name: &str) -> Self {
        Self::new(ctx, name, Capability::ReadOnly)
    }

    /// Declare a read-write proxy.
    pub fn read_write(ctx: &PluginContext, name: &str) -> Self {
        Self::new(ctx, name, Capability::ReadWrite)
    }

    pub fn name(&self) -> &str {
        self.binding.handle.name()
    }

    pub fn capability(&self) -> Capability {
        self.binding.capability
    }

    pub fn is_resolved(&self) -> bool {
        self.binding.handle.is_resolved()
    }

    /// Array length as reported by the host on first access.
    pub fn len(&self) -> Option<usize> {
        let handle = self.binding.resolve().ok()?;
        Some(self.binding.handle.array_length(self.binding.ctx.host(), handle))
    }

    /// Check if the array is empty or unresolved.
    pub fn is_empty(&self) -> bool {
        self.len().unwrap_or(0) == 0
    }

    /// Read the whole array; empty while unresolved.
    pub fn read(&self) -> Vec<E> {
        let Ok(handle) = self.binding.resolve() else {
            return Vec::new();
        };
        let length = self.binding.handle.array_length(self.binding.ctx.host(), handle);
        E::host_read_range(self.binding.ctx.host(), handle, 0, length)
    }

    /// Overwrite the array from the start.
    pub fn write(&self, values: &[E]) -> BindingResult<()> {
        self.write_range(0, values)
    }

    /// Read `count` elements starting at `offset`.
    pub fn read_range(&self, offset: usize, count: usize) -> BindingResult<Vec<E>> {
        let handle = self.binding.resolve()?;
        self.check_bounds(handle, offset, count)?;
        Ok(E::host_read_range(
            self.binding.ctx.host(),
            handle,
            offset,
            count,
        ))
    }

    /// Write `values` starting at `offset`.
    pub fn write_range(&self, offset: usize, values: &[E]) -> BindingResult<()> {
        self.binding.check_writable()?;
        let handle = self.binding.resolve()?;
        self.check_bounds(handle, offset, values.len())?;
        E::host_write_range(self.binding.ctx.host(), handle, offset, values);
        Ok(())
    }

    fn check_bounds(&self, handle: HostHandle, offset: usize, count: usize) -> BindingResult<()> {
        let length = self.binding.handle.array_length(self.binding.ctx.host(), handle);
        match offset.checked_add(count) {
            Some(end) if end <= length => Ok(()),
            _ => {
                let err = BindingError::ArrayBounds {
                    name: self.name().to_string(),
                    offset,
                    count,
                    length,
                };
                self.binding.ctx.diagnostics().report(&err);
                Err(err)
            }
        }
    }
}

/// Anything that yields a scalar on demand: proxies, owned entries, literals.
pub trait Readable {
    type Output: PartialOrd;

    fn get(&self) -> Self::Output;
}

impl<T: Scalar> Readable for DataRef<T> {
    type Output = T;

    fn get(&self) -> T {
        self.read()
    }
}

macro_rules! impl_readable_literal {
    ($($ty:ty),*) => {
        $(
            impl Readable for $ty {
                type Output = $ty;

                fn get(&self) -> $ty {
                    *self
                }
            }
        )*
    };
}

impl_readable_literal!(i32, f32, f64);

/// Compare two readable values by reading both.
pub fn compare<A, B>(a: &A, b: &B) -> Option<Ordering>
where
    A: Readable,
    B: Readable<Output = A::Output>,
{
    a.get().partial_cmp(&b.get())
}

/// Check two readable values for equality by reading both.
pub fn equals<A, B>(a: &A, b: &B) -> bool
where
    A: Readable,
    B: Readable<Output = A::Output>,
{
    compare(a, b) == Some(Ordering::Equal)
}

/// `a >= b`, reading both sides.
pub fn at_least<A, B>(a: &A, b: &B) -> bool
where
    A: Readable,
    B: Readable<Output = A::Output>,
{
    matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::memory::InMemoryHost;
    use plugbind_runtime::{PluginManifest, Value};
    use std::sync::Arc;

    fn setup() -> (Arc<InMemoryHost>, PluginContext) {
        let host = Arc::new(InMemoryHost::new());
        let ctx = PluginContext::new(host.clone(), PluginManifest::new("test.proxy", "Proxy"));
        (host, ctx)
    }

    #[test]
    fn test_construct_does_not_resolve() {
        let (host, ctx) = setup();
        host.define("sim/x", Value::Int(3), false);

        let x: DataRef<i32> = DataRef::read_only(&ctx, "sim/x");
        assert!(!x.is_resolved());
        assert_eq!(host.lookup_count("sim/x"), 0);

        assert_eq!(x.read(), 3);
        assert!(x.is_resolved());
    }

    #[test]
    fn test_unresolved_read_is_zero_and_reported_once() {
        let (host, ctx) = setup();
        let missing: DataRef<f64> = DataRef::read_only(&ctx, "sim/missing");

        assert_eq!(missing.read(), 0.0);
        assert_eq!(missing.read(), 0.0);
        assert_eq!(host.lookup_count("sim/missing"), 2);
        assert_eq!(
            ctx.diagnostics()
                .count(DiagnosticKind::ResolutionFailure, "sim/missing"),
            2
        );
    }

    #[test]
    fn test_kind_mismatch_reads_zero() {
        let (host, ctx) = setup();
        host.define("sim/x", Value::Double(9.5), false);

        let x: DataRef<f32> = DataRef::read_only(&ctx, "sim/x");
        assert_eq!(x.read(), 0.0);
        assert!(!x.is_resolved());
        assert_eq!(host.read_count(), 0);
    }

    #[test]
    fn test_read_only_write_never_reaches_host() {
        let (host, ctx) = setup();
        host.define("sim/x", Value::Float(1.0), true);

        let x: DataRef<f32> = DataRef::read_only(&ctx, "sim/x");
        let err = x.write(2.0).unwrap_err();
        assert!(matches!(err, BindingError::CapabilityViolation(_)));
        assert_eq!(host.write_count(), 0);
        assert_eq!(host.lookup_count("sim/x"), 0);
    }

    #[test]
    fn test_unresolved_write() {
        let (host, ctx) = setup();
        let x: DataRef<i32> = DataRef::read_write(&ctx, "sim/later");
        assert!(matches!(x.write(1), Err(BindingError::Unresolved(_))));

        host.define("sim/later", Value::Int(0), true);
        x.write(5).unwrap();
        assert_eq!(host.peek("sim/later"), Some(Value::Int(5)));
    }

    #[test]
    fn test_array_ranges() {
        let (host, ctx) = setup();
        host.define("sim/bytes", Value::ByteArray(vec![1, 2, 3, 4, 5]), true);

        let bytes: ArrayRef<u8> = ArrayRef::read_write(&ctx, "sim/bytes");
        assert_eq!(bytes.len(), Some(5));
        assert_eq!(bytes.read_range(3, 2).unwrap(), vec![4, 5]);
        assert!(matches!(
            bytes.read_range(4, 2),
            Err(BindingError::ArrayBounds { length: 5, .. })
        ));
        assert!(matches!(
            bytes.read_range(usize::MAX, 2),
            Err(BindingError::ArrayBounds { .. })
        ));

        bytes.write_range(0, &[9, 9]).unwrap();
        assert_eq!(bytes.read(), vec![9, 9, 3, 4, 5]);
        assert!(bytes.write_range(4, &[0, 0]).is_err());
    }

    #[test]
    fn test_comparisons() {
        let (host, ctx) = setup();
        host.define("sim/a", Value::Float(80.0), false);
        host.define("sim/b", Value::Float(80.0), false);

        let a: DataRef<f32> = DataRef::read_only(&ctx, "sim/a");
        let b: DataRef<f32> = DataRef::read_only(&ctx, "sim/b");
        assert!(equals(&a, &b));
        assert!(at_least(&a, &79.5f32));
        assert_eq!(compare(&a, &100.0f32), Some(Ordering::Less));
    }
}
