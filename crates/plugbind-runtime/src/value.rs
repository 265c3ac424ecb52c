//! Value kinds and the closed value variant exchanged with the host.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a named host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Float,
    Double,
    IntArray,
    FloatArray,
    ByteArray,
}

impl ValueKind {
    /// Convert kind to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::IntArray => "int_array",
            ValueKind::FloatArray => "float_array",
            ValueKind::ByteArray => "byte_array",
        }
    }

    /// Check if this is one of the array kinds.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            ValueKind::IntArray | ValueKind::FloatArray | ValueKind::ByteArray
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value of any kind, as passed through get/set trampolines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(i32),
    Float(f32),
    Double(f64),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    ByteArray(Vec<u8>),
}

impl Value {
    /// The zero value for a kind: `0` for scalars, empty for arrays.
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Double => Value::Double(0.0),
            ValueKind::IntArray => Value::IntArray(Vec::new()),
            ValueKind::FloatArray => Value::FloatArray(Vec::new()),
            ValueKind::ByteArray => Value::ByteArray(Vec::new()),
        }
    }

    /// Get the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::IntArray(_) => ValueKind::IntArray,
            Value::FloatArray(_) => ValueKind::FloatArray,
            Value::ByteArray(_) => ValueKind::ByteArray,
        }
    }

    /// Element count for arrays, `None` for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::IntArray(v) => Some(v.len()),
            Value::FloatArray(v) => Some(v.len()),
            Value::ByteArray(v) => Some(v.len()),
            _ => None,
        }
    }
}

/// A Rust type that maps onto exactly one [`ValueKind`].
///
/// The mapping is static: a binding declared for `f32` only ever talks to
/// the host as a `Float`.
pub trait HostValue: Clone + Send + 'static {
    /// Kind this type is exchanged as.
    const KIND: ValueKind;

    /// Wrap into the closed variant.
    fn into_value(self) -> Value;

    /// Unwrap from the closed variant. `None` on a kind mismatch.
    fn from_value(value: Value) -> Option<Self>;

    /// Type-appropriate zero.
    fn zero() -> Self;
}

macro_rules! impl_host_value {
    ($ty:ty, $variant:ident, $zero:expr) => {
        impl HostValue for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn zero() -> Self {
                $zero
            }
        }
    };
}

impl_host_value!(i32, Int, 0);
impl_host_value!(f32, Float, 0.0);
impl_host_value!(f64, Double, 0.0);
impl_host_value!(Vec<i32>, IntArray, Vec::new());
impl_host_value!(Vec<f32>, FloatArray, Vec::new());
impl_host_value!(Vec<u8>, ByteArray, Vec::new());
