// ABOUTME: Dynamic MessagePack value type produced by the streaming decoder.
// ABOUTME: Keeps float widths distinct, promotes large uint64 to BigInt, and carries opaque Value-Objects.

use num_bigint::BigUint;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Validate and convert bytes to a UTF-8 string.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
fn validate_utf8(bytes: &[u8]) -> Option<&str> {
    simdutf8::basic::from_utf8(bytes).ok()
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
fn validate_utf8(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

/// A decoded MessagePack value.
///
/// Maps keep their pairs in encoding order and are not deduplicated; keys may be any
/// value, so a map is a list of pairs rather than a keyed collection.
#[derive(Clone, PartialEq, Default)]
pub enum Value {
    /// nil
    #[default]
    Nil,
    /// true / false
    Bool(bool),
    /// Any integer that fits in an i64, including every uint8/16/32
    Int(i64),
    /// A uint64 with its top bit set (2^63 and above), kept as an exact magnitude
    BigInt(BigUint),
    /// A 32-bit float, kept at its wire width
    Float32(f32),
    /// A 64-bit float
    Float64(f64),
    /// A byte string (no text/binary distinction at this layer)
    Raw(Vec<u8>),
    /// An array, elements in encoding order
    Array(Vec<Value>),
    /// A map as ordered key/value pairs
    Map(Vec<(Value, Value)>),
    /// The materialized result of a Value-Object, as produced by its helper
    ValueObject(ValueObject),
}

/// Opaque handle to an application object built by a Value-Object helper.
///
/// Cloning shares the underlying object. Two handles compare equal only when they
/// point at the same object.
#[derive(Clone)]
pub struct ValueObject {
    inner: Arc<dyn Any + Send + Sync>,
}

impl ValueObject {
    /// Wrap an application object.
    pub fn new<T: Any + Send + Sync>(object: T) -> Self {
        Self {
            inner: Arc::new(object),
        }
    }

    /// Borrow the wrapped object if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns true if the wrapped object has type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }
}

impl PartialEq for ValueObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ValueObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueObject(..)")
    }
}

impl Value {
    /// Build a raw value from bytes.
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Raw(bytes.into())
    }

    /// Returns true if this value is nil.
    #[must_use] pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns true if this value is a boolean.
    #[must_use] pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns true if this value is any numeric type.
    #[must_use] pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::BigInt(_) | Value::Float32(_) | Value::Float64(_)
        )
    }

    /// Returns true if this value is a raw byte string.
    #[must_use] pub fn is_raw(&self) -> bool {
        matches!(self, Value::Raw(_))
    }

    /// Returns true if this value is an array.
    #[must_use] pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns true if this value is a map.
    #[must_use] pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns true if this value came from a Value-Object helper.
    #[must_use] pub fn is_value_object(&self) -> bool {
        matches!(self, Value::ValueObject(_))
    }

    /// If this is a boolean, returns the value.
    #[must_use] pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If this is an integer that fits in an i64, returns it.
    #[must_use] pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::BigInt(n) => i64::try_from(n).ok(),
            _ => None,
        }
    }

    /// If this is a non-negative integer that fits in a u64, returns it.
    #[must_use] pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(n) => u64::try_from(*n).ok(),
            Value::BigInt(n) => u64::try_from(n).ok(),
            _ => None,
        }
    }

    /// If this is an arbitrary-precision integer, returns a reference to it.
    #[must_use] pub fn as_big_int(&self) -> Option<&BigUint> {
        match self {
            Value::BigInt(n) => Some(n),
            _ => None,
        }
    }

    /// If this is a number, returns the value as f64.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Intentional: int-to-float conversion may lose precision
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(f) => Some(f64::from(*f)),
            Value::Float64(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::BigInt(n) => u64::try_from(n).ok().map(|n| n as f64),
            _ => None,
        }
    }

    /// If this is a raw value, returns its bytes.
    #[must_use] pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Raw(b) => Some(b),
            _ => None,
        }
    }

    /// If this is a raw value holding valid UTF-8, returns it as a string.
    #[must_use] pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Raw(b) => validate_utf8(b),
            _ => None,
        }
    }

    /// If this is an array, returns a reference to it.
    #[must_use] pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// If this is an array, returns a mutable reference to it.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// If this is a map, returns its pairs.
    #[must_use] pub fn as_map(&self) -> Option<&Vec<(Value, Value)>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// If this is a map, returns a mutable reference to its pairs.
    pub fn as_map_mut(&mut self) -> Option<&mut Vec<(Value, Value)>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// If this is a Value-Object result, returns its handle.
    #[must_use] pub fn as_value_object(&self) -> Option<&ValueObject> {
        match self {
            Value::ValueObject(vo) => Some(vo),
            _ => None,
        }
    }

    /// Index into an array. Returns None if not an array or index out of bounds.
    #[must_use] pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|a| a.get(index))
    }

    /// Look up the first map entry whose raw key equals `key`.
    /// Returns None if not a map or no such key.
    #[must_use] pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|pairs| {
            pairs
                .iter()
                .find(|(k, _)| k.as_bytes() == Some(key.as_bytes()))
                .map(|(_, v)| v)
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::BigInt(n) => write!(f, "BigInt({n})"),
            Value::Float32(n) => write!(f, "Float32({n})"),
            Value::Float64(n) => write!(f, "Float64({n})"),
            Value::Raw(b) => match validate_utf8(b) {
                Some(s) => write!(f, "Raw({s:?})"),
                None => write!(f, "Raw({b:02x?})"),
            },
            Value::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Value::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Value::ValueObject(vo) => vo.fmt(f),
        }
    }
}

// Human-readable output (JSON-like); raw values print as strings when they are UTF-8
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::BigInt(n) => write!(f, "{n}"),
            Value::Float32(n) => write!(f, "{n}"),
            Value::Float64(n) => write!(f, "{n}"),
            Value::Raw(b) => match validate_utf8(b) {
                Some(s) => write!(f, "\"{}\"", s.escape_default()),
                None => {
                    write!(f, "0x")?;
                    for byte in b {
                        write!(f, "{byte:02x}")?;
                    }
                    Ok(())
                }
            },
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::ValueObject(_) => write!(f, "<value-object>"),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i8> for Value {
    fn from(n: i8) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<i16> for Value {
    fn from(n: i16) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::BigInt(BigUint::from(n)),
        }
    }
}

impl From<BigUint> for Value {
    fn from(n: BigUint) -> Self {
        match i64::try_from(&n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::BigInt(n),
        }
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float32(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float64(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Raw(s.into_bytes())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Raw(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Raw(b.to_vec())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<ValueObject> for Value {
    fn from(vo: ValueObject) -> Self {
        Value::ValueObject(vo)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::Array(iter.into_iter().map(Into::into).collect())
    }
}

/// Macro for building MessagePack values, mostly as expected values in tests.
///
/// String literals become raw values; `{ k: v }` builds a map in the order written.
///
/// # Examples
///
/// ```rust
/// use msgpack_vo::msgpack;
///
/// let value = msgpack!({
///     "name": "test",
///     "values": [1, 2, 3],
///     "active": true
/// });
/// assert_eq!(value.get_key("name").and_then(|v| v.as_str()), Some("test"));
/// ```
#[macro_export]
macro_rules! msgpack {
    // nil
    (nil) => {
        $crate::Value::Nil
    };

    // bool
    (true) => {
        $crate::Value::Bool(true)
    };
    (false) => {
        $crate::Value::Bool(false)
    };

    // array
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![ $( $crate::msgpack!($elem) ),* ])
    };

    // map
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::Value::Map(vec![ $( ($crate::msgpack!($key), $crate::msgpack!($value)) ),* ])
    };

    // other expressions (numbers, strings, etc.)
    ($other:expr) => {
        $crate::Value::from($other)
    };
}
