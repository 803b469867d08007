// ABOUTME: Streaming MessagePack decoder with Value-Object framing for Rust.
// ABOUTME: Decodes messages incrementally from arbitrary chunks and exposes a dynamic Value with serde integration.

//! # msgpack-vo
//!
//! A resumable MessagePack decoder. Messages can arrive in chunks split at any
//! byte; the decoder keeps its progress between calls and never re-reads a
//! consumed byte. Besides the classic MessagePack types it understands the
//! Value-Object marker (`0xd7`), whose payload is handed to an application
//! supplied [`VoHelper`].
//!
//! ## Quick Start
//!
//! ```rust
//! use msgpack_vo::{decode_value, msgpack};
//!
//! // {"id": 7, "tags": ["a"]}
//! let bytes = [0x82, 0xa2, b'i', b'd', 0x07, 0xa4, b't', b'a', b'g', b's', 0x91, 0xa1, b'a'];
//! let value = decode_value(&bytes).unwrap();
//! assert_eq!(value, msgpack!({ "id": 7, "tags": ["a"] }));
//! assert_eq!(value.get_key("id").and_then(|v| v.as_i64()), Some(7));
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use msgpack_vo::Decoder;
//!
//! let message = [0x93, 0x01, 0x02, 0x03];
//! let mut decoder = Decoder::new();
//! let mut pending = Vec::new();
//! for chunk in message.chunks(1) {
//!     pending.extend_from_slice(chunk);
//!     let consumed = decoder.advance(&pending, 0, pending.len()).unwrap();
//!     pending.drain(..consumed);
//! }
//! assert!(decoder.is_finished());
//! ```
//!
//! ## Serde
//!
//! ```rust
//! use msgpack_vo::from_slice;
//!
//! let numbers: Vec<u16> = from_slice(&[0x92, 0x01, 0xcd, 0x01, 0x00]).unwrap();
//! assert_eq!(numbers, vec![1, 256]);
//! ```
//!
//! ## Resource Limits
//!
//! Default limits:
//! - Maximum nesting depth: 32 (Value-Objects count as containers)
//! - Maximum raw length and container size: 2^31-1
//! - Container capacity reserved up front: at most 4096 entries

pub mod de;
pub mod decoder;
pub mod error;
pub mod types;
pub mod value;
pub mod vo;

// Re-export commonly used items at the crate root
pub use de::{from_slice, from_slice_with_config, from_value, Deserializer};
pub use decoder::{Decoder, DecoderConfig};
pub use error::{Error, FormatError, Result};
pub use types::{limits, type_code, vo_header};
pub use value::{Value, ValueObject};
pub use vo::{flagged_fields, VoHelper, VoInstance};

pub use num_bigint as bigint;

// The msgpack! macro is automatically exported at crate root via #[macro_export]

use serde::{Deserialize, Serialize};

/// Decode one complete MessagePack message into a `Value`.
///
/// # Example
///
/// ```rust
/// use msgpack_vo::{decode_value, Value};
///
/// let bytes = vec![0x93, 0x01, 0x02, 0x03]; // [1, 2, 3]
/// let value = decode_value(&bytes).unwrap();
/// assert!(value.is_array());
/// ```
///
/// # Errors
///
/// Returns an error if the data is malformed, incomplete, or followed by trailing bytes.
pub fn decode_value(data: &[u8]) -> Result<Value> {
    decode_value_with_config(data, DecoderConfig::default())
}

/// Decode one complete MessagePack message into a `Value` with custom configuration.
///
/// # Errors
///
/// Returns an error if the data is malformed, incomplete, exceeds the configured
/// limits, or is followed by trailing bytes (unless `allow_trailing_bytes` is set).
pub fn decode_value_with_config(data: &[u8], config: DecoderConfig) -> Result<Value> {
    Decoder::with_config(config).decode(data)
}

// Implement Serialize for Value
impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::BigInt(n) => match u64::try_from(n) {
                Ok(n) => serializer.serialize_u64(n),
                // Only reachable for values built by hand; keep every digit
                Err(_) => serializer.collect_str(n),
            },
            Value::Float32(f) => serializer.serialize_f32(*f),
            Value::Float64(f) => serializer.serialize_f64(*f),
            Value::Raw(bytes) => match self.as_str() {
                Some(s) => serializer.serialize_str(s),
                None => serializer.serialize_bytes(bytes),
            },
            Value::Array(arr) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for item in arr {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(pairs) => {
                use serde::ser::SerializeMap;
                let mut m = serializer.serialize_map(Some(pairs.len()))?;
                for (key, val) in pairs {
                    m.serialize_entry(key, val)?;
                }
                m.end()
            }
            Value::ValueObject(_) => serializer.serialize_unit_struct("ValueObject"),
        }
    }
}

// Implement Deserialize for Value
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> serde::de::Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "any valid MessagePack value")
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
                Ok(Value::Int(v))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_f32<E>(self, v: f32) -> std::result::Result<Value, E> {
                Ok(Value::Float32(v))
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
                Ok(Value::Float64(v))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
                Ok(Value::Raw(v))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Nil)
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Nil)
            }

            fn visit_some<D: serde::Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<Value, D::Error> {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Value, A::Error> {
                let mut arr = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    arr.push(elem);
                }
                Ok(Value::Array(arr))
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Value, A::Error> {
                let mut pairs = Vec::new();
                while let Some((key, val)) = map.next_entry()? {
                    pairs.push((key, val));
                }
                Ok(Value::Map(pairs))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_value_round_trips_through_serde() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Reading {
            sensor: String,
            values: Vec<f32>,
            ok: bool,
        }

        // {"sensor": "t1", "values": [1.5], "ok": true}
        let bytes = [
            0x83, 0xa6, b's', b'e', b'n', b's', b'o', b'r', 0xa2, b't', b'1', 0xa6, b'v', b'a',
            b'l', b'u', b'e', b's', 0x91, 0xca, 0x3f, 0xc0, 0x00, 0x00, 0xa2, b'o', b'k', 0xc3,
        ];
        let value = decode_value(&bytes).unwrap();
        let reading: Reading = from_value(value.clone()).unwrap();
        assert_eq!(
            reading,
            Reading {
                sensor: "t1".into(),
                values: vec![1.5],
                ok: true,
            }
        );

        // Value -> serde -> Value keeps structure, map order and float width
        let again: Value = from_value(value.clone()).unwrap();
        assert_eq!(again, value);
    }

    #[test]
    fn test_value_to_json() {
        let value = msgpack!({ "n": 1, "list": [true, nil], "big": (u64::MAX) });
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"n":1,"list":[true,null],"big":18446744073709551615}"#);
    }

    #[test]
    fn test_value_from_json() {
        let value: Value = serde_json::from_str(r#"{"a":[1,-2,2.5,"x"]}"#).unwrap();
        assert_eq!(value, msgpack!({ "a": [1, (-2i64), 2.5, "x"] }));
    }

    #[test]
    fn test_decode_value_with_config() {
        let config = DecoderConfig {
            max_depth: 1,
            ..DecoderConfig::default()
        };
        assert!(decode_value_with_config(&[0x91, 0x01], config.clone()).is_ok());
        assert_eq!(
            decode_value_with_config(&[0x91, 0x91, 0x01], config),
            Err(Error::MaxDepthExceeded(1))
        );
    }
}
