// ABOUTME: Serde Deserializer over decoded MessagePack values.
// ABOUTME: Lets a decoded Value (or a whole message) be read into any serde-deserializable Rust type.

use crate::decoder::{Decoder, DecoderConfig};
use crate::error::{Error, Result};
use crate::value::Value;
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;

/// A serde Deserializer that reads from a decoded [`Value`].
///
/// Raw values are presented as strings when they hold valid UTF-8 and as
/// byte buffers otherwise. Value-Objects cannot be deserialized.
pub struct Deserializer {
    value: Value,
}

impl Deserializer {
    /// Create a new Deserializer for a value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    /// Get the underlying value back.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Deserialize a Rust type from a decoded value.
///
/// # Errors
///
/// Returns an error if the value doesn't match the expected type `T`.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(Deserializer::from_value(value))
}

/// Decode one MessagePack message and deserialize it into `T`.
///
/// # Errors
///
/// Returns an error if:
/// - The data is malformed or truncated
/// - There are trailing bytes after the message
/// - The data doesn't match the expected type `T`
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    from_slice_with_config(data, DecoderConfig::default())
}

/// Decode one MessagePack message with custom configuration and deserialize it into `T`.
///
/// # Errors
///
/// Returns an error if:
/// - The data is malformed, truncated or exceeds configured limits
/// - There are trailing bytes (unless `allow_trailing_bytes` is set)
/// - The data doesn't match the expected type `T`
pub fn from_slice_with_config<T: DeserializeOwned>(data: &[u8], config: DecoderConfig) -> Result<T> {
    let value = Decoder::with_config(config).decode(data)?;
    from_value(value)
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Deserializer;

    fn into_deserializer(self) -> Deserializer {
        Deserializer::from_value(self)
    }
}

impl<'de> de::Deserializer<'de> for Deserializer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Nil => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(n) => visitor.visit_i64(n),
            Value::BigInt(n) => match u64::try_from(&n) {
                Ok(n) => visitor.visit_u64(n),
                Err(_) => Err(Error::Custom(format!("integer {n} out of range"))),
            },
            Value::Float32(f) => visitor.visit_f32(f),
            Value::Float64(f) => visitor.visit_f64(f),
            Value::Raw(bytes) => match String::from_utf8(bytes) {
                Ok(s) => visitor.visit_string(s),
                Err(err) => visitor.visit_byte_buf(err.into_bytes()),
            },
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Map(pairs) => visitor.visit_map(MapDeserializer::new(pairs)),
            Value::ValueObject(_) => Err(Error::Custom(
                "value-object cannot be deserialized".into(),
            )),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Raw(bytes) => visitor.visit_byte_buf(bytes),
            other => Deserializer::from_value(other).deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.value.is_nil() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.value {
            // Unit variant: just a string
            Value::Raw(bytes) => visitor.visit_enum(UnitVariantDeserializer {
                variant: Value::Raw(bytes),
            }),
            // Other variants: map with a single pair
            Value::Map(pairs) if pairs.len() == 1 => {
                let mut pairs = pairs.into_iter();
                match pairs.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer { variant, value }),
                    None => Err(Error::Custom("expected string or map for enum".into())),
                }
            }
            _ => Err(Error::Custom("expected string or map for enum".into())),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(items: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: items.into_iter(),
        }
    }
}

impl<'de> SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.iter.next() {
            Some(value) => seed.deserialize(Deserializer::from_value(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: std::vec::IntoIter<(Value, Value)>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(pairs: Vec<(Value, Value)>) -> Self {
        MapDeserializer {
            iter: pairs.into_iter(),
            value: None,
        }
    }
}

impl<'de> MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(Deserializer::from_value(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let value = self
            .value
            .take()
            .ok_or_else(|| Error::Custom("map value requested before its key".into()))?;
        seed.deserialize(Deserializer::from_value(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct UnitVariantDeserializer {
    variant: Value,
}

impl<'de> de::EnumAccess<'de> for UnitVariantDeserializer {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(mut self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(Deserializer::from_value(std::mem::take(&mut self.variant)))?;
        Ok((variant, self))
    }
}

impl<'de> de::VariantAccess<'de> for UnitVariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, _seed: T) -> Result<T::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }
}

struct EnumDeserializer {
    variant: Value,
    value: Value,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(Deserializer::from_value(self.variant))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Value,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Err(Error::Custom("expected newtype, tuple, or struct variant".into()))
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(Deserializer::from_value(self.value))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Array(items) => visitor.visit_seq(SeqDeserializer::new(items)),
            _ => Err(Error::Custom("expected array for tuple variant".into())),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.value {
            Value::Map(pairs) => visitor.visit_map(MapDeserializer::new(pairs)),
            _ => Err(Error::Custom("expected map for struct variant".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msgpack;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[test]
    fn test_from_value_primitives() {
        assert_eq!(from_value::<i32>(Value::Int(-7)).unwrap(), -7);
        assert_eq!(from_value::<u64>(Value::from(u64::MAX)).unwrap(), u64::MAX);
        assert_eq!(from_value::<f32>(Value::Float32(1.5)).unwrap(), 1.5);
        assert_eq!(from_value::<f64>(Value::Float32(1.5)).unwrap(), 1.5);
        assert_eq!(from_value::<String>(Value::raw("hi")).unwrap(), "hi");
        assert_eq!(from_value::<Option<bool>>(Value::Nil).unwrap(), None);
        assert_eq!(from_value::<Option<bool>>(Value::Bool(true)).unwrap(), Some(true));
    }

    #[test]
    fn test_from_value_out_of_range() {
        assert!(from_value::<u8>(Value::Int(300)).is_err());
        assert!(from_value::<u32>(Value::Int(-1)).is_err());
    }

    #[test]
    fn test_from_slice_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Person {
            name: String,
            age: u32,
            tags: Vec<String>,
        }

        // {"name": "Alice", "age": 30, "tags": ["a"]}
        let data = [
            0x83, 0xa4, b'n', b'a', b'm', b'e', 0xa5, b'A', b'l', b'i', b'c', b'e', 0xa3, b'a',
            b'g', b'e', 0x1e, 0xa4, b't', b'a', b'g', b's', 0x91, 0xa1, b'a',
        ];
        let person: Person = from_slice(&data).unwrap();
        assert_eq!(
            person,
            Person {
                name: "Alice".into(),
                age: 30,
                tags: vec!["a".into()],
            }
        );
    }

    #[test]
    fn test_deserialize_bytes() {
        struct BytesVisitor;

        impl Visitor<'_> for BytesVisitor {
            type Value = Vec<u8>;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("bytes")
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Vec<u8>, E> {
                Ok(v)
            }
        }

        let de = Deserializer::from_value(Value::raw(vec![0xffu8, 0x00]));
        let bytes = de::Deserializer::deserialize_byte_buf(de, BytesVisitor).unwrap();
        assert_eq!(bytes, vec![0xff, 0x00]);
    }

    #[test]
    fn test_from_value_map_and_enum() {
        #[derive(Debug, Deserialize, PartialEq)]
        enum Shape {
            Empty,
            Circle(u32),
            Rect { w: u32, h: u32 },
        }

        assert_eq!(from_value::<Shape>(Value::raw("Empty")).unwrap(), Shape::Empty);
        assert_eq!(
            from_value::<Shape>(msgpack!({ "Circle": 3 })).unwrap(),
            Shape::Circle(3)
        );
        assert_eq!(
            from_value::<Shape>(msgpack!({ "Rect": { "w": 1, "h": 2 } })).unwrap(),
            Shape::Rect { w: 1, h: 2 }
        );

        let map: HashMap<String, i64> = from_value(msgpack!({ "x": 1, "y": (-1) })).unwrap();
        assert_eq!(map.get("y"), Some(&-1));
    }

    #[test]
    fn test_value_object_is_not_deserializable() {
        let value = Value::ValueObject(crate::value::ValueObject::new(1u8));
        assert!(from_value::<i32>(value).is_err());
    }

    #[test]
    fn test_from_slice_propagates_decode_errors() {
        assert_eq!(from_slice::<i32>(&[0xc1]), Err(Error::InvalidTypeCode(0xc1)));
        assert_eq!(from_slice::<Vec<i32>>(&[0x92, 0x01]), Err(Error::Truncated));
    }
}
