//! Typed decoding out of a [`Value`]
//!
//! Follows the same rules as the byte-stream decoder: record members resolve
//! exact-then-folded through the shared field cache, null fills scalars with
//! their zero value, binaries feed byte sequences and enums are either a
//! variant name or a single-member object.

use std::sync::Arc;

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer as _, EnumAccess, IntoDeserializer,
    MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use smallvec::{smallvec, SmallVec};

use kspack_format::{KspackError, Result};

use super::{Map, Value};
use crate::fields::{FieldCache, FieldList};
use crate::key::KeyDeserializer;

/// Convert a dynamic tree into `T`.
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(value)
}

impl<'de> IntoDeserializer<'de, KspackError> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! zero_on_null {
    ($($method:ident => $visit:ident($zero:expr),)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                match self {
                    Value::Null => visitor.$visit($zero),
                    other => other.deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = KspackError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(n) => visitor.visit_i64(n),
            Value::Uint(n) => visitor.visit_u64(n),
            Value::Float(f) => visitor.visit_f64(f),
            Value::String(s) => visitor.visit_string(s),
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            Value::Array(items) => visitor.visit_seq(ArrayDeserializer::new(items)),
            Value::Object(map) => visitor.visit_map(ObjectDeserializer::new(map, None)),
        }
    }

    zero_on_null! {
        deserialize_bool => visit_bool(false),
        deserialize_i8 => visit_i8(0),
        deserialize_i16 => visit_i16(0),
        deserialize_i32 => visit_i32(0),
        deserialize_i64 => visit_i64(0),
        deserialize_u8 => visit_u8(0),
        deserialize_u16 => visit_u16(0),
        deserialize_u32 => visit_u32(0),
        deserialize_u64 => visit_u64(0),
        deserialize_f32 => visit_f32(0.0),
        deserialize_f64 => visit_f64(0.0),
        deserialize_str => visit_borrowed_str(""),
        deserialize_string => visit_borrowed_str(""),
        deserialize_bytes => visit_borrowed_bytes(&[]),
        deserialize_byte_buf => visit_borrowed_bytes(&[]),
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Null => visitor.visit_seq(ArrayDeserializer::new(Vec::new())),
            Value::Bytes(bytes) => visitor.visit_seq(ArrayDeserializer::new(
                bytes.into_iter().map(Value::from).collect(),
            )),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Null => visitor.visit_map(ObjectDeserializer::new(Map::new(), None)),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Value::Null => visitor.visit_map(ObjectDeserializer::new(Map::new(), None)),
            Value::Object(map) => {
                let list = FieldCache::global().fields_of(name, fields);
                visitor.visit_map(ObjectDeserializer::new(map, Some(list)))
            }
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Value::String(variant) => visitor.visit_enum(variant.into_deserializer()),
            Value::Object(map) if map.len() == 1 => {
                let (variant, value) = map
                    .into_iter()
                    .next()
                    .ok_or_else(|| KspackError::Message("empty enum object".to_string()))?;
                visitor.visit_enum(VariantValue {
                    variant,
                    value,
                    name,
                })
            }
            Value::Object(map) => Err(KspackError::Message(format!(
                "expected an object with one member for enum {}, found {} members",
                name,
                map.len()
            ))),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        drop(self);
        visitor.visit_unit()
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    forward_to_deserialize_any! {
        i128 u128 char unit unit_struct identifier
    }
}

struct ArrayDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl ArrayDeserializer {
    fn new(items: Vec<Value>) -> Self {
        Self {
            iter: items.into_iter(),
        }
    }
}

impl<'de> SeqAccess<'de> for ArrayDeserializer {
    type Error = KspackError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(value).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct ObjectDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
    fields: Option<Arc<FieldList>>,
    delivered: SmallVec<[bool; 16]>,
}

impl ObjectDeserializer {
    fn new(map: Map, fields: Option<Arc<FieldList>>) -> Self {
        let delivered = match &fields {
            Some(list) => smallvec![false; list.fields().len()],
            None => SmallVec::new(),
        };
        Self {
            iter: map.into_iter(),
            value: None,
            fields,
            delivered,
        }
    }
}

impl<'de> MapAccess<'de> for ObjectDeserializer {
    type Error = KspackError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        // Same policy as the byte decoder: the first member for a field wins.
        for (key, value) in self.iter.by_ref() {
            let field = self
                .fields
                .as_ref()
                .and_then(|list| list.resolve(key.as_bytes()));
            match field {
                Some(field) if self.delivered[field.index] => continue,
                Some(field) => {
                    self.delivered[field.index] = true;
                    self.value = Some(value);
                    return seed
                        .deserialize(BorrowedStrDeserializer::new(field.name))
                        .map(Some);
                }
                None => {
                    self.value = Some(value);
                    return seed
                        .deserialize(KeyDeserializer::transient(key.as_bytes()))
                        .map(Some);
                }
            }
        }
        Ok(None)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        let value = self
            .value
            .take()
            .ok_or_else(|| KspackError::Message("value requested before key".to_string()))?;
        seed.deserialize(value)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct VariantValue {
    variant: String,
    value: Value,
    name: &'static str,
}

impl<'de> EnumAccess<'de> for VariantValue {
    type Error = KspackError;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(KeyDeserializer::transient(self.variant.as_bytes()))?;
        Ok((variant, self))
    }
}

impl<'de> VariantAccess<'de> for VariantValue {
    type Error = KspackError;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.value)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self.value, visitor)
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(self.value, self.name, fields, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::to_value;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Account {
        id: u32,
        owner: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_record_roundtrip() {
        let account = Account {
            id: 9,
            owner: "kim".to_string(),
            tags: vec!["a".to_string()],
        };
        let value = to_value(&account).unwrap();
        assert_eq!(from_value::<Account>(value).unwrap(), account);
    }

    #[test]
    fn test_fold_matched_members() {
        let mut map = Map::new();
        map.insert("ID", 4u8);
        map.insert("Owner", "lee");
        map.insert("TAGS", Value::Null);
        let account: Account = from_value(Value::Object(map)).unwrap();
        assert_eq!(account.id, 4);
        assert_eq!(account.owner, "lee");
        assert!(account.tags.is_empty());
    }

    #[test]
    fn test_repeated_field_keeps_first_member() {
        let mut map = Map::new();
        map.insert("owner", "first");
        map.insert("Owner", "second");
        map.insert("id", 1u8);
        map.insert("tags", Value::Array(vec![]));
        let account: Account = from_value(Value::Object(map)).unwrap();
        assert_eq!(account.owner, "first");
    }

    #[test]
    fn test_integer_map_keys() {
        let mut map = Map::new();
        map.insert("10", true);
        let parsed: BTreeMap<u16, bool> = from_value(Value::Object(map)).unwrap();
        assert!(parsed[&10]);
    }

    #[test]
    fn test_bytes_into_sequence() {
        let bytes: Vec<u8> = from_value(Value::Bytes(vec![4, 5])).unwrap();
        assert_eq!(bytes, vec![4, 5]);
    }

    #[test]
    fn test_enum_forms() {
        #[derive(Debug, Deserialize, PartialEq)]
        enum Op {
            Stop,
            Jump(u16),
        }
        assert_eq!(from_value::<Op>(Value::from("Stop")).unwrap(), Op::Stop);
        let mut map = Map::new();
        map.insert("Jump", 12u16);
        assert_eq!(from_value::<Op>(Value::Object(map)).unwrap(), Op::Jump(12));
    }
}
