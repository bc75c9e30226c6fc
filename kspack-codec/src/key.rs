//! Deserializer for object keys
//!
//! Keys are raw bytes on the wire. String-like targets receive the text;
//! integer and bool map keys are parsed from it.

use serde::de::{self, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

use kspack_format::KspackError;

enum KeyBytes<'a, 'de> {
    /// Borrowed from the input buffer
    Borrowed(&'de [u8]),
    /// Owned by someone else for the duration of the call
    Transient(&'a [u8]),
}

/// Deserializer over one object key.
pub(crate) struct KeyDeserializer<'a, 'de> {
    key: KeyBytes<'a, 'de>,
}

impl<'a, 'de> KeyDeserializer<'a, 'de> {
    pub(crate) fn borrowed(key: &'de [u8]) -> Self {
        Self {
            key: KeyBytes::Borrowed(key),
        }
    }

    pub(crate) fn transient(key: &'a [u8]) -> Self {
        Self {
            key: KeyBytes::Transient(key),
        }
    }

    fn bytes(&self) -> &[u8] {
        match self.key {
            KeyBytes::Borrowed(b) => b,
            KeyBytes::Transient(b) => b,
        }
    }

    fn text(&self) -> Result<&str, KspackError> {
        std::str::from_utf8(self.bytes()).map_err(|_| KspackError::InvalidUtf8("key"))
    }

    fn parse<T: std::str::FromStr>(&self) -> Result<T, KspackError> {
        let text = self.text()?;
        text.parse()
            .map_err(|_| KspackError::Message(format!("invalid map key: {:?}", text)))
    }
}

macro_rules! parse_key {
    ($($method:ident => $visit:ident: $ty:ty,)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, KspackError> {
                visitor.$visit(self.parse::<$ty>()?)
            }
        )*
    };
}

impl<'a, 'de> de::Deserializer<'de> for KeyDeserializer<'a, 'de> {
    type Error = KspackError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, KspackError> {
        match self.key {
            KeyBytes::Borrowed(b) => match std::str::from_utf8(b) {
                Ok(s) => visitor.visit_borrowed_str(s),
                Err(_) => visitor.visit_borrowed_bytes(b),
            },
            KeyBytes::Transient(b) => match std::str::from_utf8(b) {
                Ok(s) => visitor.visit_str(s),
                Err(_) => visitor.visit_bytes(b),
            },
        }
    }

    parse_key! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
        deserialize_char => visit_char: char,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, KspackError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, KspackError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, KspackError> {
        let variant = self.text()?.to_owned();
        visitor.visit_enum(variant.into_deserializer())
    }

    forward_to_deserialize_any! {
        i128 u128 str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_string_key() {
        let key = String::deserialize(KeyDeserializer::borrowed(b"name")).unwrap();
        assert_eq!(key, "name");
    }

    #[test]
    fn test_borrowed_str_key() {
        let input: &[u8] = b"name";
        let key = <&str>::deserialize(KeyDeserializer::borrowed(input)).unwrap();
        assert_eq!(key, "name");
    }

    #[test]
    fn test_integer_keys() {
        assert_eq!(u32::deserialize(KeyDeserializer::transient(b"42")).unwrap(), 42);
        assert_eq!(i8::deserialize(KeyDeserializer::transient(b"-3")).unwrap(), -3);
        assert!(u8::deserialize(KeyDeserializer::transient(b"300")).is_err());
        assert!(i64::deserialize(KeyDeserializer::transient(b"x1")).is_err());
    }

    #[test]
    fn test_unit_enum_key() {
        #[derive(Debug, Deserialize, PartialEq, Eq)]
        enum Level {
            Info,
            Warn,
        }
        assert_eq!(
            Level::deserialize(KeyDeserializer::borrowed(b"Warn")).unwrap(),
            Level::Warn
        );
        assert_eq!(
            Level::deserialize(KeyDeserializer::transient(b"Info")).unwrap(),
            Level::Info
        );
        assert!(Level::deserialize(KeyDeserializer::borrowed(b"Debug")).is_err());
    }
}
