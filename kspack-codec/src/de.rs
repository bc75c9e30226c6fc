//! Decode engine
//!
//! A forward-only cursor over the encoded buffer, exposed as a
//! [`serde::Deserializer`]. Every entry is dispatched on its tag; object
//! members are resolved against the target's field table (exact name first,
//! then case-insensitive) and members with no slot are skipped by measuring
//! them with [`crate::walk::entry_end`].

use std::sync::Arc;

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{
    self, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, VariantAccess,
    Visitor,
};
use serde::forward_to_deserialize_any;
use smallvec::{smallvec, SmallVec};

use kspack_format::constants::CONTAINER_COUNT_LEN;
use kspack_format::primitive::{
    read_bool, read_f32, read_f64, read_i16, read_i32, read_i64, read_i8, read_slice, read_u16,
    read_u32, read_u64, read_u8,
};
use kspack_format::{EntryHeader, KspackError, Limits, Result, Tag};

use crate::fields::{FieldCache, FieldList};
use crate::key::KeyDeserializer;
use crate::walk;

/// Smallest possible entry: tag, key length and a one-byte value.
const MIN_ENTRY_LEN: usize = 3;

/// Decoder options
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Security limits
    pub limits: Limits,
}

/// Deserializer reading one root entry from a byte slice.
pub struct Deserializer<'de> {
    input: &'de [u8],
    pos: usize,
    depth: usize,
    limits: Limits,
    fields: &'static FieldCache,
    /// Header of the entry at `pos`, parsed but not consumed
    peeked: Option<EntryHeader<'de>>,
    /// Nothing has been consumed yet
    root_pending: bool,
}

impl<'de> Deserializer<'de> {
    /// Create a deserializer with default limits.
    pub fn from_slice(input: &'de [u8]) -> Result<Self> {
        Self::with_options(input, &DecodeOptions::default())
    }

    /// Create a deserializer with explicit options.
    pub fn with_options(input: &'de [u8], options: &DecodeOptions) -> Result<Self> {
        options.limits.check_input_len(input.len())?;
        Ok(Self {
            input,
            pos: 0,
            depth: 0,
            limits: options.limits.clone(),
            fields: FieldCache::global(),
            peeked: None,
            root_pending: true,
        })
    }

    /// Check that the root entry consumed the whole buffer.
    pub fn end(&self) -> Result<()> {
        if self.peeked.is_some() || self.pos != self.input.len() {
            return Err(KspackError::UnexpectedEnd);
        }
        Ok(())
    }

    /// Current cursor offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek_header(&mut self) -> Result<EntryHeader<'de>> {
        if let Some(header) = self.peeked {
            return Ok(header);
        }
        let header = EntryHeader::parse(self.input, self.pos)?;
        self.peeked = Some(header);
        Ok(header)
    }

    fn take_header(&mut self) -> Result<EntryHeader<'de>> {
        let header = self.peek_header()?;
        self.peeked = None;
        self.root_pending = false;
        self.pos += header.header_len;
        Ok(header)
    }

    /// Skip the entry at the cursor without decoding it.
    fn skip_entry(&mut self) -> Result<()> {
        self.peeked = None;
        self.root_pending = false;
        self.pos = walk::entry_end(self.input, self.pos, self.depth, &self.limits)?;
        Ok(())
    }

    /// Logical payload of a non-container entry whose header was taken.
    fn payload(&mut self, header: &EntryHeader<'de>) -> Result<&'de [u8]> {
        let logical = header.payload_len()?;
        let stored = header.value_len()?;
        let bytes = read_slice(self.input, self.pos, stored)?;
        self.pos += stored;
        Ok(&bytes[..logical])
    }

    fn text(&mut self, header: &EntryHeader<'de>) -> Result<&'de str> {
        let bytes = self.payload(header)?;
        std::str::from_utf8(bytes).map_err(|_| KspackError::InvalidUtf8("string"))
    }

    /// Consume a null entry at the cursor; false when the entry is not null.
    fn take_null(&mut self) -> Result<bool> {
        if self.peek_header()?.tag != Tag::Null {
            return Ok(false);
        }
        let header = self.take_header()?;
        self.payload(&header)?;
        Ok(true)
    }

    /// Read the count of a container whose header was taken and enter it.
    fn open_container(&mut self) -> Result<usize> {
        self.limits.check_depth(self.depth + 1)?;
        let count = read_u32(self.input, self.pos)? as usize;
        self.pos += CONTAINER_COUNT_LEN;
        let remaining = self.input.len().saturating_sub(self.pos);
        if count.saturating_mul(MIN_ENTRY_LEN) > remaining {
            return Err(KspackError::UnexpectedEnd);
        }
        self.depth += 1;
        Ok(count)
    }

    fn close_container(&mut self) {
        self.depth -= 1;
    }

    fn visit_object<V>(&mut self, fields: Option<Arc<FieldList>>, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let count = self.open_container()?;
        let delivered = match &fields {
            Some(list) => smallvec![false; list.fields().len()],
            None => SmallVec::new(),
        };
        let mut access = ObjectAccess {
            de: self,
            remaining: count,
            fields,
            delivered,
        };
        let value = visitor.visit_map(&mut access)?;
        access.drain()?;
        self.close_container();
        Ok(value)
    }

    fn visit_array<V>(&mut self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let count = self.open_container()?;
        let mut access = ArrayAccess {
            de: self,
            remaining: count,
        };
        let value = visitor.visit_seq(&mut access)?;
        access.drain()?;
        self.close_container();
        Ok(value)
    }

    /// Dispatch an entry whose header was taken to the matching visit call.
    fn visit_entry<V>(&mut self, header: EntryHeader<'de>, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match header.tag {
            Tag::Object => self.visit_object(None, visitor),
            Tag::Array => self.visit_array(visitor),
            Tag::String | Tag::ShortString => {
                let text = self.text(&header)?;
                visitor.visit_borrowed_str(text)
            }
            Tag::Binary | Tag::ShortBinary => {
                let bytes = self.payload(&header)?;
                visitor.visit_borrowed_bytes(bytes)
            }
            Tag::Null => {
                self.payload(&header)?;
                visitor.visit_unit()
            }
            Tag::Bool => {
                let p = self.payload(&header)?;
                visitor.visit_bool(read_bool(p, 0)?)
            }
            Tag::Int8 => {
                let p = self.payload(&header)?;
                visitor.visit_i8(read_i8(p, 0)?)
            }
            Tag::Int16 => {
                let p = self.payload(&header)?;
                visitor.visit_i16(read_i16(p, 0)?)
            }
            Tag::Int32 => {
                let p = self.payload(&header)?;
                visitor.visit_i32(read_i32(p, 0)?)
            }
            Tag::Int64 => {
                let p = self.payload(&header)?;
                visitor.visit_i64(read_i64(p, 0)?)
            }
            Tag::Uint8 => {
                let p = self.payload(&header)?;
                visitor.visit_u8(read_u8(p, 0)?)
            }
            Tag::Uint16 => {
                let p = self.payload(&header)?;
                visitor.visit_u16(read_u16(p, 0)?)
            }
            Tag::Uint32 => {
                let p = self.payload(&header)?;
                visitor.visit_u32(read_u32(p, 0)?)
            }
            Tag::Uint64 => {
                let p = self.payload(&header)?;
                visitor.visit_u64(read_u64(p, 0)?)
            }
            Tag::Float => {
                let p = self.payload(&header)?;
                visitor.visit_f32(read_f32(p, 0)?)
            }
            Tag::Double => {
                let p = self.payload(&header)?;
                visitor.visit_f64(read_f64(p, 0)?)
            }
        }
    }

    /// Sequence-shaped targets: arrays decode element-wise, binaries hand
    /// over their bytes one by one.
    fn visit_sequence<V>(&mut self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.take_null()? {
            return visitor.visit_seq(BytesAccess { bytes: &[] });
        }
        let header = self.take_header()?;
        if header.tag.is_binary() {
            let bytes = self.payload(&header)?;
            return visitor.visit_seq(BytesAccess { bytes });
        }
        self.visit_entry(header, visitor)
    }
}

macro_rules! zero_on_null {
    ($($method:ident => $visit:ident($zero:expr),)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                if self.take_null()? {
                    return visitor.$visit($zero);
                }
                de::Deserializer::deserialize_any(self, visitor)
            }
        )*
    };
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = KspackError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let header = self.take_header()?;
        self.visit_entry(header, visitor)
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
        if self.take_null()? {
            return visitor.visit_none();
        }
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit_sequence(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.visit_sequence(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.visit_sequence(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.take_null()? {
            return visitor.visit_map(EmptyAccess);
        }
        let header = self.take_header()?;
        self.visit_entry(header, visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        if self.take_null()? {
            return visitor.visit_map(EmptyAccess);
        }
        let header = self.take_header()?;
        if header.tag == Tag::Object {
            let list = self.fields.fields_of(name, fields);
            return self.visit_object(Some(list), visitor);
        }
        self.visit_entry(header, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let header = self.take_header()?;
        match header.tag {
            Tag::String | Tag::ShortString => {
                let variant = self.text(&header)?;
                visitor.visit_enum(BorrowedStrDeserializer::new(variant))
            }
            Tag::Object => {
                let count = self.open_container()?;
                if count != 1 {
                    return Err(KspackError::Message(format!(
                        "expected an object with one member for enum {}, found {} members",
                        name, count
                    )));
                }
                let value = visitor.visit_enum(VariantEntry { de: self, name })?;
                self.close_container();
                Ok(value)
            }
            _ => self.visit_entry(header, visitor),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.root_pending {
            return Err(KspackError::InvalidTarget(
                "root value would be discarded".to_string(),
            ));
        }
        self.skip_entry()?;
        visitor.visit_unit()
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    forward_to_deserialize_any! {
        i128 u128 char unit unit_struct identifier
    }
}

/// Members of an object entry.
struct ObjectAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
    /// Record field table; `None` for maps and dynamic targets
    fields: Option<Arc<FieldList>>,
    /// Fields already handed to the visitor, by declaration index
    delivered: SmallVec<[bool; 16]>,
}

impl<'a, 'de> ObjectAccess<'a, 'de> {
    /// Skip members the visitor left unread.
    fn drain(&mut self) -> Result<()> {
        while self.remaining > 0 {
            self.remaining -= 1;
            self.de.peek_header()?.member_key()?;
            self.de.skip_entry()?;
        }
        Ok(())
    }
}

impl<'a, 'de> MapAccess<'de> for ObjectAccess<'a, 'de> {
    type Error = KspackError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        // A field fed by several members keeps the first one.
        while self.remaining > 0 {
            self.remaining -= 1;
            let key = self.de.peek_header()?.member_key()?;
            let Some(list) = &self.fields else {
                return seed.deserialize(KeyDeserializer::borrowed(key)).map(Some);
            };
            let Some(field) = list.resolve(key) else {
                return seed.deserialize(KeyDeserializer::borrowed(key)).map(Some);
            };
            if self.delivered[field.index] {
                tracing::trace!(
                    record = list.record(),
                    field = field.name,
                    offset = self.de.position(),
                    "skipping repeated member"
                );
                self.de.skip_entry()?;
                continue;
            }
            self.delivered[field.index] = true;
            return seed
                .deserialize(BorrowedStrDeserializer::new(field.name))
                .map(Some);
        }
        Ok(None)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

/// Elements of an array entry.
struct ArrayAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
}

impl<'a, 'de> ArrayAccess<'a, 'de> {
    /// Skip elements a fixed-size target had no room for.
    fn drain(&mut self) -> Result<()> {
        while self.remaining > 0 {
            self.remaining -= 1;
            self.de.skip_entry()?;
        }
        Ok(())
    }
}

impl<'a, 'de> SeqAccess<'de> for ArrayAccess<'a, 'de> {
    type Error = KspackError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

/// Binary payload presented as a sequence of `u8`.
struct BytesAccess<'de> {
    bytes: &'de [u8],
}

impl<'de> SeqAccess<'de> for BytesAccess<'de> {
    type Error = KspackError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.bytes.split_first() {
            Some((&byte, rest)) => {
                self.bytes = rest;
                let byte: de::value::U8Deserializer<KspackError> = byte.into_deserializer();
                seed.deserialize(byte).map(Some)
            }
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.bytes.len())
    }
}

/// Object with no members, used for null records and maps.
struct EmptyAccess;

impl<'de> MapAccess<'de> for EmptyAccess {
    type Error = KspackError;

    fn next_key_seed<K>(&mut self, _seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        Ok(None)
    }

    fn next_value_seed<V>(&mut self, _seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        Err(KspackError::Message("value requested from an empty object".to_string()))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(0)
    }
}

/// Single-member object `{variant: payload}` selecting an enum variant.
struct VariantEntry<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    name: &'static str,
}

impl<'a, 'de> EnumAccess<'de> for VariantEntry<'a, 'de> {
    type Error = KspackError;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self)>
    where
        V: DeserializeSeed<'de>,
    {
        let key = self.de.peek_header()?.member_key()?;
        let variant = seed.deserialize(KeyDeserializer::borrowed(key))?;
        Ok((variant, self))
    }
}

impl<'a, 'de> VariantAccess<'de> for VariantEntry<'a, 'de> {
    type Error = KspackError;

    fn unit_variant(self) -> Result<()> {
        self.de.skip_entry()
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(&mut *self.de, self.name, fields, visitor)
    }
}

fn report<T>(result: Result<T>, input: &[u8]) -> Result<T> {
    if let Err(ref err) = result {
        tracing::debug!(error = %err, input_len = input.len(), "kspack decode failed");
    }
    result
}

/// Decode a value of type `T` from `input`.
pub fn from_slice<'de, T>(input: &'de [u8]) -> Result<T>
where
    T: de::Deserialize<'de>,
{
    from_slice_with_options(input, &DecodeOptions::default())
}

/// Decode a value of type `T` from `input` with explicit options.
pub fn from_slice_with_options<'de, T>(input: &'de [u8], options: &DecodeOptions) -> Result<T>
where
    T: de::Deserialize<'de>,
{
    let result = Deserializer::with_options(input, options).and_then(|mut de| {
        let value = T::deserialize(&mut de)?;
        de.end()?;
        Ok(value)
    });
    report(result, input)
}

/// Decode `input` into an existing target.
///
/// Sequences reuse their storage and end up with exactly the decoded number
/// of elements. On failure the target may be partially updated.
pub fn unmarshal<'de, T>(input: &'de [u8], target: &mut T) -> Result<()>
where
    T: de::Deserialize<'de>,
{
    unmarshal_with_options(input, target, &DecodeOptions::default())
}

/// [`unmarshal`] with explicit options.
pub fn unmarshal_with_options<'de, T>(
    input: &'de [u8],
    target: &mut T,
    options: &DecodeOptions,
) -> Result<()>
where
    T: de::Deserialize<'de>,
{
    let result = Deserializer::with_options(input, options).and_then(|mut de| {
        T::deserialize_in_place(&mut de, target)?;
        de.end()
    });
    report(result, input)
}
