//! Encode engine
//!
//! Depth-first walk writing one entry per value. Containers are written with
//! placeholder lengths which are patched once their members are known.

use std::io::Write;

use serde::ser::{self, Impossible, Serialize, Serializer as _};

use kspack_format::constants::{MAX_SHORT_PAYLOAD_LEN, TERMINATOR};
use kspack_format::entry::{encode_prefix, write_key};
use kspack_format::primitive::{length_u32, patch_u32, put_u32};
use kspack_format::{KspackError, Limits, Result, Tag};

/// Encoder options
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Security limits (only the depth limit applies when encoding)
    pub limits: Limits,
    /// Initial output buffer capacity
    pub capacity: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            capacity: 256,
        }
    }
}

/// Key of the next entry written.
#[derive(Debug, Default)]
enum Key {
    /// Root entry or array element
    #[default]
    Unnamed,
    /// Record field name
    Field(&'static str),
    /// Map key converted to text
    Owned(String),
}

impl Key {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Key::Unnamed => &[],
            Key::Field(name) => name.as_bytes(),
            Key::Owned(name) => name.as_bytes(),
        }
    }
}

/// Open container whose lengths are patched on close.
#[derive(Debug)]
struct Frame {
    /// Offset of the container's tag byte
    start: usize,
    /// Offset of the member count
    count_pos: usize,
    count: usize,
}

/// Serializer writing entries into an owned buffer.
#[derive(Debug)]
pub struct Serializer {
    out: Vec<u8>,
    key: Key,
    depth: usize,
    limits: Limits,
}

impl Serializer {
    /// Create a serializer with default options.
    pub fn new() -> Self {
        Self::with_options(&EncodeOptions::default())
    }

    /// Create a serializer with explicit options.
    pub fn with_options(options: &EncodeOptions) -> Self {
        Self {
            out: Vec::with_capacity(options.capacity),
            key: Key::Unnamed,
            depth: 0,
            limits: options.limits.clone(),
        }
    }

    /// Finish and return the encoded bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }

    fn set_member_key(&mut self, key: Key) -> Result<()> {
        if key.as_bytes().is_empty() {
            return Err(KspackError::EmptyKey);
        }
        self.key = key;
        Ok(())
    }

    /// Write `tag | key length | [content length] | key` for the next entry.
    fn begin(&mut self, tag: Tag, content_len: usize) -> Result<()> {
        let key = std::mem::take(&mut self.key);
        let prefix = encode_prefix(tag, key.as_bytes(), content_len)?;
        self.out.extend_from_slice(&prefix);
        write_key(&mut self.out, key.as_bytes());
        Ok(())
    }

    fn scalar(&mut self, tag: Tag, value: &[u8]) -> Result<()> {
        self.begin(tag, 0)?;
        self.out.extend_from_slice(value);
        Ok(())
    }

    fn string(&mut self, text: &str) -> Result<()> {
        let tag = if text.len() <= MAX_SHORT_PAYLOAD_LEN {
            Tag::ShortString
        } else {
            Tag::String
        };
        self.begin(tag, text.len() + 1)?;
        self.out.extend_from_slice(text.as_bytes());
        self.out.push(TERMINATOR);
        Ok(())
    }

    fn binary(&mut self, bytes: &[u8]) -> Result<()> {
        let tag = if bytes.len() <= MAX_SHORT_PAYLOAD_LEN {
            Tag::ShortBinary
        } else {
            Tag::Binary
        };
        self.begin(tag, bytes.len())?;
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    fn null(&mut self) -> Result<()> {
        self.scalar(Tag::Null, &[0])
    }

    fn open(&mut self, tag: Tag) -> Result<Frame> {
        self.limits.check_depth(self.depth + 1)?;
        let start = self.out.len();
        self.begin(tag, 0)?;
        let count_pos = self.out.len();
        put_u32(&mut self.out, 0);
        self.depth += 1;
        Ok(Frame {
            start,
            count_pos,
            count: 0,
        })
    }

    fn close(&mut self, frame: Frame) -> Result<()> {
        let content_len = length_u32(self.out.len() - frame.count_pos)?;
        let count = length_u32(frame.count)?;
        // content length follows the tag and key-length bytes
        patch_u32(&mut self.out, frame.start + 2, content_len)?;
        patch_u32(&mut self.out, frame.count_pos, count)?;
        self.depth -= 1;
        Ok(())
    }

    /// Open the `{variant: ...}` wrapper of a data-carrying enum variant.
    fn open_variant(&mut self, variant: &'static str) -> Result<Frame> {
        let mut outer = self.open(Tag::Object)?;
        self.set_member_key(Key::Field(variant))?;
        outer.count = 1;
        Ok(outer)
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// In-progress container.
pub struct Compound<'a> {
    ser: &'a mut Serializer,
    frame: Frame,
    /// Wrapper object of an enum variant, closed after `frame`
    variant: Option<Frame>,
}

impl<'a> Compound<'a> {
    fn finish(self) -> Result<()> {
        self.ser.close(self.frame)?;
        if let Some(outer) = self.variant {
            self.ser.close(outer)?;
        }
        Ok(())
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.ser.key = Key::Unnamed;
        value.serialize(&mut *self.ser)?;
        self.frame.count += 1;
        Ok(())
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.ser.set_member_key(Key::Field(key))?;
        value.serialize(&mut *self.ser)?;
        self.frame.count += 1;
        Ok(())
    }
}

impl<'a> ser::Serializer for &'a mut Serializer {
    type Ok = ();
    type Error = KspackError;

    type SerializeSeq = Compound<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = Compound<'a>;
    type SerializeMap = Compound<'a>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = Compound<'a>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.scalar(Tag::Bool, &[v as u8])
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.scalar(Tag::Int8, &v.to_le_bytes())
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.scalar(Tag::Int16, &v.to_le_bytes())
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.scalar(Tag::Int32, &v.to_le_bytes())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.scalar(Tag::Int64, &v.to_le_bytes())
    }

    fn serialize_i128(self, _v: i128) -> Result<()> {
        Err(KspackError::UnsupportedType("i128".to_string()))
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.scalar(Tag::Uint8, &v.to_le_bytes())
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.scalar(Tag::Uint16, &v.to_le_bytes())
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.scalar(Tag::Uint32, &v.to_le_bytes())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.scalar(Tag::Uint64, &v.to_le_bytes())
    }

    fn serialize_u128(self, _v: u128) -> Result<()> {
        Err(KspackError::UnsupportedType("u128".to_string()))
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.scalar(Tag::Float, &v.to_le_bytes())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.scalar(Tag::Double, &v.to_le_bytes())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.string(v.encode_utf8(&mut buf))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.string(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.binary(v)
    }

    fn serialize_none(self) -> Result<()> {
        self.null()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.null()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.null()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.string(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        let outer = self.open_variant(variant)?;
        value.serialize(&mut *self)?;
        self.close(outer)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'a>> {
        let frame = self.open(Tag::Array)?;
        Ok(Compound {
            ser: self,
            frame,
            variant: None,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'a>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<Compound<'a>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>> {
        let outer = self.open_variant(variant)?;
        let frame = self.open(Tag::Array)?;
        Ok(Compound {
            ser: self,
            frame,
            variant: Some(outer),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'a>> {
        let frame = self.open(Tag::Object)?;
        Ok(Compound {
            ser: self,
            frame,
            variant: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Compound<'a>> {
        self.serialize_map(None)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a>> {
        let outer = self.open_variant(variant)?;
        let frame = self.open(Tag::Object)?;
        Ok(Compound {
            ser: self,
            frame,
            variant: Some(outer),
        })
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

impl<'a> ser::SerializeSeq for Compound<'a> {
    type Ok = ();
    type Error = KspackError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a> ser::SerializeTuple for Compound<'a> {
    type Ok = ();
    type Error = KspackError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a> ser::SerializeTupleStruct for Compound<'a> {
    type Ok = ();
    type Error = KspackError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a> ser::SerializeTupleVariant for Compound<'a> {
    type Ok = ();
    type Error = KspackError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a> ser::SerializeMap for Compound<'a> {
    type Ok = ();
    type Error = KspackError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        let text = key.serialize(MapKeySerializer)?;
        self.ser.set_member_key(Key::Owned(text))
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.ser)?;
        self.frame.count += 1;
        Ok(())
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a> ser::SerializeStruct for Compound<'a> {
    type Ok = ();
    type Error = KspackError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl<'a> ser::SerializeStructVariant for Compound<'a> {
    type Ok = ();
    type Error = KspackError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Converts map keys to their text form.
pub(crate) struct MapKeySerializer;

fn key_unsupported(kind: &str) -> KspackError {
    KspackError::UnsupportedType(format!("{} as map key", kind))
}

macro_rules! display_key {
    ($($method:ident: $ty:ty,)*) => {
        $(
            fn $method(self, v: $ty) -> Result<String> {
                Ok(v.to_string())
            }
        )*
    };
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = KspackError;

    type SerializeSeq = Impossible<String, KspackError>;
    type SerializeTuple = Impossible<String, KspackError>;
    type SerializeTupleStruct = Impossible<String, KspackError>;
    type SerializeTupleVariant = Impossible<String, KspackError>;
    type SerializeMap = Impossible<String, KspackError>;
    type SerializeStruct = Impossible<String, KspackError>;
    type SerializeStructVariant = Impossible<String, KspackError>;

    display_key! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_char: char,
        serialize_str: &str,
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(key_unsupported("f32"))
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(key_unsupported("f64"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(key_unsupported("bytes"))
    }

    fn serialize_none(self) -> Result<String> {
        Err(key_unsupported("none"))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Err(key_unsupported("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<String> {
        Err(key_unsupported(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String> {
        Err(key_unsupported(name))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_unsupported("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_unsupported("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_unsupported(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_unsupported(name))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_unsupported("map"))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_unsupported(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_unsupported(name))
    }
}

/// Encode `value` into a new buffer.
pub fn marshal<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    marshal_with_options(value, &EncodeOptions::default())
}

/// Encode `value` with explicit options.
pub fn marshal_with_options<T>(value: &T, options: &EncodeOptions) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut ser = Serializer::with_options(options);
    match value.serialize(&mut ser) {
        Ok(()) => Ok(ser.into_inner()),
        Err(err) => {
            tracing::debug!(error = %err, written = ser.out.len(), "kspack encode failed");
            Err(err)
        }
    }
}

/// Encode `value` and write the bytes to `writer`.
pub fn to_writer<W, T>(mut writer: W, value: &T) -> Result<()>
where
    W: Write,
    T: ?Sized + Serialize,
{
    let bytes = marshal(value)?;
    writer.write_all(&bytes)?;
    Ok(())
}
