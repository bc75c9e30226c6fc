//! Wire tag enumeration

use crate::constants::*;
use crate::error::KspackError;

/// Tags understood by the decoder.
///
/// The discriminant is the byte written on the wire. Reserved categories
/// (date, fixed-item, deleted-item) have no variant and fail in [`Tag::from_u8`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Keyed container
    Object = TAG_OBJECT,
    /// Positional container
    Array = TAG_ARRAY,
    /// String with a 4-byte content length
    String = TAG_STRING,
    /// String with a 1-byte content length
    ShortString = TAG_SHORT_STRING,
    /// Raw bytes with a 4-byte content length
    Binary = TAG_BINARY,
    /// Raw bytes with a 1-byte content length
    ShortBinary = TAG_SHORT_BINARY,
    /// i8
    Int8 = TAG_INT8,
    /// i16
    Int16 = TAG_INT16,
    /// i32
    Int32 = TAG_INT32,
    /// i64
    Int64 = TAG_INT64,
    /// u8
    Uint8 = TAG_UINT8,
    /// u16
    Uint16 = TAG_UINT16,
    /// u32
    Uint32 = TAG_UINT32,
    /// u64
    Uint64 = TAG_UINT64,
    /// Boolean
    Bool = TAG_BOOL,
    /// f32
    Float = TAG_FLOAT,
    /// f64
    Double = TAG_DOUBLE,
    /// Null placeholder
    Null = TAG_NULL,
}

/// Width of the content-length field that follows the key-length byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthField {
    /// Fixed-width scalar, the value width is implied by the tag
    None,
    /// One byte (short items)
    Short,
    /// Four bytes (long items and containers)
    Long,
}

impl LengthField {
    /// Number of bytes the field occupies in the entry header.
    pub fn size(self) -> usize {
        match self {
            LengthField::None => 0,
            LengthField::Short => 1,
            LengthField::Long => 4,
        }
    }
}

impl Tag {
    /// Convert from the wire byte
    pub fn from_u8(val: u8) -> Result<Self, KspackError> {
        match val {
            TAG_OBJECT => Ok(Tag::Object),
            TAG_ARRAY => Ok(Tag::Array),
            TAG_STRING => Ok(Tag::String),
            TAG_SHORT_STRING => Ok(Tag::ShortString),
            TAG_BINARY => Ok(Tag::Binary),
            TAG_SHORT_BINARY => Ok(Tag::ShortBinary),
            TAG_INT8 => Ok(Tag::Int8),
            TAG_INT16 => Ok(Tag::Int16),
            TAG_INT32 => Ok(Tag::Int32),
            TAG_INT64 => Ok(Tag::Int64),
            TAG_UINT8 => Ok(Tag::Uint8),
            TAG_UINT16 => Ok(Tag::Uint16),
            TAG_UINT32 => Ok(Tag::Uint32),
            TAG_UINT64 => Ok(Tag::Uint64),
            TAG_BOOL => Ok(Tag::Bool),
            TAG_FLOAT => Ok(Tag::Float),
            TAG_DOUBLE => Ok(Tag::Double),
            TAG_NULL => Ok(Tag::Null),
            // TAG_DATE, TAG_DELETED_ITEM, TAG_FIXED_ITEM and garbage
            other => Err(KspackError::UnknownTag(other)),
        }
    }

    /// Content-length field carried by entries with this tag.
    pub fn length_field(self) -> LengthField {
        match self {
            Tag::Object | Tag::Array | Tag::String | Tag::Binary => LengthField::Long,
            Tag::ShortString | Tag::ShortBinary => LengthField::Short,
            _ => LengthField::None,
        }
    }

    /// Payload width of fixed-width tags; `None` for variable-length ones.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Tag::Int8 | Tag::Uint8 | Tag::Bool | Tag::Null => Some(1),
            Tag::Int16 | Tag::Uint16 => Some(2),
            Tag::Int32 | Tag::Uint32 | Tag::Float => Some(4),
            Tag::Int64 | Tag::Uint64 | Tag::Double => Some(8),
            _ => None,
        }
    }

    /// Object or array.
    pub fn is_container(self) -> bool {
        matches!(self, Tag::Object | Tag::Array)
    }

    /// Long or short string.
    pub fn is_string(self) -> bool {
        matches!(self, Tag::String | Tag::ShortString)
    }

    /// Long or short binary.
    pub fn is_binary(self) -> bool {
        matches!(self, Tag::Binary | Tag::ShortBinary)
    }

    /// Short lowercase name used in diagnostics and dumps.
    pub fn name(self) -> &'static str {
        match self {
            Tag::Object => "object",
            Tag::Array => "array",
            Tag::String => "string",
            Tag::ShortString => "short-string",
            Tag::Binary => "binary",
            Tag::ShortBinary => "short-binary",
            Tag::Int8 => "int8",
            Tag::Int16 => "int16",
            Tag::Int32 => "int32",
            Tag::Int64 => "int64",
            Tag::Uint8 => "uint8",
            Tag::Uint16 => "uint16",
            Tag::Uint32 => "uint32",
            Tag::Uint64 => "uint64",
            Tag::Bool => "bool",
            Tag::Float => "float",
            Tag::Double => "double",
            Tag::Null => "null",
        }
    }
}
