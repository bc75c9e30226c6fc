//! KSPACK Codec - Encode and decode engines
//!
//! This crate maps Rust values to and from the KSPACK wire format through
//! `serde`:
//!
//! - Encode engine ([`marshal`], [`to_writer`])
//! - Decode engine ([`from_slice`], [`unmarshal`])
//! - Dynamic value tree ([`Value`], [`decode_value`], [`encode_value`])
//! - Per-record field tables with case-insensitive member resolution
//! - Structural validation and entry walking

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod de;
pub mod fields;
mod key;
pub mod ser;
pub mod value;
pub mod walk;

// Re-export commonly used types
pub use kspack_format::{KspackError, Limits, Result, Tag};

// Re-export our own types
pub use de::{
    from_slice, from_slice_with_options, unmarshal, unmarshal_with_options, DecodeOptions,
    Deserializer,
};
pub use fields::{FieldCache, FieldEntry, FieldList};
pub use ser::{marshal, marshal_with_options, to_writer, EncodeOptions, Serializer};
pub use value::{decode_value, encode_value, from_value, to_value, Map, Value};
pub use walk::{validate, walk, EntryInfo};
