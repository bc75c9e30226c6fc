//! KSPACK - Codec registry and high-level APIs
//!
//! This crate is the front door to the KSPACK format:
//!
//! - Typed encode/decode ([`marshal`], [`unmarshal`], [`from_slice`])
//! - Dynamic trees ([`Value`], [`decode_value`], [`encode_value`])
//! - A process-wide codec registry ([`register`], [`has_registered`],
//!   [`plugin_instance`]) with the `kspack` and `json` codecs built in
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Item {
//!     name: String,
//!     n: i32,
//! }
//!
//! let item = Item { name: "a".to_string(), n: 100 };
//! let bytes = kspack::marshal(&item).unwrap();
//! let back: Item = kspack::from_slice(&bytes).unwrap();
//! assert_eq!(back, item);
//!
//! let codec = kspack::plugin_instance(kspack::codecs::KSPACK).unwrap();
//! let through_registry = codec.marshal(&item).unwrap();
//! assert_eq!(through_registry, bytes);
//! assert_eq!(codec.unmarshal_into::<Item>(&through_registry).unwrap(), item);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codecs;
pub mod registry;

pub use erased_serde;

// Re-export commonly used types
pub use codecs::{JsonCodec, KspackCodec};
pub use kspack_codec::{
    decode_value, encode_value, from_slice, from_slice_with_options, from_value, marshal,
    marshal_with_options, to_value, to_writer, unmarshal, unmarshal_with_options, validate, walk,
    DecodeOptions, Deserializer, EncodeOptions, EntryInfo, Map, Serializer, Value,
};
pub use kspack_format::{KspackError, Limits, Result, Tag};
pub use registry::{
    has_registered, plugin_instance, register, Codec, CodecConstructor, CodecRegistry,
    DecodeVisitor,
};
