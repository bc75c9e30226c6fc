//! Built-in codecs

use serde::de::Error as _;

use kspack_codec::{marshal_with_options, validate, DecodeOptions, Deserializer, EncodeOptions};
use kspack_format::{KspackError, Limits, Result};

use crate::registry::{Codec, DecodeVisitor};

/// Registry name of the KSPACK codec
pub const KSPACK: &str = "kspack";

/// Registry name of the JSON codec
pub const JSON: &str = "json";

/// The KSPACK tagged binary format.
#[derive(Debug, Clone, Default)]
pub struct KspackCodec {
    encode: EncodeOptions,
    decode: DecodeOptions,
}

impl KspackCodec {
    /// Codec with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec applying `limits` in both directions
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            encode: EncodeOptions {
                limits: limits.clone(),
                ..EncodeOptions::default()
            },
            decode: DecodeOptions { limits },
        }
    }
}

impl Codec for KspackCodec {
    fn name(&self) -> &str {
        KSPACK
    }

    fn marshal(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        marshal_with_options(value, &self.encode)
    }

    fn unmarshal_with(&self, input: &[u8], visit: &mut DecodeVisitor<'_>) -> Result<()> {
        let mut de = Deserializer::with_options(input, &self.decode)?;
        match visit(&mut <dyn erased_serde::Deserializer>::erase(&mut de)) {
            Ok(()) => de.end(),
            // The erased error only keeps the message; a structural fault
            // is reported with its own kind.
            Err(err) => Err(match validate(input, &self.decode.limits) {
                Err(structural) => structural,
                Ok(()) => KspackError::custom(err),
            }),
        }
    }
}

/// JSON text through `serde_json`.
///
/// Byte buffers become arrays of numbers and non-finite floats become `null`,
/// so not every tree survives a round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Compact output
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        JSON
    }

    fn marshal(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    fn unmarshal_with(&self, input: &[u8], visit: &mut DecodeVisitor<'_>) -> Result<()> {
        let mut json = serde_json::Deserializer::from_slice(input);
        visit(&mut <dyn erased_serde::Deserializer>::erase(&mut json))
            .map_err(KspackError::custom)?;
        json.end()?;
        Ok(())
    }
}

pub(crate) fn kspack_constructor() -> Box<dyn Codec> {
    Box::new(KspackCodec::new())
}

pub(crate) fn json_constructor() -> Box<dyn Codec> {
    Box::new(JsonCodec::new())
}
