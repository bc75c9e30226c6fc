//! Codec registry
//!
//! A process-wide table mapping codec names to constructors so several wire
//! formats can coexist behind one interface. Registering a name twice, an
//! empty name or a missing constructor is a programming mistake and panics;
//! [`CodecRegistry::try_register`] reports the same conditions as
//! [`KspackError::Registration`] for callers that want to recover.
//!
//! Codecs see the caller's value through `erased_serde`, so a typed value
//! reaches the wire with its own integer widths and float precision.
//!
//! # Example
//!
//! ```rust
//! use kspack::erased_serde;
//! use kspack::registry::{Codec, CodecRegistry, DecodeVisitor};
//! use kspack::{KspackError, Result};
//! use serde::de::Error as _;
//!
//! /// KSPACK behind a two-byte magic prefix.
//! struct Tagged;
//!
//! impl Codec for Tagged {
//!     fn name(&self) -> &str {
//!         "tagged"
//!     }
//!
//!     fn marshal(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
//!         let mut out = b"KS".to_vec();
//!         out.extend(kspack::marshal(value)?);
//!         Ok(out)
//!     }
//!
//!     fn unmarshal_with(&self, input: &[u8], visit: &mut DecodeVisitor<'_>) -> Result<()> {
//!         let body = input.strip_prefix(b"KS").ok_or(KspackError::UnexpectedEnd)?;
//!         let mut de = kspack::Deserializer::from_slice(body)?;
//!         visit(&mut <dyn erased_serde::Deserializer>::erase(&mut de))
//!             .map_err(KspackError::custom)?;
//!         de.end()
//!     }
//! }
//!
//! fn tagged() -> Box<dyn Codec> {
//!     Box::new(Tagged)
//! }
//!
//! let registry = CodecRegistry::new();
//! registry.register("tagged", Some(tagged));
//!
//! let codec = registry.instance("tagged").unwrap();
//! let bytes = codec.marshal(&vec![1u16, 2, 3]).unwrap();
//! assert_eq!(&bytes[..2], b"KS");
//! assert_eq!(codec.unmarshal_into::<Vec<u16>>(&bytes).unwrap(), vec![1, 2, 3]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

use serde::de::DeserializeOwned;

use kspack_codec::Value;
use kspack_format::{KspackError, Result};

use crate::codecs;

/// Receiver a codec hands its deserializer to during
/// [`Codec::unmarshal_with`].
pub type DecodeVisitor<'v> =
    dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> VisitResult + 'v;

/// Outcome of a [`DecodeVisitor`] call.
pub type VisitResult = std::result::Result<(), erased_serde::Error>;

/// A wire format that can carry any `serde` value.
pub trait Codec: Send + Sync {
    /// Name the codec is registered under
    fn name(&self) -> &str;

    /// Encode a value
    fn marshal(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>>;

    /// Decode `input` by handing this codec's deserializer to `visit`.
    ///
    /// Implementations call `visit` once and then check that the whole
    /// input was consumed.
    fn unmarshal_with(&self, input: &[u8], visit: &mut DecodeVisitor<'_>) -> Result<()>;
}

impl<'c> dyn Codec + 'c {
    /// Decode a buffer through this codec into `T`.
    pub fn unmarshal_into<T>(&self, input: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut out = None;
        self.unmarshal_with(input, &mut |de: &mut dyn erased_serde::Deserializer<'_>| {
            out = Some(erased_serde::deserialize::<T>(de)?);
            Ok(())
        })?;
        out.ok_or_else(|| {
            KspackError::Message(format!("codec {} produced no value", self.name()))
        })
    }

    /// Decode a buffer through this codec into a dynamic tree.
    pub fn unmarshal(&self, input: &[u8]) -> Result<Value> {
        self.unmarshal_into(input)
    }
}

impl<'c> fmt::Debug for dyn Codec + 'c {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").field("name", &self.name()).finish()
    }
}

/// Builds a fresh codec instance.
pub type CodecConstructor = fn() -> Box<dyn Codec>;

/// Table of codec constructors keyed by name.
///
/// Entries are never removed; reads run concurrently and registrations are
/// serialized by the lock.
#[derive(Debug, Default)]
pub struct CodecRegistry {
    constructors: RwLock<HashMap<String, CodecConstructor>>,
}

impl CodecRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in `kspack` and `json` codecs.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(codecs::KSPACK, Some(codecs::kspack_constructor));
        registry.register(codecs::JSON, Some(codecs::json_constructor));
        registry
    }

    /// Register a codec.
    ///
    /// # Panics
    ///
    /// Panics if `constructor` is `None`, `name` is empty or `name` is
    /// already registered.
    pub fn register(&self, name: &str, constructor: Option<CodecConstructor>) {
        if let Err(err) = self.try_register(name, constructor) {
            panic!("{}", err);
        }
    }

    /// Register a codec, reporting misuse as an error.
    pub fn try_register(&self, name: &str, constructor: Option<CodecConstructor>) -> Result<()> {
        let Some(constructor) = constructor else {
            return Err(KspackError::Registration(format!(
                "constructor for codec {:?} is missing",
                name
            )));
        };
        if name.is_empty() {
            return Err(KspackError::Registration(
                "codec name is empty".to_string(),
            ));
        }

        let mut constructors = self
            .constructors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if constructors.contains_key(name) {
            return Err(KspackError::Registration(format!(
                "codec {:?} is already registered",
                name
            )));
        }
        constructors.insert(name.to_string(), constructor);
        tracing::debug!(codec = name, "registered codec");
        Ok(())
    }

    /// True when `name` has a constructor.
    pub fn has_registered(&self, name: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Construct the codec registered under `name`, if any.
    pub fn instance(&self, name: &str) -> Option<Box<dyn Codec>> {
        let constructor = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied();
        if constructor.is_none() {
            tracing::trace!(codec = name, "codec not registered");
        }
        constructor.map(|build| build())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Get the global singleton instance, with the built-in codecs registered
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<CodecRegistry> = OnceLock::new();
        INSTANCE.get_or_init(CodecRegistry::with_builtin)
    }
}

/// Register a codec in the global registry.
///
/// # Panics
///
/// Same conditions as [`CodecRegistry::register`].
pub fn register(name: &str, constructor: Option<CodecConstructor>) {
    CodecRegistry::global().register(name, constructor);
}

/// True when the global registry knows `name`.
pub fn has_registered(name: &str) -> bool {
    CodecRegistry::global().has_registered(name)
}

/// Construct a codec from the global registry.
pub fn plugin_instance(name: &str) -> Option<Box<dyn Codec>> {
    CodecRegistry::global().instance(name)
}
