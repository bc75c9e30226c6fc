//! Error types for KSPACK

use std::fmt::Display;

use thiserror::Error;

/// KSPACK error types
#[derive(Debug, Error)]
pub enum KspackError {
    /// The root decode target cannot receive a value.
    #[error("Invalid unmarshal target: {0}")]
    InvalidTarget(String),
    /// A read would run past the buffer, or bytes remain after the root entry.
    #[error("Unexpected end")]
    UnexpectedEnd,
    /// An object member carries a key with no logical bytes.
    #[error("Empty key")]
    EmptyKey,
    /// A key is longer than the key-length byte can describe.
    #[error("Key too long: {0} bytes (max 254)")]
    KeyTooLong(usize),
    /// The encoder met a value kind with no wire representation.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    /// The decoder met a tag byte it cannot measure.
    #[error("Unknown tag: 0x{0:02x}")]
    UnknownTag(u8),
    /// A content-length field is impossible for its tag.
    #[error("Invalid content length {len} for {tag} entry")]
    InvalidLength {
        /// Tag name of the offending entry
        tag: &'static str,
        /// Length read from the stream
        len: usize,
    },
    /// Text bytes handed to a string target are not UTF-8.
    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
    /// A length does not fit in its wire field.
    #[error("Length overflow: {0} bytes")]
    LengthOverflow(usize),
    /// Nesting is deeper than the configured limit.
    #[error("Depth limit exceeded: {0}")]
    DepthLimitExceeded(usize),
    /// A configured limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    /// Codec registry misuse (duplicate name, missing constructor).
    #[error("Registration error: {0}")]
    Registration(String),
    /// I/O operation failed while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Error reported by a `Serialize` or `Deserialize` implementation.
    #[error("{0}")]
    Message(String),
}

impl serde::ser::Error for KspackError {
    fn custom<T: Display>(msg: T) -> Self {
        KspackError::Message(msg.to_string())
    }
}

impl serde::de::Error for KspackError {
    fn custom<T: Display>(msg: T) -> Self {
        KspackError::Message(msg.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, KspackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(KspackError::UnknownTag(0x58).to_string(), "Unknown tag: 0x58");
        assert_eq!(KspackError::UnexpectedEnd.to_string(), "Unexpected end");
        assert_eq!(
            KspackError::InvalidLength { tag: "string", len: 0 }.to_string(),
            "Invalid content length 0 for string entry"
        );
    }

    #[test]
    fn test_serde_custom() {
        let err = <KspackError as serde::de::Error>::custom("missing field `id`");
        assert!(matches!(err, KspackError::Message(ref m) if m == "missing field `id`"));
    }
}
