//! KSPACK Format - Core primitives for the KSPACK wire format
//!
//! This crate holds the layout contract of the format with no serialization
//! framework logic. It includes:
//!
//! - Tag bytes and layout constants
//! - Fixed-width little-endian readers and writers
//! - Entry header parsing and encoding
//! - Case-insensitive field name matching
//! - Error types
//! - Security limits

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod entry;
pub mod error;
pub mod fold;
pub mod limits;
pub mod primitive;
pub mod types;

// Re-export commonly used types
pub use entry::EntryHeader;
pub use error::{KspackError, Result};
pub use fold::{names_equal_fold, FoldStrategy};
pub use limits::Limits;
pub use types::{LengthField, Tag};
