//! Entry header layout
//!
//! ```text
//! tag(1) | key length(1) | [content length(1 or 4)] | key bytes | 0x00 | value bytes
//! ```
//!
//! The key length counts the trailing terminator. Unnamed entries (the root
//! and array elements) are written with a key length of zero.

use smallvec::SmallVec;

use crate::constants::{KEY_MAX_LEN, TERMINATOR};
use crate::error::{KspackError, Result};
use crate::primitive::{read_slice, read_u32, read_u8};
use crate::types::{LengthField, Tag};

/// Parsed entry prefix, borrowing the key from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader<'a> {
    /// Entry tag
    pub tag: Tag,
    /// Raw key-length byte (terminator included)
    pub key_len: u8,
    /// Logical key bytes, terminator stripped; empty for unnamed entries
    pub key: &'a [u8],
    /// Content length for variable-length tags and containers
    pub content_len: Option<usize>,
    /// Bytes from the tag up to the first value byte
    pub header_len: usize,
}

impl<'a> EntryHeader<'a> {
    /// Parse the header of the entry starting at `pos`.
    pub fn parse(bytes: &'a [u8], pos: usize) -> Result<Self> {
        let tag = Tag::from_u8(read_u8(bytes, pos)?)?;
        let key_len = read_u8(bytes, pos + 1)?;
        let mut cursor = pos + 2;

        let content_len = match tag.length_field() {
            LengthField::None => None,
            LengthField::Short => Some(read_u8(bytes, cursor)? as usize),
            LengthField::Long => Some(read_u32(bytes, cursor)? as usize),
        };
        cursor += tag.length_field().size();

        let raw_key = read_slice(bytes, cursor, key_len as usize)?;
        cursor += key_len as usize;
        let key = match raw_key.split_last() {
            Some((_terminator, logical)) => logical,
            None => raw_key,
        };

        Ok(Self {
            tag,
            key_len,
            key,
            content_len,
            header_len: cursor - pos,
        })
    }

    /// Key of an object member; a key without logical bytes is rejected.
    pub fn member_key(&self) -> Result<&'a [u8]> {
        if self.key_len <= 1 {
            return Err(KspackError::EmptyKey);
        }
        Ok(self.key)
    }

    /// Logical payload length of a non-container entry.
    ///
    /// Strings drop their terminator, so a zero content length is malformed.
    pub fn payload_len(&self) -> Result<usize> {
        if let Some(width) = self.tag.fixed_width() {
            return Ok(width);
        }
        let len = self.content_len.unwrap_or(0);
        if self.tag.is_string() {
            if len == 0 {
                return Err(KspackError::InvalidLength {
                    tag: self.tag.name(),
                    len,
                });
            }
            return Ok(len - 1);
        }
        Ok(len)
    }

    /// Bytes a non-container entry occupies after its header, terminator
    /// included.
    pub fn value_len(&self) -> Result<usize> {
        let logical = self.payload_len()?;
        if self.tag.is_string() {
            Ok(logical + 1)
        } else {
            Ok(logical)
        }
    }
}

/// Encode the fixed prefix `tag | key length | [content length]`.
///
/// `key` is the logical key; an empty key produces an unnamed entry. The key
/// bytes themselves are written by [`write_key`].
pub fn encode_prefix(tag: Tag, key: &[u8], content_len: usize) -> Result<SmallVec<[u8; 6]>> {
    let mut prefix = SmallVec::new();
    prefix.push(tag as u8);
    prefix.push(key_len_byte(key)?);
    match tag.length_field() {
        LengthField::None => {}
        LengthField::Short => {
            let len = u8::try_from(content_len)
                .map_err(|_| KspackError::LengthOverflow(content_len))?;
            prefix.push(len);
        }
        LengthField::Long => {
            let len = u32::try_from(content_len)
                .map_err(|_| KspackError::LengthOverflow(content_len))?;
            prefix.extend_from_slice(&len.to_le_bytes());
        }
    }
    Ok(prefix)
}

/// Append the key bytes and terminator of a named entry.
pub fn write_key(out: &mut Vec<u8>, key: &[u8]) {
    if !key.is_empty() {
        out.extend_from_slice(key);
        out.push(TERMINATOR);
    }
}

fn key_len_byte(key: &[u8]) -> Result<u8> {
    if key.is_empty() {
        return Ok(0);
    }
    if key.len() > KEY_MAX_LEN {
        return Err(KspackError::KeyTooLong(key.len()));
    }
    Ok((key.len() + 1) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_string_header() {
        // "Name": "a"
        let bytes = [0xD0, 0x05, 0x02, b'N', b'a', b'm', b'e', 0x00, b'a', 0x00];
        let header = EntryHeader::parse(&bytes, 0).unwrap();
        assert_eq!(header.tag, Tag::ShortString);
        assert_eq!(header.key, b"Name");
        assert_eq!(header.content_len, Some(2));
        assert_eq!(header.header_len, 8);
        assert_eq!(header.payload_len().unwrap(), 1);
    }

    #[test]
    fn test_parse_unnamed_scalar() {
        let bytes = [0x14, 0x00, 0x64, 0x00, 0x00, 0x00];
        let header = EntryHeader::parse(&bytes, 0).unwrap();
        assert_eq!(header.tag, Tag::Int32);
        assert!(header.key.is_empty());
        assert_eq!(header.header_len, 2);
        assert_eq!(header.payload_len().unwrap(), 4);
        assert!(matches!(header.member_key(), Err(KspackError::EmptyKey)));
    }

    #[test]
    fn test_terminator_only_key_is_empty() {
        let bytes = [0x61, 0x01, 0x00, 0x00];
        let header = EntryHeader::parse(&bytes, 0).unwrap();
        assert!(matches!(header.member_key(), Err(KspackError::EmptyKey)));
    }

    #[test]
    fn test_parse_truncated_key() {
        let bytes = [0x31, 0x05, b'a'];
        assert!(matches!(
            EntryHeader::parse(&bytes, 0),
            Err(KspackError::UnexpectedEnd)
        ));
    }

    #[test]
    fn test_zero_length_string_is_invalid() {
        let bytes = [0xD0, 0x00, 0x00];
        let header = EntryHeader::parse(&bytes, 0).unwrap();
        assert!(matches!(
            header.payload_len(),
            Err(KspackError::InvalidLength { len: 0, .. })
        ));
    }

    #[test]
    fn test_encode_prefix() {
        let prefix = encode_prefix(Tag::ShortString, b"Name", 2).unwrap();
        assert_eq!(prefix.as_slice(), &[0xD0, 0x05, 0x02]);

        let prefix = encode_prefix(Tag::Object, b"", 4).unwrap();
        assert_eq!(prefix.as_slice(), &[0x10, 0x00, 0x04, 0x00, 0x00, 0x00]);

        let prefix = encode_prefix(Tag::Int32, b"N", 0).unwrap();
        assert_eq!(prefix.as_slice(), &[0x14, 0x02]);
    }

    #[test]
    fn test_encode_prefix_rejects_long_key() {
        let key = vec![b'k'; KEY_MAX_LEN + 1];
        assert!(matches!(
            encode_prefix(Tag::Null, &key, 0),
            Err(KspackError::KeyTooLong(255))
        ));
        let key = vec![b'k'; KEY_MAX_LEN];
        assert_eq!(encode_prefix(Tag::Null, &key, 0).unwrap()[1], 255);
    }

    #[test]
    fn test_encode_prefix_short_overflow() {
        assert!(matches!(
            encode_prefix(Tag::ShortBinary, b"", 256),
            Err(KspackError::LengthOverflow(256))
        ));
    }
}
