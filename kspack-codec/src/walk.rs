//! Structural walk over an encoded buffer
//!
//! Measures entries without a decode target. The decoder uses it to skip
//! members it has no slot for; [`validate`] and [`walk`] expose it for
//! checking and inspecting buffers.

use kspack_format::constants::CONTAINER_COUNT_LEN;
use kspack_format::primitive::{
    read_bool, read_f32, read_f64, read_i16, read_i32, read_i64, read_i8, read_slice, read_u16,
    read_u32, read_u64, read_u8,
};
use kspack_format::{EntryHeader, KspackError, Limits, Result, Tag};

/// One entry reported by [`walk`].
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo {
    /// Number of enclosing containers
    pub depth: usize,
    /// Offset of the tag byte
    pub offset: usize,
    /// Entry tag
    pub tag: Tag,
    /// Key text (lossy UTF-8); empty for unnamed entries
    pub key: String,
    /// Content-length field, when the tag carries one
    pub content_len: Option<usize>,
    /// Member or element count for containers
    pub count: Option<usize>,
    /// Rendered scalar value for non-container entries
    pub value: Option<String>,
}

/// Offset just past the entry starting at `pos`.
///
/// `depth` is the number of containers already open around the entry.
/// Object members must carry a non-empty key.
pub fn entry_end(input: &[u8], pos: usize, depth: usize, limits: &Limits) -> Result<usize> {
    walk_entry(input, pos, depth, limits, &mut |_| {})
}

/// Check that `input` holds exactly one well-formed root entry.
pub fn validate(input: &[u8], limits: &Limits) -> Result<()> {
    limits.check_input_len(input.len())?;
    let end = entry_end(input, 0, 0, limits)?;
    if end != input.len() {
        return Err(KspackError::UnexpectedEnd);
    }
    Ok(())
}

/// Visit every entry of `input` depth-first, in stream order.
pub fn walk<F>(input: &[u8], limits: &Limits, mut visit: F) -> Result<()>
where
    F: FnMut(&EntryInfo),
{
    limits.check_input_len(input.len())?;
    let end = walk_entry(input, 0, 0, limits, &mut visit)?;
    if end != input.len() {
        return Err(KspackError::UnexpectedEnd);
    }
    Ok(())
}

fn walk_entry(
    input: &[u8],
    pos: usize,
    depth: usize,
    limits: &Limits,
    visit: &mut dyn FnMut(&EntryInfo),
) -> Result<usize> {
    let header = EntryHeader::parse(input, pos)?;
    let mut cursor = pos + header.header_len;
    let mut info = EntryInfo {
        depth,
        offset: pos,
        tag: header.tag,
        key: String::from_utf8_lossy(header.key).into_owned(),
        content_len: header.content_len,
        count: None,
        value: None,
    };

    if header.tag.is_container() {
        limits.check_depth(depth + 1)?;
        let count = read_u32(input, cursor)? as usize;
        cursor += CONTAINER_COUNT_LEN;
        info.count = Some(count);
        visit(&info);

        for _ in 0..count {
            if header.tag == Tag::Object {
                EntryHeader::parse(input, cursor)?.member_key()?;
            }
            cursor = walk_entry(input, cursor, depth + 1, limits, visit)?;
        }
        return Ok(cursor);
    }

    let len = header.value_len()?;
    let payload = read_slice(input, cursor, len)?;
    info.value = Some(render_scalar(header.tag, payload)?);
    visit(&info);
    cursor += len;
    Ok(cursor)
}

fn render_scalar(tag: Tag, payload: &[u8]) -> Result<String> {
    let text = match tag {
        Tag::Int8 => read_i8(payload, 0)?.to_string(),
        Tag::Int16 => read_i16(payload, 0)?.to_string(),
        Tag::Int32 => read_i32(payload, 0)?.to_string(),
        Tag::Int64 => read_i64(payload, 0)?.to_string(),
        Tag::Uint8 => read_u8(payload, 0)?.to_string(),
        Tag::Uint16 => read_u16(payload, 0)?.to_string(),
        Tag::Uint32 => read_u32(payload, 0)?.to_string(),
        Tag::Uint64 => read_u64(payload, 0)?.to_string(),
        Tag::Bool => read_bool(payload, 0)?.to_string(),
        Tag::Float => read_f32(payload, 0)?.to_string(),
        Tag::Double => read_f64(payload, 0)?.to_string(),
        Tag::Null => "null".to_string(),
        Tag::String | Tag::ShortString => {
            let logical = &payload[..payload.len().saturating_sub(1)];
            format!("{:?}", String::from_utf8_lossy(logical))
        }
        Tag::Binary | Tag::ShortBinary => payload
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>(),
        Tag::Object | Tag::Array => String::new(),
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    // {"N": i32 100} with an unnamed root
    const SAMPLE: &[u8] = &[
        0x10, 0x00, 0x0C, 0x00, 0x00, 0x00, // object, content length 12
        0x01, 0x00, 0x00, 0x00, // one member
        0x14, 0x02, b'N', 0x00, 0x64, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_validate_sample() {
        validate(SAMPLE, &Limits::default()).unwrap();
    }

    #[test]
    fn test_validate_trailing_byte() {
        let mut bytes = SAMPLE.to_vec();
        bytes.push(0);
        assert!(matches!(
            validate(&bytes, &Limits::default()),
            Err(KspackError::UnexpectedEnd)
        ));
    }

    #[test]
    fn test_validate_truncated() {
        let bytes = &SAMPLE[..SAMPLE.len() - 1];
        assert!(matches!(
            validate(bytes, &Limits::default()),
            Err(KspackError::UnexpectedEnd)
        ));
    }

    #[test]
    fn test_validate_empty_member_key() {
        let bytes = [
            0x10, 0x00, 0x07, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x61, 0x00, 0x00,
        ];
        assert!(matches!(
            validate(&bytes, &Limits::default()),
            Err(KspackError::EmptyKey)
        ));
    }

    #[test]
    fn test_walk_reports_entries() {
        let mut seen = Vec::new();
        walk(SAMPLE, &Limits::default(), |info| seen.push(info.clone())).unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].tag, Tag::Object);
        assert_eq!(seen[0].count, Some(1));
        assert_eq!(seen[1].depth, 1);
        assert_eq!(seen[1].key, "N");
        assert_eq!(seen[1].value.as_deref(), Some("100"));
    }

    #[test]
    fn test_walk_renders_bool() {
        // any non-zero byte is true
        let mut seen = Vec::new();
        walk(&[0x31, 0x00, 0x02], &Limits::default(), |info| {
            seen.push(info.value.clone())
        })
        .unwrap();
        assert_eq!(seen, vec![Some("true".to_string())]);
    }

    #[test]
    fn test_depth_limit() {
        // three nested empty-key arrays: [[[]]]
        let mut bytes = Vec::new();
        for remaining in (0..3).rev() {
            bytes.extend_from_slice(&[0x20, 0x00, 0x00, 0x00, 0x00, 0x00]);
            let count: u32 = if remaining > 0 { 1 } else { 0 };
            bytes.extend_from_slice(&count.to_le_bytes());
        }
        assert!(validate(&bytes, &Limits::with_max_depth(3)).is_ok());
        assert!(matches!(
            validate(&bytes, &Limits::with_max_depth(2)),
            Err(KspackError::DepthLimitExceeded(2))
        ));
    }
}
