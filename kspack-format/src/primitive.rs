//! Fixed-width little-endian scalar readers and writers
//!
//! Readers take the whole buffer and an absolute offset so callers can keep a
//! single cursor; every read is bounds checked and reports
//! [`KspackError::UnexpectedEnd`] instead of panicking.

use crate::error::{KspackError, Result};

/// Borrow `len` bytes starting at `pos`.
pub fn read_slice(bytes: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    let end = pos.checked_add(len).ok_or(KspackError::UnexpectedEnd)?;
    bytes.get(pos..end).ok_or(KspackError::UnexpectedEnd)
}

/// Copy `N` bytes starting at `pos` into an array.
pub fn read_array<const N: usize>(bytes: &[u8], pos: usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(read_slice(bytes, pos, N)?);
    Ok(out)
}

macro_rules! le_reader {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(bytes: &[u8], pos: usize) -> Result<$ty> {
            Ok(<$ty>::from_le_bytes(read_array(bytes, pos)?))
        }
    };
}

le_reader!(
    /// Read an `i8`.
    read_i8, i8
);
le_reader!(
    /// Read a little-endian `i16`.
    read_i16, i16
);
le_reader!(
    /// Read a little-endian `i32`.
    read_i32, i32
);
le_reader!(
    /// Read a little-endian `i64`.
    read_i64, i64
);
le_reader!(
    /// Read a `u8`.
    read_u8, u8
);
le_reader!(
    /// Read a little-endian `u16`.
    read_u16, u16
);
le_reader!(
    /// Read a little-endian `u32`.
    read_u32, u32
);
le_reader!(
    /// Read a little-endian `u64`.
    read_u64, u64
);
le_reader!(
    /// Read a little-endian `f32`.
    read_f32, f32
);
le_reader!(
    /// Read a little-endian `f64`.
    read_f64, f64
);

/// Read a bool; any non-zero byte is true.
pub fn read_bool(bytes: &[u8], pos: usize) -> Result<bool> {
    Ok(read_u8(bytes, pos)? != 0)
}

/// Append a little-endian `u32`.
pub fn put_u32(out: &mut Vec<u8>, val: u32) {
    out.extend_from_slice(&val.to_le_bytes());
}

/// Overwrite four bytes at `pos` with a little-endian `u32`.
///
/// Used to backpatch container lengths once the members are written.
pub fn patch_u32(out: &mut [u8], pos: usize, val: u32) -> Result<()> {
    let end = pos.checked_add(4).ok_or(KspackError::UnexpectedEnd)?;
    let slot = out.get_mut(pos..end).ok_or(KspackError::UnexpectedEnd)?;
    slot.copy_from_slice(&val.to_le_bytes());
    Ok(())
}

/// Convert a length to its 4-byte wire form.
pub fn length_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| KspackError::LengthOverflow(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_little_endian_layout() {
        let bytes = [0x64, 0x00, 0x00, 0x00];
        assert_eq!(read_i32(&bytes, 0).unwrap(), 100);
        assert_eq!(read_u16(&[0x01, 0x02], 0).unwrap(), 0x0201);
        assert_eq!(read_i8(&[0xFF], 0).unwrap(), -1);
    }

    #[test]
    fn test_read_past_end() {
        let bytes = [0u8; 3];
        assert!(matches!(read_u32(&bytes, 0), Err(KspackError::UnexpectedEnd)));
        assert!(matches!(read_u8(&bytes, 3), Err(KspackError::UnexpectedEnd)));
        assert!(matches!(
            read_slice(&bytes, usize::MAX, 2),
            Err(KspackError::UnexpectedEnd)
        ));
    }

    #[test]
    fn test_read_bool() {
        assert!(!read_bool(&[0], 0).unwrap());
        assert!(read_bool(&[1], 0).unwrap());
        assert!(read_bool(&[7], 0).unwrap());
    }

    #[test]
    fn test_patch_u32() {
        let mut out = Vec::new();
        put_u32(&mut out, 0);
        out.push(0xAA);
        patch_u32(&mut out, 0, 0x0102_0304).unwrap();
        assert_eq!(out, vec![0x04, 0x03, 0x02, 0x01, 0xAA]);
        assert!(patch_u32(&mut out, 2, 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_u64_matches_std(value in any::<u64>()) {
            let bytes = value.to_le_bytes();
            prop_assert_eq!(read_u64(&bytes, 0).unwrap(), value);
        }

        #[test]
        fn prop_f64_bits_preserved(value in any::<f64>()) {
            let bytes = value.to_le_bytes();
            prop_assert_eq!(read_f64(&bytes, 0).unwrap().to_bits(), value.to_bits());
        }
    }
}
