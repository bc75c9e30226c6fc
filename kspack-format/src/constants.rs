//! Tag bytes and layout constants for the KSPACK wire format

/// Not a valid tag; never written.
pub const TAG_INVALID: u8 = 0x00;
/// Object container: content length (4), member count (4), members.
pub const TAG_OBJECT: u8 = 0x10;
/// Array container: content length (4), element count (4), elements.
pub const TAG_ARRAY: u8 = 0x20;
/// Long string: 4-byte content length including the terminator.
pub const TAG_STRING: u8 = 0x50;
/// Long binary: 4-byte exact content length.
pub const TAG_BINARY: u8 = 0x60;

/// Signed 8-bit integer.
pub const TAG_INT8: u8 = 0x11;
/// Signed 16-bit integer.
pub const TAG_INT16: u8 = 0x12;
/// Signed 32-bit integer.
pub const TAG_INT32: u8 = 0x14;
/// Signed 64-bit integer.
pub const TAG_INT64: u8 = 0x18;
/// Unsigned 8-bit integer.
pub const TAG_UINT8: u8 = 0x21;
/// Unsigned 16-bit integer.
pub const TAG_UINT16: u8 = 0x22;
/// Unsigned 32-bit integer.
pub const TAG_UINT32: u8 = 0x24;
/// Unsigned 64-bit integer.
pub const TAG_UINT64: u8 = 0x28;
/// Boolean stored in one byte (zero is false).
pub const TAG_BOOL: u8 = 0x31;
/// IEEE-754 single precision float.
pub const TAG_FLOAT: u8 = 0x44;
/// IEEE-754 double precision float.
pub const TAG_DOUBLE: u8 = 0x48;
/// Reserved date category; decoders must reject it.
pub const TAG_DATE: u8 = 0x58;
/// Null with a one-byte placeholder payload.
pub const TAG_NULL: u8 = 0x61;

/// Flag marking a variable-length item with a one-byte content length.
pub const SHORT_ITEM_FLAG: u8 = 0x80;
/// Reserved fixed-item marker; decoders must reject it.
pub const TAG_FIXED_ITEM: u8 = 0xF0;
/// Reserved deleted-item marker; decoders must reject it.
pub const TAG_DELETED_ITEM: u8 = 0x70;

/// Short string: 1-byte content length including the terminator.
pub const TAG_SHORT_STRING: u8 = TAG_STRING | SHORT_ITEM_FLAG;
/// Short binary: 1-byte exact content length.
pub const TAG_SHORT_BINARY: u8 = TAG_BINARY | SHORT_ITEM_FLAG;

/// Longest logical key; the key-length byte also carries the terminator.
pub const KEY_MAX_LEN: usize = 254;

/// Largest content length representable in a short item's length byte.
pub const MAX_SHORT_ITEM_LEN: usize = 255;

/// Longest logical payload written in short form (strings and binaries).
pub const MAX_SHORT_PAYLOAD_LEN: usize = 254;

/// Size in bytes of the member/element count that opens a container body.
pub const CONTAINER_COUNT_LEN: usize = 4;

/// Terminator byte trailing keys and string payloads.
pub const TERMINATOR: u8 = 0x00;
