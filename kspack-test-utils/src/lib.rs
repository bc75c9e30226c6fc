//! KSPACK Test Utilities
//!
//! Shared helpers for the KSPACK test suites: a byte-level entry builder that
//! writes wire data without going through the encoder, and generators for
//! JSON documents used by round-trip tests and benches.

use kspack_format::constants::*;
use serde_json::{json, Value};

/// Builder for hand-crafted wire bytes.
///
/// Each call appends one entry; [`EntryBuilder::object`] and
/// [`EntryBuilder::array`] wrap the entries of another builder and count
/// them. Keys are written as given, so an empty key produces an unnamed
/// entry.
#[derive(Debug, Clone, Default)]
pub struct EntryBuilder {
    out: Vec<u8>,
    count: u32,
}

impl EntryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    fn prefix(&mut self, tag: u8, key: &str, content_len: Option<LengthBytes>) {
        self.out.push(tag);
        self.out.push(if key.is_empty() {
            0
        } else {
            (key.len() + 1) as u8
        });
        match content_len {
            Some(LengthBytes::Short(len)) => self.out.push(len),
            Some(LengthBytes::Long(len)) => self.out.extend_from_slice(&len.to_le_bytes()),
            None => {}
        }
        if !key.is_empty() {
            self.out.extend_from_slice(key.as_bytes());
            self.out.push(TERMINATOR);
        }
        self.count += 1;
    }

    fn fixed(mut self, tag: u8, key: &str, value: &[u8]) -> Self {
        self.prefix(tag, key, None);
        self.out.extend_from_slice(value);
        self
    }

    /// Append a signed 8-bit entry
    pub fn int8(self, key: &str, value: i8) -> Self {
        self.fixed(TAG_INT8, key, &value.to_le_bytes())
    }

    /// Append a signed 16-bit entry
    pub fn int16(self, key: &str, value: i16) -> Self {
        self.fixed(TAG_INT16, key, &value.to_le_bytes())
    }

    /// Append a signed 32-bit entry
    pub fn int32(self, key: &str, value: i32) -> Self {
        self.fixed(TAG_INT32, key, &value.to_le_bytes())
    }

    /// Append a signed 64-bit entry
    pub fn int64(self, key: &str, value: i64) -> Self {
        self.fixed(TAG_INT64, key, &value.to_le_bytes())
    }

    /// Append an unsigned 8-bit entry
    pub fn uint8(self, key: &str, value: u8) -> Self {
        self.fixed(TAG_UINT8, key, &[value])
    }

    /// Append an unsigned 32-bit entry
    pub fn uint32(self, key: &str, value: u32) -> Self {
        self.fixed(TAG_UINT32, key, &value.to_le_bytes())
    }

    /// Append an unsigned 64-bit entry
    pub fn uint64(self, key: &str, value: u64) -> Self {
        self.fixed(TAG_UINT64, key, &value.to_le_bytes())
    }

    /// Append a bool entry
    pub fn bool(self, key: &str, value: bool) -> Self {
        self.fixed(TAG_BOOL, key, &[value as u8])
    }

    /// Append a single precision float entry
    pub fn float(self, key: &str, value: f32) -> Self {
        self.fixed(TAG_FLOAT, key, &value.to_le_bytes())
    }

    /// Append a double precision float entry
    pub fn double(self, key: &str, value: f64) -> Self {
        self.fixed(TAG_DOUBLE, key, &value.to_le_bytes())
    }

    /// Append a null entry
    pub fn null(self, key: &str) -> Self {
        self.fixed(TAG_NULL, key, &[0])
    }

    /// Append a string entry, short form when it fits
    pub fn string(mut self, key: &str, value: &str) -> Self {
        let stored = value.len() + 1;
        if stored <= MAX_SHORT_ITEM_LEN {
            self.prefix(TAG_SHORT_STRING, key, Some(LengthBytes::Short(stored as u8)));
        } else {
            self.prefix(TAG_STRING, key, Some(LengthBytes::Long(stored as u32)));
        }
        self.out.extend_from_slice(value.as_bytes());
        self.out.push(TERMINATOR);
        self
    }

    /// Append a long-form string entry regardless of length
    pub fn long_string(mut self, key: &str, value: &str) -> Self {
        let stored = (value.len() + 1) as u32;
        self.prefix(TAG_STRING, key, Some(LengthBytes::Long(stored)));
        self.out.extend_from_slice(value.as_bytes());
        self.out.push(TERMINATOR);
        self
    }

    /// Append a binary entry, short form when it fits
    pub fn binary(mut self, key: &str, value: &[u8]) -> Self {
        if value.len() <= MAX_SHORT_PAYLOAD_LEN {
            self.prefix(TAG_SHORT_BINARY, key, Some(LengthBytes::Short(value.len() as u8)));
        } else {
            self.prefix(TAG_BINARY, key, Some(LengthBytes::Long(value.len() as u32)));
        }
        self.out.extend_from_slice(value);
        self
    }

    /// Append an object whose members are the entries of `members`
    pub fn object(self, key: &str, members: EntryBuilder) -> Self {
        self.container(TAG_OBJECT, key, members)
    }

    /// Append an array whose elements are the entries of `elements`
    pub fn array(self, key: &str, elements: EntryBuilder) -> Self {
        self.container(TAG_ARRAY, key, elements)
    }

    fn container(mut self, tag: u8, key: &str, body: EntryBuilder) -> Self {
        let content_len = (CONTAINER_COUNT_LEN + body.out.len()) as u32;
        self.prefix(tag, key, Some(LengthBytes::Long(content_len)));
        self.out.extend_from_slice(&body.count.to_le_bytes());
        self.out.extend_from_slice(&body.out);
        self
    }

    /// Append raw bytes as one entry (for malformed input)
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.out.extend_from_slice(bytes);
        self.count += 1;
        self
    }

    /// Number of entries appended at this level
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Finish and return the bytes
    pub fn build(self) -> Vec<u8> {
        self.out
    }
}

enum LengthBytes {
    Short(u8),
    Long(u32),
}

/// `depth` arrays nested inside each other, the innermost empty.
pub fn nested_arrays(depth: usize) -> Vec<u8> {
    let mut builder = EntryBuilder::new();
    for _ in 0..depth {
        builder = EntryBuilder::new().array("", builder);
    }
    builder.build()
}

/// Generate JSON documents with various shapes
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// Records whose fields change type from one record to the next
    pub fn schema_drift_records() -> Vec<Value> {
        vec![
            json!({"id": "1", "value": 42}),
            json!({"id": "2", "value": "hello"}),
            json!({"id": "3", "value": true}),
            json!({"id": "4", "value": null}),
        ]
    }

    /// A record nested `depth` objects deep
    pub fn deeply_nested_record(depth: usize) -> Value {
        let mut nested = json!({"leaf": "value"});
        for i in 0..depth {
            nested = json!({ (format!("level_{}", i)): nested });
        }
        nested
    }

    /// Records with Unicode strings and keys
    pub fn unicode_edge_records() -> Vec<Value> {
        vec![
            json!({"id": 1, "ascii": "Hello, World!"}),
            json!({"id": 2, "unicode": "Hello, 世界! 🌍"}),
            json!({"id": 3, "emoji": "🚀🎉💯🔥⭐"}),
            json!({"id": 4, "mixed": "ASCII + 中文 + 🎯 + العربية", "clé": "valeur"}),
        ]
    }

    /// Records with boundary values
    pub fn boundary_value_records() -> Vec<Value> {
        vec![
            json!({"id": "int_max", "value": i64::MAX}),
            json!({"id": "int_min", "value": i64::MIN}),
            json!({"id": "uint_max", "value": u64::MAX}),
            json!({"id": "empty_string", "value": ""}),
            json!({"id": "long_string", "value": "x".repeat(300)}),
            json!({"id": "empty_array", "value": []}),
            json!({"id": "empty_object", "value": {}}),
        ]
    }

    /// Log-like records for benches and stress tests
    pub fn large_record_set(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| {
                let level = match i % 4 {
                    0 => "DEBUG",
                    1 => "INFO",
                    2 => "WARN",
                    _ => "ERROR",
                };
                json!({
                    "id": i,
                    "timestamp": 1_609_459_200u64 + i as u64,
                    "level": level,
                    "user": format!("user_{}", i % 100),
                    "message": format!("Test message number {}", i),
                    "tags": ["a", "b"],
                })
            })
            .collect()
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use serde_json::Value;

    /// Assert that two JSON values are equal, printing both on failure
    pub fn assert_json_equal(actual: &Value, expected: &Value, context: &str) {
        if actual != expected {
            panic!(
                "JSON assertion failed in {}:\nExpected: {}\nActual: {}",
                context,
                serde_json::to_string_pretty(expected).unwrap_or_default(),
                serde_json::to_string_pretty(actual).unwrap_or_default()
            );
        }
    }

    /// Assert that `bytes` starts with `prefix`, showing both in hex
    pub fn assert_prefix(bytes: &[u8], prefix: &[u8], context: &str) {
        if !bytes.starts_with(prefix) {
            panic!(
                "Prefix assertion failed in {}:\nExpected prefix: {:02x?}\nActual: {:02x?}",
                context, prefix, bytes
            );
        }
    }
}
