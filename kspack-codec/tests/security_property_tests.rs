//! Security-focused property tests for KSPACK
//!
//! Arbitrary and corrupted buffers must produce errors, never panics or
//! unbounded allocation.

use kspack_codec::{decode_value, from_slice, marshal, validate, walk, Limits, Value};
use kspack_test_utils::EntryBuilder;
use proptest::prelude::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Target {
    id: u64,
    name: String,
    tags: Vec<String>,
    extra: Option<Box<Value>>,
}

fn sample() -> Vec<u8> {
    EntryBuilder::new()
        .object(
            "",
            EntryBuilder::new()
                .uint64("id", 7)
                .string("name", "sample")
                .array("tags", EntryBuilder::new().string("", "a").string("", "b"))
                .object("extra", EntryBuilder::new().binary("raw", &[1, 2, 3])),
        )
        .build()
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(input in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_value(&input);
        let _ = from_slice::<Target>(&input);
        let _ = validate(&input, &Limits::default());
    }

    #[test]
    fn huge_counts_are_rejected(count in 1_000u32.., tag in prop::sample::select(vec![0x10u8, 0x20])) {
        let mut bytes = vec![tag, 0x00, 0x04, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&count.to_le_bytes());
        prop_assert!(decode_value(&bytes).is_err());
    }

    #[test]
    fn single_byte_corruption_never_panics(index in 0usize..64, byte in any::<u8>()) {
        let mut bytes = sample();
        let index = index % bytes.len();
        bytes[index] = byte;
        let _ = decode_value(&bytes);
        let _ = from_slice::<Target>(&bytes);
    }

    #[test]
    fn validate_agrees_with_dynamic_decode(input in prop::collection::vec(any::<u8>(), 0..128)) {
        // Every buffer the dynamic decoder accepts is structurally valid
        if decode_value(&input).is_ok() {
            prop_assert!(validate(&input, &Limits::default()).is_ok());
        }
    }
}

#[test]
fn sample_is_valid_and_walkable() {
    let bytes = sample();
    validate(&bytes, &Limits::default()).unwrap();
    let mut entries = 0;
    walk(&bytes, &Limits::default(), |_| entries += 1).unwrap();
    assert_eq!(entries, 8);
    let target: Target = from_slice(&bytes).unwrap();
    assert_eq!(target.tags, vec!["a", "b"]);
}

#[test]
fn encoder_output_validates() {
    let value = decode_value(&sample()).unwrap();
    let encoded = marshal(&value).unwrap();
    validate(&encoded, &Limits::default()).unwrap();
}
