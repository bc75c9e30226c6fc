//! Property-based tests for KSPACK format primitives

use kspack_format::entry::{encode_prefix, write_key};
use kspack_format::fold::{ascii_equal_fold, equal_fold_right, simple_letter_equal_fold};
use kspack_format::{names_equal_fold, EntryHeader, FoldStrategy, Tag};
use proptest::prelude::*;

proptest! {
    #[test]
    fn fold_is_reflexive_for_ascii(name in "[A-Za-z0-9_]{0,40}") {
        prop_assert!(names_equal_fold(name.as_bytes(), name.as_bytes()));
    }

    #[test]
    fn fold_ignores_ascii_case(name in "[A-Za-z0-9_]{1,40}") {
        let upper = name.to_ascii_uppercase();
        let lower = name.to_ascii_lowercase();
        prop_assert!(names_equal_fold(upper.as_bytes(), lower.as_bytes()));
        prop_assert!(names_equal_fold(lower.as_bytes(), upper.as_bytes()));
    }

    #[test]
    fn fold_rejects_length_mismatch(a in "[a-z]{0,20}", extra in "[a-z]{1,5}") {
        let longer = format!("{}{}", a, extra);
        prop_assert!(!names_equal_fold(a.as_bytes(), longer.as_bytes()));
        prop_assert!(!names_equal_fold(longer.as_bytes(), a.as_bytes()));
    }

    #[test]
    fn strategies_agree_on_ascii(a in "[A-Za-z]{0,16}", b in "[A-Za-z]{0,16}") {
        // Letters only: every strategy must give the same answer
        let expected = a.eq_ignore_ascii_case(&b);
        prop_assert_eq!(equal_fold_right(a.as_bytes(), b.as_bytes()), expected);
        prop_assert_eq!(ascii_equal_fold(a.as_bytes(), b.as_bytes()), expected);
        prop_assert_eq!(simple_letter_equal_fold(a.as_bytes(), b.as_bytes()), expected);
        prop_assert_eq!(FoldStrategy::for_name(a.as_bytes()).matches(a.as_bytes(), b.as_bytes()), expected);
    }

    #[test]
    fn header_parse_never_panics(input in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = EntryHeader::parse(&input, 0);
    }

    #[test]
    fn header_prefix_roundtrip(key in "[a-z]{0,254}", len in 0usize..300) {
        let tag = if len <= 255 { Tag::ShortBinary } else { Tag::Binary };
        let mut out = encode_prefix(tag, key.as_bytes(), len).unwrap().to_vec();
        write_key(&mut out, key.as_bytes());
        let header = EntryHeader::parse(&out, 0).unwrap();
        prop_assert_eq!(header.tag, tag);
        prop_assert_eq!(header.key, key.as_bytes());
        prop_assert_eq!(header.content_len, Some(len));
        prop_assert_eq!(header.header_len, out.len());
    }
}
