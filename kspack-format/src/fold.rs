//! Case-insensitive key matching for struct field resolution
//!
//! Field names are compared against streamed keys with a strategy chosen once
//! per field name. ASCII names use a byte-wise comparison that folds the 0x20
//! case bit. Names containing non-ASCII bytes, or the letters `k` and `s`
//! whose case partners include the Kelvin sign (U+212A) and the long s
//! (U+017F), use [`equal_fold_right`]. That comparison knows only those two
//! non-ASCII equivalences: any other multi-byte sequence never matches, even
//! against identical bytes. Full Unicode folding is out of scope.

/// Mask clearing the ASCII lowercase bit.
const CASE_MASK: u8 = !0x20;

/// UTF-8 encoding of U+212A KELVIN SIGN.
const KELVIN: &[u8] = "\u{212A}".as_bytes();

/// UTF-8 encoding of U+017F LATIN SMALL LETTER LONG S.
const SMALL_LONG_ESS: &[u8] = "\u{017F}".as_bytes();

/// Comparison selected for a field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldStrategy {
    /// Rune-aware comparison with the Kelvin / long s special cases
    EqualFoldRight,
    /// ASCII name with non-letters: letters fold, everything else exact
    AsciiEqualFold,
    /// ASCII letters only: fold the case bit on every byte
    SimpleLetterEqualFold,
}

impl FoldStrategy {
    /// Pick the cheapest correct strategy for `name`.
    pub fn for_name(name: &[u8]) -> Self {
        let mut non_letter = false;
        let mut special = false;
        for &b in name {
            if b >= 0x80 {
                return FoldStrategy::EqualFoldRight;
            }
            let upper = b & CASE_MASK;
            if !upper.is_ascii_uppercase() {
                non_letter = true;
            } else if upper == b'K' || upper == b'S' {
                special = true;
            }
        }
        if special {
            FoldStrategy::EqualFoldRight
        } else if non_letter {
            FoldStrategy::AsciiEqualFold
        } else {
            FoldStrategy::SimpleLetterEqualFold
        }
    }

    /// Compare the field name `s` this strategy was built for with key `t`.
    pub fn matches(self, s: &[u8], t: &[u8]) -> bool {
        match self {
            FoldStrategy::EqualFoldRight => equal_fold_right(s, t),
            FoldStrategy::AsciiEqualFold => ascii_equal_fold(s, t),
            FoldStrategy::SimpleLetterEqualFold => simple_letter_equal_fold(s, t),
        }
    }
}

/// Case-insensitive equality of a field name `a` and a key `b`.
pub fn names_equal_fold(a: &[u8], b: &[u8]) -> bool {
    FoldStrategy::for_name(a).matches(a, b)
}

/// Fold comparison where `s` is walked byte by byte as ASCII and `t` may
/// contain the Kelvin sign or the long s in place of `k`/`s`.
pub fn equal_fold_right(s: &[u8], mut t: &[u8]) -> bool {
    for &sb in s {
        let Some(&tb) = t.first() else {
            return false;
        };
        if tb < 0x80 {
            if sb != tb {
                let sb_upper = sb & CASE_MASK;
                if !sb_upper.is_ascii_uppercase() || sb_upper != tb & CASE_MASK {
                    return false;
                }
            }
            t = &t[1..];
            continue;
        }
        // t holds a multi-byte sequence; only the two special runes can match
        let special = match sb {
            b's' | b'S' => SMALL_LONG_ESS,
            b'k' | b'K' => KELVIN,
            _ => return false,
        };
        if !t.starts_with(special) {
            return false;
        }
        t = &t[special.len()..];
    }
    t.is_empty()
}

/// ASCII fold comparison: letters fold, other bytes must match exactly.
pub fn ascii_equal_fold(s: &[u8], t: &[u8]) -> bool {
    if s.len() != t.len() {
        return false;
    }
    s.iter().zip(t).all(|(&sb, &tb)| {
        if sb == tb {
            return true;
        }
        sb.is_ascii_alphabetic() && sb & CASE_MASK == tb & CASE_MASK
    })
}

/// Letters-only fold comparison: the case bit is ignored on every byte.
pub fn simple_letter_equal_fold(s: &[u8], t: &[u8]) -> bool {
    if s.len() != t.len() {
        return false;
    }
    s.iter().zip(t).all(|(&sb, &tb)| sb & CASE_MASK == tb & CASE_MASK)
}
