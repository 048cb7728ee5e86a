//! Collation configuration and the comparison entry points.
//!
//! Collations are pure comparators used by ORDER BY, index traversal,
//! and the value-list sort in IN pushdown.
//!
//! # Contract
//!
//! Every collation **must** be:
//! - **Deterministic**: same inputs always produce the same output.
//! - **Antisymmetric**: `compare(a, b)` is the reverse of `compare(b, a)`.
//! - **Transitive**: if `a < b` and `b < c`, then `a < c`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A named text collation.
///
/// Closed set of deterministic comparators over UTF-8 text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collation {
    /// Raw memcmp over the UTF-8 bytes. The default.
    #[default]
    Binary,
    /// ASCII case-insensitive comparison.
    ///
    /// Only folds ASCII letters (`A-Z` → `a-z`); non-ASCII bytes are
    /// compared as-is.
    NoCase,
    /// Trailing-space-insensitive comparison.
    ///
    /// Trailing ASCII spaces (`0x20`) are stripped before comparison;
    /// all other characters are significant.
    Rtrim,
}

impl Collation {
    /// Collation name (for `COLLATE name` and explain output).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "BINARY",
            Self::NoCase => "NOCASE",
            Self::Rtrim => "RTRIM",
        }
    }

    /// Compare two text values under this collation.
    #[must_use]
    pub fn compare(self, left: &str, right: &str) -> Ordering {
        match self {
            Self::Binary => left.as_bytes().cmp(right.as_bytes()),
            Self::NoCase => {
                let l = left.bytes().map(|b| b.to_ascii_lowercase());
                let r = right.bytes().map(|b| b.to_ascii_lowercase());
                l.cmp(r)
            }
            Self::Rtrim => {
                strip_trailing_spaces(left.as_bytes()).cmp(strip_trailing_spaces(right.as_bytes()))
            }
        }
    }
}

fn strip_trailing_spaces(s: &[u8]) -> &[u8] {
    let mut end = s.len();
    while end > 0 && s[end - 1] == b' ' {
        end -= 1;
    }
    &s[..end]
}

/// Value-level comparison configuration.
///
/// Immutable for the lifetime of a database. The sort in IN-list
/// snapshots takes this mode explicitly; nothing in the value layer
/// reads ambient state to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareMode {
    collation: Collation,
    binary_unsigned: bool,
}

impl CompareMode {
    /// Build a mode from a collation and the byte-string ordering flag.
    #[must_use]
    pub const fn new(collation: Collation, binary_unsigned: bool) -> Self {
        Self {
            collation,
            binary_unsigned,
        }
    }

    /// The configured text collation.
    #[must_use]
    pub const fn collation(&self) -> Collation {
        self.collation
    }

    /// Whether byte strings order as unsigned octets.
    #[must_use]
    pub const fn binary_unsigned(&self) -> bool {
        self.binary_unsigned
    }

    /// Compare two text values under the configured collation.
    #[must_use]
    pub fn compare_text(&self, left: &str, right: &str) -> Ordering {
        self.collation.compare(left, right)
    }

    /// Compare two byte strings.
    ///
    /// Unsigned mode is plain memcmp; signed mode compares each octet
    /// as `i8`, so `0x80..=0xFF` sort before `0x00..=0x7F`.
    #[must_use]
    pub fn compare_bytes(&self, left: &[u8], right: &[u8]) -> Ordering {
        if self.binary_unsigned {
            left.cmp(right)
        } else {
            let l = left.iter().map(|&b| b as i8);
            let r = right.iter().map(|&b| b as i8);
            l.cmp(r)
        }
    }
}

impl Default for CompareMode {
    fn default() -> Self {
        Self::new(Collation::Binary, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_memcmp() {
        let c = Collation::Binary;
        assert_eq!(c.compare("abc", "abc"), Ordering::Equal);
        assert_eq!(c.compare("abc", "abd"), Ordering::Less);
        // Uppercase sorts before lowercase in byte ordering.
        assert_eq!(c.compare("ABC", "abc"), Ordering::Less);
    }

    #[test]
    fn test_nocase_folds_ascii_only() {
        let c = Collation::NoCase;
        assert_eq!(c.compare("Alice", "alice"), Ordering::Equal);
        assert_eq!(c.compare("abc", "ABD"), Ordering::Less);
        // Multibyte sequences are not folded.
        assert_ne!(c.compare("Ü", "ü"), Ordering::Equal);
    }

    #[test]
    fn test_rtrim_ignores_trailing_spaces() {
        let c = Collation::Rtrim;
        assert_eq!(c.compare("abc   ", "abc"), Ordering::Equal);
        assert_eq!(c.compare("abc ", "abc  x"), Ordering::Less);
        // Leading spaces are significant.
        assert_ne!(c.compare(" abc", "abc"), Ordering::Equal);
    }

    #[test]
    fn test_bytes_signed_vs_unsigned() {
        let unsigned = CompareMode::new(Collation::Binary, true);
        let signed = CompareMode::new(Collation::Binary, false);
        assert_eq!(unsigned.compare_bytes(&[0x7F], &[0x80]), Ordering::Less);
        assert_eq!(signed.compare_bytes(&[0x7F], &[0x80]), Ordering::Greater);
        assert_eq!(signed.compare_bytes(&[0x80], &[0x80]), Ordering::Equal);
    }

    #[test]
    fn test_collation_antisymmetric() {
        for c in [Collation::Binary, Collation::NoCase, Collation::Rtrim] {
            for (a, b) in [("abc", "abd"), ("A", "a"), ("x ", "x")] {
                assert_eq!(c.compare(a, b), c.compare(b, a).reverse(), "{c:?} {a:?} {b:?}");
            }
        }
    }
}
