//! Character sets over the 256 byte values plus the synthetic border symbol.
//!
//! A [`CharSet`] is a fixed-width 257-bit mask: bit `i` is byte `i`, bit 256 is
//! the [`BORDER`] symbol that stands for the `^`/`$` anchors. Sets are plain
//! `Copy` values combined with [`CharSet::or`], [`CharSet::and`] and
//! [`CharSet::exclude`].

use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

/// An alphabet symbol: a byte value `0..=255` or [`BORDER`].
pub type Symbol = u16;

/// Number of symbols in the alphabet (256 bytes + border).
pub const ALPHABET_SIZE: usize = 257;

/// The synthetic symbol matched by `^` and `$`.
pub const BORDER: Symbol = 256;

const WORDS: usize = ALPHABET_SIZE.div_ceil(64);

/// Labels with more members than this are abbreviated when rendered.
const DISPLAY_MAX: usize = 5;

/// A set of alphabet symbols stored as a 257-bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CharSet([u64; WORDS]);

impl CharSet {
    /// The empty set. Only `exclude` may legitimately produce it.
    pub const EMPTY: CharSet = CharSet([0; WORDS]);

    /// Every byte plus the border symbol.
    pub const FULL: CharSet = CharSet::range(0, BORDER);

    /// Only the border symbol.
    pub const BORDER: CharSet = CharSet::singleton(BORDER);

    /// `.`: every byte, but not the border.
    pub const DOT: CharSet = CharSet::range(0, 255);

    /// `\w`
    pub const WORDS: CharSet =
        CharSet::from_bytes(b"AaBbCcDdEeFfGgHhIiJjKkLlMmNnOoPpQqRrSsTtUuVvWwXxYyZz0123456789_");

    /// `\d`
    pub const DIGITS: CharSet = CharSet::from_bytes(b"0123456789");

    /// `\s`
    pub const SPACES: CharSet = CharSet::from_bytes(b" \x0c\n\r\t\x0b");

    /// `\W`
    pub const NON_WORDS: CharSet = CharSet::DOT.exclude(CharSet::WORDS);

    /// `\D`
    pub const NON_DIGITS: CharSet = CharSet::DOT.exclude(CharSet::DIGITS);

    /// `\S`
    pub const NON_SPACES: CharSet = CharSet::DOT.exclude(CharSet::SPACES);

    /// A set holding a single symbol.
    pub const fn singleton(symbol: Symbol) -> CharSet {
        let bit = symbol as usize;
        assert!(bit < ALPHABET_SIZE, "symbol out of alphabet");
        let mut words = [0; WORDS];
        words[bit / 64] = 1 << (bit % 64);
        CharSet(words)
    }

    /// The inclusive interval between two symbols, in either order.
    pub const fn range(a: Symbol, b: Symbol) -> CharSet {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        assert!((hi as usize) < ALPHABET_SIZE, "symbol out of alphabet");
        let mut words = [0; WORDS];
        let mut bit = lo as usize;
        while bit <= hi as usize {
            words[bit / 64] |= 1 << (bit % 64);
            bit += 1;
        }
        CharSet(words)
    }

    /// The set of the given bytes.
    pub const fn from_bytes(bytes: &[u8]) -> CharSet {
        let mut words = [0; WORDS];
        let mut i = 0;
        while i < bytes.len() {
            let bit = bytes[i] as usize;
            words[bit / 64] |= 1 << (bit % 64);
            i += 1;
        }
        CharSet(words)
    }

    /// Union.
    pub const fn or(self, other: CharSet) -> CharSet {
        let mut words = self.0;
        let mut i = 0;
        while i < WORDS {
            words[i] |= other.0[i];
            i += 1;
        }
        CharSet(words)
    }

    /// Intersection.
    pub const fn and(self, other: CharSet) -> CharSet {
        let mut words = self.0;
        let mut i = 0;
        while i < WORDS {
            words[i] &= other.0[i];
            i += 1;
        }
        CharSet(words)
    }

    /// Set difference: members of `self` that are not in `other`.
    pub const fn exclude(self, other: CharSet) -> CharSet {
        let mut words = self.0;
        let mut i = 0;
        while i < WORDS {
            words[i] &= !other.0[i];
            i += 1;
        }
        CharSet(words)
    }

    /// True if every member of `other` is also in `self`.
    pub fn includes(self, other: CharSet) -> bool {
        self.or(other) == self
    }

    /// True if `self` includes `other` and has at least one extra member.
    pub fn strictly_includes(self, other: CharSet) -> bool {
        self.includes(other) && self != other
    }

    /// Check whether a symbol is a member.
    pub fn contains(self, symbol: Symbol) -> bool {
        let bit = symbol as usize;
        bit < ALPHABET_SIZE && self.0[bit / 64] & (1 << (bit % 64)) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0.iter().all(|&word| word == 0)
    }

    /// Population count.
    pub fn count(self) -> usize {
        self.0.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterate over the members in ascending order.
    ///
    /// The iterator is `Clone`, so a sequence can be restarted from any point.
    pub fn iter(self) -> Members {
        Members {
            words: self.0,
            index: 0,
        }
    }
}

impl BitOr for CharSet {
    type Output = CharSet;

    fn bitor(self, rhs: CharSet) -> CharSet {
        self.or(rhs)
    }
}

impl BitAnd for CharSet {
    type Output = CharSet;

    fn bitand(self, rhs: CharSet) -> CharSet {
        self.and(rhs)
    }
}

impl Sub for CharSet {
    type Output = CharSet;

    fn sub(self, rhs: CharSet) -> CharSet {
        self.exclude(rhs)
    }
}

impl FromIterator<Symbol> for CharSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        iter.into_iter()
            .fold(CharSet::EMPTY, |set, symbol| set.or(CharSet::singleton(symbol)))
    }
}

impl IntoIterator for CharSet {
    type Item = Symbol;
    type IntoIter = Members;

    fn into_iter(self) -> Members {
        self.iter()
    }
}

/// Ascending iterator over the members of a [`CharSet`].
#[derive(Debug, Clone)]
pub struct Members {
    words: [u64; WORDS],
    index: usize,
}

impl Iterator for Members {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        while self.index < WORDS {
            let word = self.words[self.index];
            if word != 0 {
                let bit = word.trailing_zeros() as usize;
                self.words[self.index] &= word - 1;
                return Some((self.index * 64 + bit) as Symbol);
            }
            self.index += 1;
        }
        None
    }
}

/// Render a single byte the way it appears in an edge label.
fn push_byte(out: &mut String, byte: u8) {
    match byte {
        b'\\' => out.push_str("\\\\"),
        b'\t' => out.push_str("\\t"),
        b'\n' => out.push_str("\\n"),
        b'\r' => out.push_str("\\r"),
        b' '..=b'~' => out.push(byte as char),
        _ => out.push_str(&format!("\\x{byte:02x}")),
    }
}

/// Human-readable label: `^` for the border, `.` for every byte, `[abc]`,
/// `[^abc]` for nearly-full sets, and `[abcde]#N` once more than a handful
/// of members would be listed.
impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if self.contains(BORDER) {
            out.push('^');
        }
        let bytes = self.and(CharSet::DOT);
        let count = bytes.count();
        if count == 0 {
            return f.write_str(&out);
        }
        if count == ALPHABET_SIZE - 1 {
            out.push('.');
            return f.write_str(&out);
        }
        let listed = if count >= ALPHABET_SIZE - 1 - DISPLAY_MAX {
            out.push_str("[^");
            CharSet::DOT.exclude(bytes)
        } else {
            out.push('[');
            bytes
        };
        for (shown, symbol) in listed.iter().enumerate() {
            if shown >= DISPLAY_MAX {
                out.push_str(&format!("]#{count}"));
                return f.write_str(&out);
            }
            push_byte(&mut out, symbol as u8);
        }
        out.push(']');
        f.write_str(&out)
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharSet({self})")
    }
}

/// Frame an input with the border symbol on both ends, ready for simulation.
pub fn framed(input: &[u8]) -> Vec<Symbol> {
    let mut symbols = Vec::with_capacity(input.len() + 2);
    symbols.push(BORDER);
    symbols.extend(input.iter().map(|&byte| Symbol::from(byte)));
    symbols.push(BORDER);
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen, quickcheck};

    impl Arbitrary for CharSet {
        fn arbitrary(g: &mut Gen) -> Self {
            let mut words = [0u64; WORDS];
            for word in words.iter_mut() {
                *word = u64::arbitrary(g);
            }
            words[WORDS - 1] &= 1;
            CharSet(words)
        }
    }

    #[test]
    fn test_constants() {
        assert_eq!(CharSet::FULL.count(), ALPHABET_SIZE);
        assert_eq!(CharSet::DOT.count(), 256);
        assert!(CharSet::BORDER.contains(BORDER));
        assert!(!CharSet::DOT.contains(BORDER));
        assert_eq!(CharSet::DIGITS.count(), 10);
        assert_eq!(CharSet::WORDS.count(), 63);
        assert_eq!(CharSet::SPACES.count(), 6);
        assert_eq!(CharSet::NON_DIGITS.count(), 246);
        assert!(!CharSet::NON_WORDS.contains(u16::from(b'_')));
    }

    #[test]
    fn test_exclude_full_is_empty() {
        assert!(CharSet::FULL.exclude(CharSet::FULL).is_empty());
        assert_eq!(CharSet::FULL - CharSet::FULL, CharSet::EMPTY);
    }

    #[test]
    fn test_range_either_order() {
        let az = CharSet::range(u16::from(b'a'), u16::from(b'z'));
        assert_eq!(az, CharSet::range(u16::from(b'z'), u16::from(b'a')));
        assert_eq!(az.count(), 26);
        assert!(az.contains(u16::from(b'm')));
        assert!(!az.contains(u16::from(b'A')));
    }

    #[test]
    fn test_iter_ascending_and_restartable() {
        let set = CharSet::from_bytes(b"zab") | CharSet::BORDER;
        let members = set.iter();
        let first: Vec<Symbol> = members.clone().collect();
        let again: Vec<Symbol> = members.collect();
        assert_eq!(first, vec![97, 98, 122, BORDER]);
        assert_eq!(first, again);
    }

    #[test]
    fn test_inclusion() {
        let abc = CharSet::from_bytes(b"abc");
        let ab = CharSet::from_bytes(b"ab");
        assert!(abc.includes(ab));
        assert!(abc.includes(abc));
        assert!(abc.strictly_includes(ab));
        assert!(!abc.strictly_includes(abc));
        assert!(!ab.includes(abc));
    }

    #[test]
    fn test_display() {
        assert_eq!(CharSet::from_bytes(b"ba").to_string(), "[ab]");
        assert_eq!(CharSet::DOT.to_string(), ".");
        assert_eq!(CharSet::FULL.to_string(), "^.");
        assert_eq!(CharSet::BORDER.to_string(), "^");
        assert_eq!(CharSet::from_bytes(b"\n\\").to_string(), "[\\n\\\\]");
        assert_eq!(CharSet::DIGITS.to_string(), "[01234]#10");
        let not_a = CharSet::DOT.exclude(CharSet::from_bytes(b"a"));
        assert_eq!(not_a.to_string(), "[^a]");
        assert_eq!(CharSet::singleton(0).to_string(), "[\\x00]");
    }

    #[test]
    fn test_framed() {
        assert_eq!(framed(b"ab"), vec![BORDER, 97, 98, BORDER]);
    }

    quickcheck! {
        fn prop_or_commutative(a: CharSet, b: CharSet) -> bool {
            a.or(b) == b.or(a)
        }

        fn prop_or_associative(a: CharSet, b: CharSet, c: CharSet) -> bool {
            a.or(b).or(c) == a.or(b.or(c))
        }

        fn prop_union_includes_operand(a: CharSet, b: CharSet) -> bool {
            a.or(b).includes(a)
        }

        fn prop_union_count_bound(a: CharSet, b: CharSet) -> bool {
            a.or(b).count() <= a.count() + b.count()
        }

        fn prop_exclude_disjoint(a: CharSet, b: CharSet) -> bool {
            a.exclude(b).and(b).is_empty()
        }

        fn prop_iter_matches_count(a: CharSet) -> bool {
            a.iter().count() == a.count() && a.iter().all(|s| a.contains(s))
        }
    }
}
