//! Typed bitmask over the test catalog.
//!
//! Each test owns exactly one bit; a [`TestBitmap`] is any union of them.
//! The same type travels in negotiation requests, device capability
//! responses and failure reports.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

/// Set of tests encoded as a `u32` bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TestBitmap(u32);

impl TestBitmap {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when exactly one bit is set, i.e. this names a single test.
    pub const fn is_single(self) -> bool {
        self.0.is_power_of_two()
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Parse the device's hex rendering, with or without a `0x` prefix.
    pub fn parse_hex(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        u32::from_str_radix(digits, 16).ok().map(Self)
    }
}

impl fmt::Display for TestBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for TestBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl BitOr for TestBitmap {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for TestBitmap {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TestBitmap {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for TestBitmap {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl FromIterator<TestBitmap> for TestBitmap {
    fn from_iter<I: IntoIterator<Item = TestBitmap>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, BitOr::bitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_nothing_is_empty() {
        let bitmap: TestBitmap = std::iter::empty().collect();
        assert!(bitmap.is_empty());
        assert_eq!(bitmap.to_string(), "0x0");
    }

    #[test]
    fn union_and_intersection() {
        let a = TestBitmap::from_bits(0b0101);
        let b = TestBitmap::from_bits(0b0110);
        assert_eq!((a | b).bits(), 0b0111);
        assert_eq!((a & b).bits(), 0b0100);
        assert!(a.intersects(b));
        assert!(!a.contains(b));
        assert!((a | b).contains(a));
    }

    #[test]
    fn single_bit_detection() {
        assert!(TestBitmap::from_bits(0x40).is_single());
        assert!(!TestBitmap::from_bits(0x41).is_single());
        assert!(!TestBitmap::EMPTY.is_single());
    }

    #[test]
    fn parse_hex_accepts_prefix_and_bare_digits() {
        assert_eq!(TestBitmap::parse_hex("0x4d"), Some(TestBitmap::from_bits(0x4d)));
        assert_eq!(TestBitmap::parse_hex("4D"), Some(TestBitmap::from_bits(0x4d)));
        assert_eq!(TestBitmap::parse_hex(" 0X1 "), Some(TestBitmap::from_bits(1)));
        assert_eq!(TestBitmap::parse_hex("zz"), None);
        assert_eq!(TestBitmap::parse_hex(""), None);
    }

    #[test]
    fn display_and_lower_hex() {
        let bitmap = TestBitmap::from_bits(0x4d);
        assert_eq!(bitmap.to_string(), "0x4d");
        assert_eq!(format!("{bitmap:08x}"), "0000004d");
    }
}
