use std::ops::{Add, AddAssign, Sub};

use text_size::TextSize;

/// Zero-based row and byte column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const ZERO: Self = Self { row: 0, column: 0 };

    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl Add for Point {
    type Output = Self;

    /// Appends `rhs` as an extent: rows accumulate and the column restarts
    /// when `rhs` spans a newline.
    fn add(self, rhs: Self) -> Self {
        if rhs.row > 0 {
            Self::new(self.row + rhs.row, rhs.column)
        } else {
            Self::new(self.row, self.column + rhs.column)
        }
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        if self.row > rhs.row {
            Self::new(self.row - rhs.row, self.column)
        } else {
            Self::new(0, self.column.saturating_sub(rhs.column))
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// A length measured both in bytes and in rows/columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextLen {
    pub bytes: TextSize,
    pub extent: Point,
}

impl TextLen {
    pub const ZERO: Self = Self { bytes: TextSize::new(0), extent: Point::ZERO };

    pub const fn new(bytes: TextSize, extent: Point) -> Self {
        Self { bytes, extent }
    }

    /// Measures `text`, counting `\n` as a line break.
    pub fn of(text: &[u8]) -> Self {
        let mut len = Self::ZERO;
        len.advance(text);
        len
    }

    /// Extends this length by `text`.
    pub fn advance(&mut self, text: &[u8]) {
        for &byte in text {
            self.push(byte);
        }
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.bytes += TextSize::new(1);
        if byte == b'\n' {
            self.extent.row += 1;
            self.extent.column = 0;
        } else {
            self.extent.column += 1;
        }
    }

    pub fn is_empty(self) -> bool {
        self.bytes == TextSize::new(0)
    }
}

impl Add for TextLen {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self { bytes: self.bytes + rhs.bytes, extent: self.extent + rhs.extent }
    }
}

impl AddAssign for TextLen {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for TextLen {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            bytes: self.bytes.checked_sub(rhs.bytes).unwrap_or_default(),
            extent: self.extent - rhs.extent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_restarts_column_after_newline() {
        let len = TextLen::of(b"ab\ncde");
        assert_eq!(len.bytes, TextSize::new(6));
        assert_eq!(len.extent, Point::new(1, 3));

        let joined = TextLen::of(b"xy") + len;
        assert_eq!(joined.extent, Point::new(1, 3));
        assert_eq!(joined.bytes, TextSize::new(8));
    }

    #[test]
    fn subtraction_inverts_addition() {
        let a = TextLen::of(b"one\ntwo");
        let b = TextLen::of(b"\nthree");
        assert_eq!((a + b) - a, b);
        assert_eq!(TextLen::of(b"abc") - TextLen::of(b"a"), TextLen::of(b"bc"));
    }
}
