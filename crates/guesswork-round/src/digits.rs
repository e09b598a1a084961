//! The eight decimal digit columns.

use std::fmt;

use guesswork_protocol::MAX_GUESS;

/// Number of digit columns, switches, cells, and lamps.
pub const COLUMNS: usize = 8;

/// Eight independent decimal digits.
///
/// Column 0 is the least significant: the composed number is
/// `Σ digit[i] · 10^i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitColumns([u8; COLUMNS]);

impl DigitColumns {
    /// All zeros.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds columns from raw digits, reducing each modulo 10.
    pub fn from_digits(digits: [u8; COLUMNS]) -> Self {
        Self(digits.map(|d| d % 10))
    }

    /// Splits a number into columns. Anything above eight digits is
    /// discarded.
    pub fn decompose(number: u32) -> Self {
        let mut digits = [0u8; COLUMNS];
        let mut rest = number % (MAX_GUESS + 1);
        for d in &mut digits {
            *d = (rest % 10) as u8;
            rest /= 10;
        }
        Self(digits)
    }

    /// The number these columns spell.
    pub fn compose(&self) -> u32 {
        self.0
            .iter()
            .rev()
            .fold(0u32, |acc, &d| acc * 10 + u32::from(d))
    }

    /// Advances one column, wrapping 9 to 0. Returns the new digit.
    ///
    /// # Panics
    /// Panics if `column >= COLUMNS`.
    pub fn increment(&mut self, column: usize) -> u8 {
        let d = &mut self.0[column];
        *d = (*d + 1) % 10;
        *d
    }

    pub fn get(&self, column: usize) -> Option<u8> {
        self.0.get(column).copied()
    }

    pub fn digits(&self) -> [u8; COLUMNS] {
        self.0
    }

    /// The character shown on cell `i`: column `i`'s digit.
    pub fn cell_chars(&self) -> [char; COLUMNS] {
        self.0.map(|d| char::from(b'0' + d))
    }
}

impl fmt::Display for DigitColumns {
    /// Most significant column first, as the number reads.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in self.0.iter().rev() {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}
