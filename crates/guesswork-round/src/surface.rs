//! The hardware the game draws on, as narrow traits.
//!
//! [`InputSurface`] is the button, the eight switches, the eight digit
//! cells, and the eight lamps. [`StatusDisplay`] is the text screen.
//! Writes are fire-and-forget.

use crate::{COLUMNS, DigitColumns};

/// What a blank digit cell shows.
pub const BLANK_CELL: char = ' ';

/// Button, switches, digit cells, and lamps.
pub trait InputSurface {
    /// Current state of the momentary button.
    fn button(&self) -> bool;

    /// Current state of the eight switches, index = column.
    fn switches(&self) -> [bool; COLUMNS];

    /// Writes one character to digit cell `index`.
    fn set_cell(&mut self, index: usize, ch: char);

    /// Turns lamp `index` on or off.
    fn set_lamp(&mut self, index: usize, lit: bool);
}

/// Text size on the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emphasis {
    #[default]
    Normal,
    Large,
}

/// The status text screen.
pub trait StatusDisplay {
    /// Replaces the screen contents. When `log_to_console` is set the text
    /// is also logged; the per-tick countdown turns it off.
    fn show_message(&mut self, text: &str, emphasis: Emphasis, log_to_console: bool);

    fn clear(&mut self);
}

/// Spreads `text` across the cells: one character per cell, padded with
/// blanks, anything past eight characters dropped.
pub fn write_text<S: InputSurface + ?Sized>(surface: &mut S, text: &str) {
    let mut chars = text.chars();
    for i in 0..COLUMNS {
        surface.set_cell(i, chars.next().unwrap_or(BLANK_CELL));
    }
}

/// Shows each column's digit on its cell.
pub fn write_digits<S: InputSurface + ?Sized>(surface: &mut S, digits: &DigitColumns) {
    for (i, ch) in digits.cell_chars().into_iter().enumerate() {
        surface.set_cell(i, ch);
    }
}

pub fn write_lamps<S: InputSurface + ?Sized>(surface: &mut S, lamps: &[bool; COLUMNS]) {
    for (i, lit) in lamps.iter().enumerate() {
        surface.set_lamp(i, *lit);
    }
}

/// Blanks every cell and turns every lamp off.
pub fn clear_surface<S: InputSurface + ?Sized>(surface: &mut S) {
    for i in 0..COLUMNS {
        surface.set_cell(i, BLANK_CELL);
        surface.set_lamp(i, false);
    }
}
