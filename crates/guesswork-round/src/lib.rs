//! Round state machine and timed digit capture for Guesswork.
//!
//! A round starts when the host broadcasts `game/roles`. Every device,
//! the host included, then runs the same fixed-length capture phase:
//! eight switches each drive one decimal column, a row of lamps counts
//! down the remaining time, and when time runs out the columns compose
//! one number. The leader keeps it as the target; guessers publish it.
//!
//! # Key types
//!
//! - [`RoundEngine`]: owns game state, roles, guesses, and the capture phase
//! - [`CapturePhase`]: debounced digit entry for one round
//! - [`DigitColumns`]: the eight digits and their integer mapping
//! - [`GameState`]: `Discovering`, `Leader`, or `Guesser`
//! - [`InputSurface`] / [`StatusDisplay`]: the hardware the engine draws on
//!
//! Nothing in this crate performs I/O on its own. The node runtime calls
//! [`RoundEngine::tick`] from its poll loop and renders the returned frame.

mod capture;
mod config;
mod digits;
mod engine;
mod error;
mod guesses;
mod surface;

pub use capture::{CaptureFrame, CapturePhase, DebounceRecord};
pub use config::{GameState, LeaderSelection, RoundConfig, RoundRoles};
pub use digits::{COLUMNS, DigitColumns};
pub use engine::{CaptureOutcome, RoundEngine};
pub use error::RoundError;
pub use guesses::{GuessCollection, GuessOutcome};
pub use surface::{
    BLANK_CELL, Emphasis, InputSurface, StatusDisplay, clear_surface, write_digits, write_lamps,
    write_text,
};
