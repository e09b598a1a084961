//! The timed, debounced number-entry phase.

use std::time::Duration;

use tokio::time::Instant;

use crate::{COLUMNS, DigitColumns, RoundConfig};

/// Debounce state for one switch.
///
/// A press registers once; holding the switch repeats every
/// `repeat_interval`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebounceRecord {
    held: bool,
    last_increment: Option<Instant>,
}

impl DebounceRecord {
    /// Feeds one sample. Returns `true` if the column should increment.
    pub fn sample(&mut self, held: bool, now: Instant, repeat: Duration) -> bool {
        let fire = held
            && (!self.held
                || self
                    .last_increment
                    .is_none_or(|last| now.saturating_duration_since(last) >= repeat));
        if fire {
            self.last_increment = Some(now);
        }
        self.held = held;
        fire
    }

    pub fn is_held(&self) -> bool {
        self.held
    }
}

/// What one capture tick wants drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFrame {
    /// Countdown thermometer: lamp `i` is lit while
    /// `i < remaining / total · 8`.
    pub lamps: [bool; COLUMNS],
    /// Current digits; cell `i` shows column `i`.
    pub digits: DigitColumns,
    /// Seconds left. Slightly negative on the final frame.
    pub remaining_secs: f64,
    /// `true` once elapsed time exceeds the phase duration. This frame is
    /// still drawn; the phase ends after it.
    pub expired: bool,
}

/// One round's capture phase.
#[derive(Debug, Clone)]
pub struct CapturePhase {
    started: Instant,
    duration: Duration,
    repeat: Duration,
    digits: DigitColumns,
    debounce: [DebounceRecord; COLUMNS],
    ticks: u64,
}

impl CapturePhase {
    /// Starts a phase at `now` with all columns at zero.
    pub fn new(config: &RoundConfig, now: Instant) -> Self {
        Self {
            started: now,
            duration: config.capture_duration,
            repeat: config.repeat_interval,
            digits: DigitColumns::new(),
            debounce: [DebounceRecord::default(); COLUMNS],
            ticks: 0,
        }
    }

    /// Samples the switches at `now` and returns the frame to draw.
    pub fn tick(&mut self, now: Instant, switches: [bool; COLUMNS]) -> CaptureFrame {
        self.ticks += 1;
        let elapsed = now.saturating_duration_since(self.started);
        let total = self.duration.as_secs_f64();
        let remaining_secs = total - elapsed.as_secs_f64();

        let fraction = if total > 0.0 { remaining_secs / total } else { 0.0 };
        let lamps: [bool; COLUMNS] =
            std::array::from_fn(|i| (i as f64) < fraction * COLUMNS as f64);

        for (column, (record, held)) in self.debounce.iter_mut().zip(switches).enumerate() {
            if record.sample(held, now, self.repeat) {
                let digit = self.digits.increment(column);
                tracing::trace!(column, digit, "digit incremented");
            }
        }

        CaptureFrame {
            lamps,
            digits: self.digits,
            remaining_secs,
            expired: elapsed > self.duration,
        }
    }

    /// The number entered so far.
    pub fn number(&self) -> u32 {
        self.digits.compose()
    }

    pub fn digits(&self) -> DigitColumns {
        self.digits
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
