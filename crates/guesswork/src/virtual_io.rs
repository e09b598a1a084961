//! In-memory stand-ins for the hardware.
//!
//! Both types are cheap handles over shared state: hand one clone to the
//! [`Node`](crate::Node) and keep another to press switches or read what
//! was drawn. Simulations and tests drive a node entirely through these.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use guesswork_round::{BLANK_CELL, COLUMNS, Emphasis, InputSurface, StatusDisplay};

// ---------------------------------------------------------------------------
// VirtualSurface
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SurfaceState {
    button: bool,
    switches: [bool; COLUMNS],
    cells: [char; COLUMNS],
    lamps: [bool; COLUMNS],
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            button: false,
            switches: [false; COLUMNS],
            cells: [BLANK_CELL; COLUMNS],
            lamps: [false; COLUMNS],
        }
    }
}

/// A button, eight switches, eight cells, and eight lamps held in memory.
#[derive(Debug, Clone, Default)]
pub struct VirtualSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl VirtualSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_button(&self, pressed: bool) {
        self.lock().button = pressed;
    }

    /// Holds or releases switch `index`. Out-of-range indices are ignored.
    pub fn set_switch(&self, index: usize, held: bool) {
        if let Some(s) = self.lock().switches.get_mut(index) {
            *s = held;
        }
    }

    pub fn cells(&self) -> [char; COLUMNS] {
        self.lock().cells
    }

    /// The cells read left to right as a string.
    pub fn cell_text(&self) -> String {
        self.lock().cells.iter().collect()
    }

    pub fn lamps(&self) -> [bool; COLUMNS] {
        self.lock().lamps
    }

    pub fn lit_lamps(&self) -> usize {
        self.lock().lamps.iter().filter(|l| **l).count()
    }
}

impl InputSurface for VirtualSurface {
    fn button(&self) -> bool {
        self.lock().button
    }

    fn switches(&self) -> [bool; COLUMNS] {
        self.lock().switches
    }

    fn set_cell(&mut self, index: usize, ch: char) {
        if let Some(c) = self.lock().cells.get_mut(index) {
            *c = ch;
        }
    }

    fn set_lamp(&mut self, index: usize, lit: bool) {
        if let Some(l) = self.lock().lamps.get_mut(index) {
            *l = lit;
        }
    }
}

// ---------------------------------------------------------------------------
// VirtualDisplay
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct DisplayState {
    current: Option<(String, Emphasis)>,
    history: Vec<String>,
}

/// A status display that remembers what it shows.
///
/// Messages shown with `log_to_console` are logged at `info` and kept in
/// [`history`](Self::history); countdown updates only replace the
/// current text.
#[derive(Debug, Clone, Default)]
pub struct VirtualDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl VirtualDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current text, or `None` after [`clear`](StatusDisplay::clear).
    pub fn text(&self) -> Option<String> {
        self.lock().current.as_ref().map(|(t, _)| t.clone())
    }

    pub fn emphasis(&self) -> Option<Emphasis> {
        self.lock().current.as_ref().map(|(_, e)| *e)
    }

    pub fn is_clear(&self) -> bool {
        self.lock().current.is_none()
    }

    /// Every logged message, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }
}

impl StatusDisplay for VirtualDisplay {
    fn show_message(&mut self, text: &str, emphasis: Emphasis, log_to_console: bool) {
        let mut state = self.lock();
        if log_to_console {
            tracing::info!(text, ?emphasis, "display");
            state.history.push(text.to_string());
        }
        state.current = Some((text.to_string(), emphasis));
    }

    fn clear(&mut self) {
        self.lock().current = None;
        tracing::debug!("display cleared");
    }
}
