//! The leader's per-round guess map.

use std::collections::HashMap;

use guesswork_protocol::SessionId;

/// Guesses received this round, keyed by sender. A repeat guess from the
/// same identity overwrites the earlier one.
#[derive(Debug, Clone, Default)]
pub struct GuessCollection {
    guesses: HashMap<SessionId, u32>,
}

impl GuessCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a guess. Returns the value it replaced, if any.
    pub fn insert(&mut self, from: SessionId, guess: u32) -> Option<u32> {
        self.guesses.insert(from, guess)
    }

    pub fn get(&self, from: &SessionId) -> Option<u32> {
        self.guesses.get(from).copied()
    }

    pub fn len(&self) -> usize {
        self.guesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guesses.is_empty()
    }

    pub fn clear(&mut self) {
        self.guesses.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SessionId, u32)> {
        self.guesses.iter().map(|(id, g)| (id, *g))
    }
}

/// Result of handing a `game/guess` to the round engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Not the leader, or this round's guessing is already complete.
    Ignored,
    /// Stored; still waiting on other guessers.
    Recorded { received: usize, expected: usize },
    /// Every non-leader has guessed. The next round should start.
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_guess_overwrites_without_growing() {
        let mut g = GuessCollection::new();
        assert_eq!(g.insert(SessionId::new("a"), 1), None);
        assert_eq!(g.insert(SessionId::new("a"), 2), Some(1));
        assert_eq!(g.len(), 1);
        assert_eq!(g.get(&SessionId::new("a")), Some(2));
    }

    #[test]
    fn test_clear_empties() {
        let mut g = GuessCollection::new();
        g.insert(SessionId::new("a"), 1);
        g.clear();
        assert!(g.is_empty());
    }
}
