//! Round configuration, roles, and the game state machine.

use std::fmt;
use std::time::Duration;

use guesswork_protocol::SessionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoundConfig
// ---------------------------------------------------------------------------

/// How the host picks a leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LeaderSelection {
    /// Uniformly random over the whole roster.
    #[default]
    Random,
    /// Always roster slot 0, i.e. the host. Deterministic; handy for tests.
    FirstSlot,
}

/// Timing and selection settings for rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Length of the number-entry phase.
    pub capture_duration: Duration,

    /// Auto-repeat interval while a switch is held.
    pub repeat_interval: Duration,

    /// Poll period during the capture phase.
    pub tick_period: Duration,

    pub leader_selection: LeaderSelection,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            capture_duration: Duration::from_secs(25),
            repeat_interval: Duration::from_millis(300),
            tick_period: Duration::from_millis(10),
            leader_selection: LeaderSelection::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// RoundRoles
// ---------------------------------------------------------------------------

/// Who leads and who guesses, for exactly one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRoles {
    pub leader: SessionId,
    pub guessers: Vec<SessionId>,
}

impl RoundRoles {
    pub fn new(leader: SessionId, guessers: Vec<SessionId>) -> Self {
        Self { leader, guessers }
    }

    /// Derives roles from a roster: everyone but the leader guesses, in
    /// roster order.
    pub fn from_roster(leader: SessionId, roster: &[SessionId]) -> Self {
        let guessers = roster.iter().filter(|id| **id != leader).cloned().collect();
        Self { leader, guessers }
    }

    /// The state `identity` plays in this round.
    pub fn state_for(&self, identity: &SessionId) -> GameState {
        if *identity == self.leader {
            GameState::Leader
        } else {
            GameState::Guesser
        }
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The local device's part in the game.
///
/// ```text
/// Discovering ──(roles)──→ Leader | Guesser ──(roles)──→ Leader | Guesser
/// ```
///
/// There is no way back to `Discovering`: each new round overwrites the
/// state from the roles it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Discovering,
    Leader,
    Guesser,
}

impl GameState {
    /// State after a `game/roles` message. Valid from every state.
    pub fn on_roles(self, roles: &RoundRoles, local: &SessionId) -> Self {
        roles.state_for(local)
    }

    /// `true` while still looking for players (no round has started).
    pub fn is_discovering(self) -> bool {
        matches!(self, Self::Discovering)
    }

    /// `true` once a round has assigned a role.
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Leader | Self::Guesser)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovering => write!(f, "Discovering"),
            Self::Leader => write!(f, "Leader"),
            Self::Guesser => write!(f, "Guesser"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> SessionId {
        SessionId::new(s)
    }

    #[test]
    fn test_round_config_default() {
        let config = RoundConfig::default();
        assert_eq!(config.capture_duration, Duration::from_secs(25));
        assert_eq!(config.repeat_interval, Duration::from_millis(300));
        assert_eq!(config.tick_period, Duration::from_millis(10));
        assert_eq!(config.leader_selection, LeaderSelection::Random);
    }

    #[test]
    fn test_roles_from_roster_excludes_leader_in_order() {
        let roster = [sid("b"), sid("a"), sid("c")];
        let roles = RoundRoles::from_roster(sid("a"), &roster);
        assert_eq!(roles.guessers, vec![sid("b"), sid("c")]);
    }

    #[test]
    fn test_game_state_on_roles_picks_leader_or_guesser() {
        let roles = RoundRoles::new(sid("b"), vec![sid("a")]);
        assert_eq!(GameState::Discovering.on_roles(&roles, &sid("b")), GameState::Leader);
        assert_eq!(GameState::Discovering.on_roles(&roles, &sid("a")), GameState::Guesser);
        // A new round overwrites, it does not pass through Discovering.
        assert_eq!(GameState::Leader.on_roles(&roles, &sid("a")), GameState::Guesser);
    }

    #[test]
    fn test_game_state_predicates() {
        assert!(GameState::Discovering.is_discovering());
        assert!(!GameState::Discovering.is_playing());
        assert!(GameState::Leader.is_playing());
        assert!(GameState::Guesser.is_playing());
    }

    #[test]
    fn test_game_state_display() {
        assert_eq!(GameState::Leader.to_string(), "Leader");
    }
}
