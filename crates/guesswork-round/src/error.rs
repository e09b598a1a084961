//! Error types for the round layer.

/// Local actions the round engine refuses.
///
/// None of these are fatal: the node logs them and carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    /// Only the host may start a round.
    #[error("only the host can start a round")]
    NotHost,

    /// A round needs a leader and at least one guesser.
    #[error("need at least 2 players to start a round, have {players}")]
    RosterTooSmall { players: usize },

    /// The button does nothing once the game is under way.
    #[error("a round is already in progress")]
    RoundInProgress,
}
