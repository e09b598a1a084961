//! Unified error type for Guesswork.

use guesswork_protocol::ProtocolError;
use guesswork_round::RoundError;
use guesswork_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors. Only
/// [`GuessworkError::Transport`] ends a node's run; the others are
/// logged and dropped by the event loop.
#[derive(Debug, thiserror::Error)]
pub enum GuessworkError {
    /// Bus failure: connect, publish, or a lost connection.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A local action the round engine refused.
    #[error(transparent)]
    Round(#[from] RoundError),
}

impl GuessworkError {
    /// `true` for errors that must end the node's run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
