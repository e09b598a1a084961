//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding bus messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload parsed but breaks a protocol rule, e.g. a guess with
    /// more than eight digits or a leader listed among the guessers.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
