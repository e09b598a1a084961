//! Core protocol types: identities, topics, and messages.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Largest number that fits in the eight digit columns.
pub const MAX_GUESS: u32 = 99_999_999;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifies one device for the lifetime of its process.
///
/// Generated once at start-up and never reused across runs. Serializes as
/// a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh identity: 32 lowercase hex characters (128 random bits).
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Wraps an existing identity string, e.g. one read off the bus.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// The topic suffixes the game uses, relative to the base prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    DiscoverFind,
    DiscoverAck,
    GameRoles,
    GameGuess,
    GameNewRound,
}

impl Topic {
    /// Every topic, in protocol order.
    pub const ALL: [Topic; 5] = [
        Topic::DiscoverFind,
        Topic::DiscoverAck,
        Topic::GameRoles,
        Topic::GameGuess,
        Topic::GameNewRound,
    ];

    /// The suffix appended to the base prefix.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::DiscoverFind => "discover/find",
            Self::DiscoverAck => "discover/ack",
            Self::GameRoles => "game/roles",
            Self::GameGuess => "game/guess",
            Self::GameNewRound => "game/new_round",
        }
    }

    /// Looks a suffix up. Unknown suffixes return `None`.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.suffix() == suffix)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// What a device can say on the bus. The sender identity travels in the
/// surrounding [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// "I'm here, who is hosting?"
    Find,
    /// Host's full roster snapshot, index 0 is the host.
    Ack { roster: Vec<SessionId> },
    /// Host starts a round.
    Roles {
        leader: SessionId,
        guessers: Vec<SessionId>,
    },
    /// A guesser's entered number.
    Guess { guess: u32 },
    /// A leader that is not the host asks the host for the next round.
    NewRound,
}

impl Message {
    /// The topic this message is published on.
    pub fn topic(&self) -> Topic {
        match self {
            Self::Find => Topic::DiscoverFind,
            Self::Ack { .. } => Topic::DiscoverAck,
            Self::Roles { .. } => Topic::GameRoles,
            Self::Guess { .. } => Topic::GameGuess,
            Self::NewRound => Topic::GameNewRound,
        }
    }
}

/// A message together with the identity of the device that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub identity: SessionId,
    pub message: Message,
}

impl Envelope {
    pub fn new(identity: SessionId, message: Message) -> Self {
        Self { identity, message }
    }
}
