//! Codecs for bus payloads.
//!
//! [`Codec`] turns serde types into bytes and back; [`JsonCodec`] is the
//! format every device on the bus uses. [`MessageCodec`] sits on top and
//! maps [`Envelope`]s to `(topic, bytes)` pairs under the base prefix.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Envelope, MAX_GUESS, Message, ProtocolError, SessionId, Topic};

/// A codec that can encode Rust types to bytes and decode bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use guesswork_protocol::{Codec, JsonCodec, SessionId};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&SessionId::new("abc")).unwrap();
/// let back: SessionId = codec.decode(&bytes).unwrap();
/// assert_eq!(back.as_str(), "abc");
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Wire bodies, one per topic
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct IdentityBody {
    identity: SessionId,
}

#[derive(Serialize, Deserialize)]
struct AckBody {
    identity: SessionId,
    roster: Vec<SessionId>,
}

#[derive(Serialize, Deserialize)]
struct RolesBody {
    identity: SessionId,
    leader: SessionId,
    guessers: Vec<SessionId>,
}

#[derive(Serialize, Deserialize)]
struct GuessBody {
    identity: SessionId,
    guess: u32,
}

// ---------------------------------------------------------------------------
// MessageCodec
// ---------------------------------------------------------------------------

/// Maps [`Envelope`]s to and from full bus topics and payload bytes.
///
/// Owns the local identity so that every outbound message is tagged with
/// it, and the base prefix so callers only ever deal in [`Topic`]s.
#[derive(Debug, Clone)]
pub struct MessageCodec<C: Codec> {
    identity: SessionId,
    base_topic: String,
    codec: C,
}

#[cfg(feature = "json")]
impl MessageCodec<JsonCodec> {
    /// A JSON message codec for `identity` under `base_topic`.
    pub fn json(identity: SessionId, base_topic: impl Into<String>) -> Self {
        Self::new(identity, base_topic, JsonCodec)
    }
}

impl<C: Codec> MessageCodec<C> {
    /// Creates a message codec. A missing trailing `/` on the base topic
    /// is added.
    pub fn new(identity: SessionId, base_topic: impl Into<String>, codec: C) -> Self {
        let mut base_topic = base_topic.into();
        if !base_topic.is_empty() && !base_topic.ends_with('/') {
            base_topic.push('/');
        }
        Self {
            identity,
            base_topic,
            codec,
        }
    }

    /// The local identity stamped on outbound messages.
    pub fn identity(&self) -> &SessionId {
        &self.identity
    }

    /// The base prefix, always ending in `/` unless empty.
    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    /// The subscription pattern that covers every game topic.
    pub fn subscription(&self) -> String {
        format!("{}#", self.base_topic)
    }

    /// Full topic string for a suffix.
    pub fn topic(&self, topic: Topic) -> String {
        format!("{}{}", self.base_topic, topic.suffix())
    }

    /// Encodes a message from the local identity.
    ///
    /// Returns the full topic and the payload bytes.
    pub fn encode(&self, message: &Message) -> Result<(String, Vec<u8>), ProtocolError> {
        let identity = self.identity.clone();
        let bytes = match message {
            Message::Find | Message::NewRound => self.codec.encode(&IdentityBody { identity })?,
            Message::Ack { roster } => self.codec.encode(&AckBody {
                identity,
                roster: roster.clone(),
            })?,
            Message::Roles { leader, guessers } => self.codec.encode(&RolesBody {
                identity,
                leader: leader.clone(),
                guessers: guessers.clone(),
            })?,
            Message::Guess { guess } => {
                check_guess(*guess)?;
                self.codec.encode(&GuessBody {
                    identity,
                    guess: *guess,
                })?
            }
        };
        Ok((self.topic(message.topic()), bytes))
    }

    /// Decodes an inbound bus message.
    ///
    /// Returns `Ok(None)` when the topic is outside the base prefix or is
    /// not one of ours; such messages are simply not addressed to the game.
    ///
    /// # Errors
    /// Returns an error if the topic is known but the payload is malformed.
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<Option<Envelope>, ProtocolError> {
        let Some(suffix) = topic.strip_prefix(self.base_topic.as_str()) else {
            return Ok(None);
        };
        let Some(topic) = Topic::from_suffix(suffix) else {
            return Ok(None);
        };

        let envelope = match topic {
            Topic::DiscoverFind => {
                let body: IdentityBody = self.codec.decode(payload)?;
                Envelope::new(body.identity, Message::Find)
            }
            Topic::GameNewRound => {
                let body: IdentityBody = self.codec.decode(payload)?;
                Envelope::new(body.identity, Message::NewRound)
            }
            Topic::DiscoverAck => {
                let body: AckBody = self.codec.decode(payload)?;
                Envelope::new(body.identity, Message::Ack { roster: body.roster })
            }
            Topic::GameRoles => {
                let body: RolesBody = self.codec.decode(payload)?;
                if body.guessers.contains(&body.leader) {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "leader {} also listed as guesser",
                        body.leader
                    )));
                }
                Envelope::new(
                    body.identity,
                    Message::Roles {
                        leader: body.leader,
                        guessers: body.guessers,
                    },
                )
            }
            Topic::GameGuess => {
                let body: GuessBody = self.codec.decode(payload)?;
                check_guess(body.guess)?;
                Envelope::new(body.identity, Message::Guess { guess: body.guess })
            }
        };
        Ok(Some(envelope))
    }
}

fn check_guess(guess: u32) -> Result<(), ProtocolError> {
    if guess > MAX_GUESS {
        return Err(ProtocolError::InvalidMessage(format!(
            "guess {guess} has more than eight digits"
        )));
    }
    Ok(())
}
