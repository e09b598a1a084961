//! Bus topics, message payloads, and codecs for Guesswork.
//!
//! Every device speaks the same small vocabulary over the bus:
//!
//! | Topic suffix      | Payload fields              |
//! |-------------------|-----------------------------|
//! | `discover/find`   | identity                    |
//! | `discover/ack`    | identity, roster            |
//! | `game/roles`      | identity, leader, guessers  |
//! | `game/guess`      | identity, guess             |
//! | `game/new_round`  | identity                    |
//!
//! Topics live under a shared base prefix. [`MessageCodec`] adds and strips
//! that prefix and stamps outbound messages with the local [`SessionId`].
//!
//! # Feature Flags
//!
//! - `json` (default): [`JsonCodec`] via `serde_json`

mod codec;
mod error;
mod types;

pub use codec::{Codec, MessageCodec};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Envelope, MAX_GUESS, Message, SessionId, Topic};
