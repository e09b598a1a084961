//! Peer discovery and host/client role negotiation for Guesswork.
//!
//! Devices find each other with nothing but broadcasts:
//!
//! 1. Every device announces itself with `discover/find`.
//! 2. The first device to hear a find (while still undecided) becomes the
//!    **Host**, adds the sender to its roster and answers with
//!    `discover/ack` carrying the whole roster.
//! 3. A device that hears an ack first becomes a **Client** and takes the
//!    host's roster verbatim. Later acks replace it again.
//!
//! # How it fits in the stack
//!
//! ```text
//! Node runtime (above)     ← feeds decoded find/ack messages in
//!     ↕
//! Discovery (this crate)   ← owns DiscoverRole and the Roster
//!     ↕
//! Protocol (below)         ← provides SessionId
//! ```
//!
//! This is best-effort. Two devices that both decide to host at the same
//! instant will each keep their own roster; nothing here detects that.

mod discovery;
mod role;
mod roster;

pub use discovery::{ClientUpdate, Discovery, HostReply};
pub use role::DiscoverRole;
pub use roster::Roster;
