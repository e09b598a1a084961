//! # Guesswork
//!
//! A serverless multiplayer number-guessing game for small devices that
//! share nothing but a publish/subscribe bus.
//!
//! Devices discover each other with broadcast messages, agree on a host
//! and a player order, and then play rounds: one player (the leader)
//! dials in a secret eight-digit number on eight switches while the
//! others dial in their guesses, all within a 25 second window.
//!
//! This crate ties the layers together into a [`Node`]:
//! transport → protocol → discovery → round engine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use guesswork::prelude::*;
//!
//! # async fn demo() -> Result<(), GuessworkError> {
//! let broker = MemoryBroker::new();
//! let mut node = NodeBuilder::new()
//!     .base_topic("demo/game")
//!     .build(broker.client(), VirtualSurface::new(), VirtualDisplay::new());
//! node.run(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod config;
mod error;
mod node;
pub mod prompts;
mod virtual_io;

pub use config::{DEFAULT_BASE_TOPIC, DEFAULT_BROKER, NodeBuilder, NodeConfig};
pub use error::GuessworkError;
pub use node::{GameCore, Node};
pub use virtual_io::{VirtualDisplay, VirtualSurface};

/// Re-exports of everything needed to run and drive a node.
pub mod prelude {
    pub use crate::{
        GameCore, GuessworkError, Node, NodeBuilder, NodeConfig, VirtualDisplay, VirtualSurface,
    };

    pub use guesswork_discovery::{DiscoverRole, Roster};
    pub use guesswork_protocol::{Envelope, JsonCodec, Message, MessageCodec, SessionId, Topic};
    pub use guesswork_round::{
        COLUMNS, Emphasis, GameState, InputSurface, LeaderSelection, RoundConfig, RoundError,
        StatusDisplay,
    };
    pub use guesswork_transport::{Bus, BusMessage, MemoryBroker, MemoryBus, TransportError};
    #[cfg(feature = "websocket")]
    pub use guesswork_transport::{BusRelay, WebSocketBus};
}
