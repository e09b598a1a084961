//! Publish/subscribe bus abstraction for Guesswork.
//!
//! Devices never address each other. Everything travels over a shared
//! [`Bus`]: publish bytes on a topic, receive whatever matches your
//! subscriptions. Inbound messages are funnelled into one [`Inbound`]
//! channel so a single task can own all state that reacts to them.
//!
//! # Implementations
//!
//! - [`MemoryBus`]: in-process broker for tests and simulation
//! - [`WebSocketBus`] / [`BusRelay`]: a small relay broker and its client
//!
//! # Feature Flags
//!
//! - `websocket` (default): relay broker and client via `tokio-tungstenite`

mod error;
mod memory;
mod topic;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryBroker, MemoryBus};
pub use topic::topic_matches;
#[cfg(feature = "websocket")]
pub use websocket::{BusFrame, BusRelay, WebSocketBus};

use std::future::Future;

use tokio::sync::mpsc;

/// A single message delivered by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Full topic the message was published on.
    pub topic: String,
    /// Raw payload bytes, opaque to the transport.
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Creates a message from a topic and payload.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Receiving side of a bus connection.
///
/// The transport feeds it; exactly one consumer drains it. The channel
/// closes when the connection is lost or [`Bus::disconnect`] is called.
pub type Inbound = mpsc::UnboundedReceiver<BusMessage>;

/// A publish/subscribe client.
///
/// Writes are fire-and-forget: a successful `publish` means the message
/// left this process, nothing more. There is no delivery guarantee.
pub trait Bus: Send + Sync + 'static {
    /// Connects to the broker at `address` and returns the inbound channel.
    fn connect(
        &mut self,
        address: &str,
    ) -> impl Future<Output = Result<Inbound, TransportError>> + Send;

    /// Subscribes to a topic pattern (`+` and `#` wildcards).
    ///
    /// With `no_local` set, the broker should not echo this client's own
    /// publishes back to it. Not every broker honors that, so receivers
    /// must still filter their own messages.
    fn subscribe(
        &self,
        pattern: &str,
        no_local: bool,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Publishes `payload` on `topic`.
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Disconnects and waits for any background activity to finish.
    ///
    /// Safe to call more than once.
    fn disconnect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}
