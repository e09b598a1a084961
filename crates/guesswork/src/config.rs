//! Node configuration and builder.

use std::time::Duration;

use guesswork_protocol::{MessageCodec, SessionId};
use guesswork_round::{InputSurface, LeaderSelection, RoundConfig, StatusDisplay};
use guesswork_transport::Bus;

use crate::Node;

/// Relay address the devices share unless told otherwise. A
/// [`BusRelay`](guesswork_transport::BusRelay) bound here serves them.
pub const DEFAULT_BROKER: &str = "127.0.0.1:1883";

/// Topic namespace for one game. One game per namespace.
pub const DEFAULT_BASE_TOPIC: &str = "BAAA-ITTek/2020/1st-semester/project2/group3/";

/// Settings for a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// Address handed to [`Bus::connect`].
    pub broker_address: String,

    /// Prefix for every game topic. Normalised to end in `/`.
    pub base_topic: String,

    /// Button poll period while no capture phase is running.
    pub idle_poll: Duration,

    pub round: RoundConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            broker_address: DEFAULT_BROKER.to_string(),
            base_topic: DEFAULT_BASE_TOPIC.to_string(),
            idle_poll: Duration::from_millis(100),
            round: RoundConfig::default(),
        }
    }
}

/// Builder for a [`Node`].
///
/// # Example
///
/// ```rust,ignore
/// let node = NodeBuilder::new()
///     .broker("127.0.0.1:1883")
///     .leader_selection(LeaderSelection::FirstSlot)
///     .build(bus, surface, display);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodeBuilder {
    config: NodeConfig,
    identity: Option<SessionId>,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing config.
    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn broker(mut self, address: impl Into<String>) -> Self {
        self.config.broker_address = address.into();
        self
    }

    pub fn base_topic(mut self, base: impl Into<String>) -> Self {
        self.config.base_topic = base.into();
        self
    }

    pub fn idle_poll(mut self, period: Duration) -> Self {
        self.config.idle_poll = period;
        self
    }

    pub fn round_config(mut self, round: RoundConfig) -> Self {
        self.config.round = round;
        self
    }

    pub fn capture_duration(mut self, duration: Duration) -> Self {
        self.config.round.capture_duration = duration;
        self
    }

    pub fn leader_selection(mut self, selection: LeaderSelection) -> Self {
        self.config.round.leader_selection = selection;
        self
    }

    /// Fixes the session identity. Without this a fresh one is generated.
    pub fn identity(mut self, identity: SessionId) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Builds the node around its bus, surface, and display.
    pub fn build<B, S, D>(self, bus: B, surface: S, display: D) -> Node<B, S, D>
    where
        B: Bus,
        S: InputSurface,
        D: StatusDisplay,
    {
        let identity = self.identity.unwrap_or_else(SessionId::generate);
        let codec = MessageCodec::json(identity, self.config.base_topic.as_str());
        let mut config = self.config;
        config.base_topic = codec.base_topic().to_string();
        Node::new(config, codec, bus, surface, display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_config_default() {
        let config = NodeConfig::default();
        assert_eq!(config.broker_address, DEFAULT_BROKER);
        assert!(config.base_topic.ends_with("group3/"));
        assert_eq!(config.idle_poll, Duration::from_millis(100));
        assert_eq!(config.round.capture_duration, Duration::from_secs(25));
    }

    #[test]
    fn test_default_broker_is_a_local_relay_address() {
        let addr: std::net::SocketAddr = NodeConfig::default()
            .broker_address
            .parse()
            .expect("default broker should be a socket address");
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 1883);
    }

    #[test]
    fn test_builder_setters() {
        let b = NodeBuilder::new()
            .broker("localhost:9001")
            .base_topic("games/x")
            .capture_duration(Duration::from_secs(5))
            .leader_selection(LeaderSelection::FirstSlot);
        assert_eq!(b.config.broker_address, "localhost:9001");
        assert_eq!(b.config.base_topic, "games/x");
        assert_eq!(b.config.round.capture_duration, Duration::from_secs(5));
        assert_eq!(b.config.round.leader_selection, LeaderSelection::FirstSlot);
        assert!(b.identity.is_none());
    }
}
