//! The discovery role state machine.

use std::fmt;

/// Which side of discovery this device ended up on.
///
/// ```text
///            ┌──(find)──→ Host ──(find)──┐
/// Unknown ───┤              ↑____________┘
///            └──(ack)───→ Client ─(ack)──┐
///                           ↑____________┘
/// ```
///
/// The first applicable message wins. There is no path back to `Unknown`
/// and no path between `Host` and `Client`: the transition functions
/// return `None` for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoverRole {
    #[default]
    Unknown,
    Host,
    Client,
}

impl DiscoverRole {
    /// Role after hearing a peer's `discover/find`, or `None` if a find
    /// does not apply in this role.
    pub fn on_find(self) -> Option<Self> {
        match self {
            Self::Unknown | Self::Host => Some(Self::Host),
            Self::Client => None,
        }
    }

    /// Role after hearing a host's `discover/ack`, or `None` if an ack
    /// does not apply in this role.
    pub fn on_ack(self) -> Option<Self> {
        match self {
            Self::Unknown | Self::Client => Some(Self::Client),
            Self::Host => None,
        }
    }

    pub fn is_host(self) -> bool {
        matches!(self, Self::Host)
    }

    pub fn is_client(self) -> bool {
        matches!(self, Self::Client)
    }

    /// `true` once the device is either Host or Client.
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for DiscoverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Host => write!(f, "Host"),
            Self::Client => write!(f, "Client"),
        }
    }
}
