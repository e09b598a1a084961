//! The discovery aggregate: local identity, role, and roster together.

use guesswork_protocol::SessionId;

use crate::{DiscoverRole, Roster};

/// What the host should broadcast after handling a `discover/find`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReply {
    /// Full roster to send in `discover/ack`.
    pub roster: Vec<SessionId>,
    /// `true` if the sender was not on the roster before.
    pub joined: bool,
    /// `true` if this find is what made the device host.
    pub became_host: bool,
}

/// Result of accepting a host's roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientUpdate {
    /// Local one-based player number in the new roster.
    pub player_number: usize,
    /// Number of players in the new roster.
    pub roster_len: usize,
    /// `true` if this ack is what made the device a client.
    pub became_client: bool,
}

/// Tracks this device's discovery role and the roster it believes in.
///
/// Invariant: once the role is settled, the local identity is on the
/// roster exactly once.
#[derive(Debug, Clone)]
pub struct Discovery {
    identity: SessionId,
    role: DiscoverRole,
    roster: Roster,
}

impl Discovery {
    /// Starts undecided with a roster of one (ourselves).
    pub fn new(identity: SessionId) -> Self {
        Self {
            roster: Roster::new(identity.clone()),
            identity,
            role: DiscoverRole::Unknown,
        }
    }

    pub fn identity(&self) -> &SessionId {
        &self.identity
    }

    pub fn role(&self) -> DiscoverRole {
        self.role
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn is_host(&self) -> bool {
        self.role.is_host()
    }

    /// Handles a peer's `discover/find`.
    ///
    /// Returns the ack to broadcast, or `None` if the find does not apply
    /// (we are a client, or it is our own message).
    pub fn on_find(&mut self, sender: &SessionId) -> Option<HostReply> {
        if *sender == self.identity {
            return None;
        }
        let Some(next) = self.role.on_find() else {
            tracing::debug!(%sender, role = %self.role, "ignoring find");
            return None;
        };

        let became_host = self.role != next;
        self.role = next;
        let joined = self.roster.insert(sender.clone());

        if became_host {
            tracing::info!(identity = %self.identity, "became host");
        }
        if joined {
            tracing::info!(
                player = %sender,
                players = self.roster.len(),
                "player joined roster"
            );
        }

        Some(HostReply {
            roster: self.roster.to_vec(),
            joined,
            became_host,
        })
    }

    /// Handles a host's `discover/ack` carrying `snapshot`.
    ///
    /// The snapshot replaces the local roster wholesale. If the host has not
    /// listed us yet (its ack answered someone else's find), we append
    /// ourselves until the next ack arrives.
    pub fn on_ack(&mut self, sender: &SessionId, snapshot: Vec<SessionId>) -> Option<ClientUpdate> {
        if *sender == self.identity {
            return None;
        }
        let Some(next) = self.role.on_ack() else {
            tracing::debug!(%sender, role = %self.role, "ignoring ack");
            return None;
        };

        let became_client = self.role != next;
        self.role = next;
        self.roster.replace(snapshot);
        if !self.roster.contains(&self.identity) {
            tracing::debug!(host = %sender, "host roster does not list us yet");
            self.roster.insert(self.identity.clone());
        }

        let player_number = self
            .roster
            .player_number(&self.identity)
            .unwrap_or(self.roster.len());

        if became_client {
            tracing::info!(identity = %self.identity, host = %sender, "became client");
        }
        tracing::debug!(players = self.roster.len(), player_number, "roster replaced");

        Some(ClientUpdate {
            player_number,
            roster_len: self.roster.len(),
            became_client,
        })
    }
}
