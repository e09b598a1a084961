//! The ordered player roster.

use guesswork_protocol::SessionId;

/// Ordered, duplicate-free list of participants. Index 0 is the host
/// (player 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    members: Vec<SessionId>,
}

impl Roster {
    /// A roster holding only the local device.
    pub fn new(local: SessionId) -> Self {
        Self {
            members: vec![local],
        }
    }

    /// Appends `id` unless already present. Returns `true` if it was added.
    pub fn insert(&mut self, id: SessionId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.push(id);
        true
    }

    /// Replaces the whole roster with a snapshot, keeping the first
    /// occurrence of any repeated identity.
    pub fn replace(&mut self, snapshot: Vec<SessionId>) {
        self.members.clear();
        for id in snapshot {
            self.insert(id);
        }
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.members.contains(id)
    }

    /// Zero-based slot of `id`.
    pub fn position(&self, id: &SessionId) -> Option<usize> {
        self.members.iter().position(|m| m == id)
    }

    /// One-based player number as shown to people.
    pub fn player_number(&self, id: &SessionId) -> Option<usize> {
        self.position(id).map(|p| p + 1)
    }

    pub fn host(&self) -> Option<&SessionId> {
        self.members.first()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn as_slice(&self) -> &[SessionId] {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionId> {
        self.members.iter()
    }

    pub fn to_vec(&self) -> Vec<SessionId> {
        self.members.clone()
    }
}
