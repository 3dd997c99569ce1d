use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique id for one participant in one room visit.
///
/// Display names are not unique, so signaling self-echo is filtered by this
/// id rather than by username (username comparison is kept only as a
/// fallback for peers that do not send one).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who the local client is inside a room: the display name reported by the
/// auth service plus a fresh per-session participant id.
#[derive(Debug, Clone)]
pub struct Identity {
    pub username: String,
    pub participant: ParticipantId,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            participant: ParticipantId::new(),
        }
    }
}
