//! Session and participant records.
//!
//! A [`SessionRecord`] is this process's cached mirror of a session held by
//! the directory service. The directory is the sole source of truth; a record
//! in local hands is a best-effort snapshot from the last successful call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{MetadataValue, ParticipantId, SessionCode, SessionId};

/// Well-known metadata and attribute keys.
///
/// The directory service stores arbitrary string keys; these are the ones
/// this stack reads and writes.
pub mod keys {
    /// Session metadata: the selected game mode.
    pub const GAME_MODE: &str = "gameMode";
    /// Session metadata: the selected map.
    pub const MAP: &str = "map";
    /// Session metadata: `"0"` while waiting, a relay join code once the
    /// host starts the game.
    pub const START_MARKER: &str = "startMarker";
    /// Participant attribute: the name shown in the roster.
    pub const DISPLAY_NAME: &str = "displayName";
}

/// The `startMarker` value meaning "still waiting for the host to start".
///
/// Any other value is a relay join code. The transition away from this value
/// is one-way for a given session instance.
pub const START_MARKER_WAITING: &str = "0";

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// One member of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    /// Attribute map; known key [`keys::DISPLAY_NAME`].
    pub attributes: BTreeMap<String, MetadataValue>,
}

impl Participant {
    /// Builds a participant carrying only a display name.
    ///
    /// Display names use member visibility: the roster is for people already
    /// in the session, not for browsers of the public list.
    pub fn named(
        id: ParticipantId,
        display_name: impl Into<String>,
    ) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            keys::DISPLAY_NAME.to_string(),
            MetadataValue::member(display_name),
        );
        Self { id, attributes }
    }

    /// The display name, if one is set.
    pub fn display_name(&self) -> Option<&str> {
        self.attributes
            .get(keys::DISPLAY_NAME)
            .map(|v| v.value.as_str())
    }
}

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

/// Cached mirror of a session record held by the directory service.
///
/// - `id` and `join_code` are assigned at creation and immutable.
/// - `host_id` changes only through an explicit host migration (initiated by
///   the host, or performed by the directory when a host leaves).
/// - `participants` is ordered by server-assigned join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    /// Human-readable session name supplied at creation.
    pub name: String,
    pub join_code: SessionCode,
    pub host_id: ParticipantId,
    pub max_participants: usize,
    /// Private sessions are excluded from queries and quick join.
    pub private: bool,
    /// Session metadata; known keys in [`keys`].
    pub metadata: BTreeMap<String, MetadataValue>,
    pub participants: Vec<Participant>,
}

impl SessionRecord {
    /// Seats still open.
    pub fn available_slots(&self) -> usize {
        self.max_participants.saturating_sub(self.participants.len())
    }

    pub fn is_full(&self) -> bool {
        self.available_slots() == 0
    }

    /// Whether `id` is the current host according to this snapshot.
    pub fn is_host(&self, id: &ParticipantId) -> bool {
        &self.host_id == id
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.iter().any(|p| &p.id == id)
    }

    /// Participant at a server-assigned join-order position.
    pub fn participant_at(&self, index: usize) -> Option<&Participant> {
        self.participants.get(index)
    }

    /// Raw metadata value for `key`, regardless of visibility.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|v| v.value.as_str())
    }

    pub fn game_mode(&self) -> Option<&str> {
        self.metadata_value(keys::GAME_MODE)
    }

    pub fn map_name(&self) -> Option<&str> {
        self.metadata_value(keys::MAP)
    }

    /// The relay join code written by the host's start, if the game has
    /// started. `None` while the marker is absent or still
    /// [`START_MARKER_WAITING`].
    pub fn start_marker(&self) -> Option<&str> {
        match self.metadata_value(keys::START_MARKER) {
            Some(START_MARKER_WAITING) | None => None,
            Some(code) => Some(code),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
