//! Identifier and metadata primitives.
//!
//! Every identifier in the lobby stack is an opaque string assigned by an
//! external service. We wrap each one in a newtype so a `SessionId` can never
//! be passed where a `ParticipantId` is expected, even though both are
//! strings underneath.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a session record.
///
/// Assigned by the directory service at creation and immutable afterwards.
/// The contents are opaque; nothing in this stack parses them.
///
/// `#[serde(transparent)]` serializes the wrapper as its inner string, so a
/// `SessionId` appears in JSON as `"a1b2..."`, not `{ "0": "a1b2..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A short human-shareable code that resolves to a [`SessionId`].
///
/// This is what a host reads out loud so friends can join. Immutable for the
/// lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(pub String);

impl SessionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for a participant.
///
/// Supplied by the identity service, stable for the participant's connection
/// lifetime, and unique within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Who can read a metadata entry.
///
/// The directory service redacts entries according to this level when it
/// answers queries from processes that are not members of the session.
///
/// `#[serde(rename_all = "PascalCase")]` keeps the JSON names aligned with
/// the directory service's own vocabulary (`"Public"`, `"Member"`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "PascalCase")]
pub enum Visibility {
    /// Readable by anyone, including non-members browsing the session list.
    #[default]
    Public,

    /// Readable only by current members of the session.
    Member,
}

/// A metadata value paired with its visibility level.
///
/// Session metadata and participant attributes are both maps from a string
/// key to one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub value: String,
    pub visibility: Visibility,
}

impl MetadataValue {
    /// A value visible to anyone.
    pub fn public(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            visibility: Visibility::Public,
        }
    }

    /// A value visible to session members only.
    pub fn member(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            visibility: Visibility::Member,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Identifier newtypes
    // =====================================================================

    #[test]
    fn test_session_id_serializes_transparently() {
        let id = SessionId::new("3f9c");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""3f9c""#);
    }

    #[test]
    fn test_participant_id_deserializes_from_bare_string() {
        let id: ParticipantId = serde_json::from_str(r#""p-alice""#).unwrap();
        assert_eq!(id, ParticipantId::new("p-alice"));
    }

    #[test]
    fn test_session_code_display_prints_inner_value() {
        let code = SessionCode::new("QX7R2M");
        assert_eq!(code.to_string(), "QX7R2M");
    }

    // =====================================================================
    // Visibility and metadata values
    // =====================================================================

    #[test]
    fn test_visibility_serializes_pascal_case() {
        assert_eq!(
            serde_json::to_string(&Visibility::Public).unwrap(),
            r#""Public""#
        );
        assert_eq!(
            serde_json::to_string(&Visibility::Member).unwrap(),
            r#""Member""#
        );
    }

    #[test]
    fn test_visibility_defaults_to_public() {
        assert_eq!(Visibility::default(), Visibility::Public);
    }

    #[test]
    fn test_metadata_value_round_trip() {
        let v = MetadataValue::member("de_dust2");
        let bytes = serde_json::to_vec(&v).unwrap();
        let decoded: MetadataValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn test_metadata_value_constructors_set_visibility() {
        assert_eq!(
            MetadataValue::public("x").visibility,
            Visibility::Public
        );
        assert_eq!(
            MetadataValue::member("x").visibility,
            Visibility::Member
        );
    }

    #[test]
    fn test_metadata_value_rejects_unknown_visibility() {
        let wrong = r#"{"value": "x", "visibility": "Secret"}"#;
        let result: Result<MetadataValue, _> = serde_json::from_str(wrong);
        assert!(result.is_err());
    }
}
