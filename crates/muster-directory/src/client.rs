//! The directory client trait and its call options.
//!
//! A directory client speaks for exactly one participant: the identity the
//! process signed in with is part of the client, not of each call. That
//! mirrors how hosted directory services work. Authorization rides on the
//! connection, and the server judges every operation against it.

use std::collections::BTreeMap;

use muster_model::{
    MetadataValue, Participant, ParticipantId, SessionCode, SessionId,
    SessionRecord,
};

use crate::DirectoryError;

// ---------------------------------------------------------------------------
// Call options
// ---------------------------------------------------------------------------

/// Options for [`DirectoryClient::create_session`].
#[derive(Debug, Clone)]
pub struct CreateSessionOptions {
    /// The creating participant. Becomes the session's host and first
    /// roster entry. Must carry the caller's own id.
    pub host: Participant,
    /// Private sessions are invisible to queries and quick join; the join
    /// code still works.
    pub private: bool,
    /// Initial session metadata.
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl CreateSessionOptions {
    /// Public session with empty metadata.
    pub fn for_host(host: Participant) -> Self {
        Self {
            host,
            private: false,
            metadata: BTreeMap::new(),
        }
    }
}

/// Options for joining, by code or via quick join.
#[derive(Debug, Clone)]
pub struct JoinOptions {
    /// The joining participant. Must carry the caller's own id.
    pub participant: Participant,
}

/// Sort order for [`DirectoryClient::query_sessions`] results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
    /// Most recently created sessions first.
    #[default]
    NewestFirst,
    /// Oldest sessions first.
    OldestFirst,
}

/// A session query: filter, order, page size.
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    /// Maximum number of records to return. `None` means no limit.
    pub limit: Option<usize>,
    /// Only sessions with at least one available slot.
    pub only_open: bool,
    pub order: QueryOrder,
}

impl SessionQuery {
    /// The browse query the lobby UI shows: open public sessions, newest
    /// first, one small page.
    pub fn open_page(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            only_open: true,
            order: QueryOrder::NewestFirst,
        }
    }
}

/// Options for [`DirectoryClient::update_session`]. Host-only.
///
/// Both fields are partial: metadata entries merge into the existing map by
/// key, and `host_id` migrates hosting only when set.
#[derive(Debug, Clone, Default)]
pub struct UpdateSessionOptions {
    pub metadata: BTreeMap<String, MetadataValue>,
    pub host_id: Option<ParticipantId>,
}

impl UpdateSessionOptions {
    /// Update that writes a single metadata entry.
    pub fn set_metadata(key: impl Into<String>, value: MetadataValue) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(key.into(), value);
        Self {
            metadata,
            host_id: None,
        }
    }

    /// Update that migrates hosting to `new_host`.
    pub fn migrate_host(new_host: ParticipantId) -> Self {
        Self {
            metadata: BTreeMap::new(),
            host_id: Some(new_host),
        }
    }
}

/// Options for [`DirectoryClient::update_participant`]. Self-only.
///
/// Attribute entries merge into the participant's existing attributes by
/// key.
#[derive(Debug, Clone, Default)]
pub struct UpdateParticipantOptions {
    pub attributes: BTreeMap<String, MetadataValue>,
}

impl UpdateParticipantOptions {
    /// Update that writes a single attribute.
    pub fn set_attribute(key: impl Into<String>, value: MetadataValue) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(key.into(), value);
        Self { attributes }
    }
}

// ---------------------------------------------------------------------------
// The trait
// ---------------------------------------------------------------------------

/// One participant's view of the session directory service.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static`: the client is shared across async tasks for
///   the life of the coordinator.
/// - Every method returns a `Send` future: the coordinator spawns its
///   timer-driven calls onto the runtime so ticks never block on the
///   network.
///
/// # Error contract
///
/// Every method resolves to a [`DirectoryError`] verdict on failure, never
/// panics. Implementations map transport faults to
/// [`DirectoryError::Unavailable`] and let the other variants carry the
/// directory's own judgments.
pub trait DirectoryClient: Send + Sync + 'static {
    /// Creates a session with this client's participant as host.
    ///
    /// The directory assigns the session id and join code.
    fn create_session(
        &self,
        name: &str,
        max_participants: usize,
        options: CreateSessionOptions,
    ) -> impl std::future::Future<Output = Result<SessionRecord, DirectoryError>> + Send;

    /// Lists public sessions. Member-visibility metadata and attributes are
    /// redacted from the results.
    fn query_sessions(
        &self,
        query: SessionQuery,
    ) -> impl std::future::Future<Output = Result<Vec<SessionRecord>, DirectoryError>> + Send;

    /// Joins the session the code resolves to. Works for private sessions
    /// too; the code is the secret.
    fn join_by_code(
        &self,
        code: &SessionCode,
        options: JoinOptions,
    ) -> impl std::future::Future<Output = Result<SessionRecord, DirectoryError>> + Send;

    /// Joins some public session with a free slot, oldest first.
    fn quick_join(
        &self,
        options: JoinOptions,
    ) -> impl std::future::Future<Output = Result<SessionRecord, DirectoryError>> + Send;

    /// Fetches the current record. Members only.
    fn get_session(
        &self,
        id: &SessionId,
    ) -> impl std::future::Future<Output = Result<SessionRecord, DirectoryError>> + Send;

    /// Applies a partial session update. Host only.
    fn update_session(
        &self,
        id: &SessionId,
        options: UpdateSessionOptions,
    ) -> impl std::future::Future<Output = Result<SessionRecord, DirectoryError>> + Send;

    /// Applies a partial attribute update to one participant. A participant
    /// may only update itself.
    fn update_participant(
        &self,
        id: &SessionId,
        participant_id: &ParticipantId,
        options: UpdateParticipantOptions,
    ) -> impl std::future::Future<Output = Result<SessionRecord, DirectoryError>> + Send;

    /// Removes a participant: a leave when removing oneself, a kick when
    /// the host removes someone else.
    fn remove_participant(
        &self,
        id: &SessionId,
        participant_id: &ParticipantId,
    ) -> impl std::future::Future<Output = Result<(), DirectoryError>> + Send;

    /// Refreshes the session's expiry window. Host only; the response body
    /// carries nothing.
    fn send_heartbeat(
        &self,
        id: &SessionId,
    ) -> impl std::future::Future<Output = Result<(), DirectoryError>> + Send;

    /// Deletes the session outright. Host only.
    fn delete_session(
        &self,
        id: &SessionId,
    ) -> impl std::future::Future<Output = Result<(), DirectoryError>> + Send;
}
