//! Error types for the directory layer.

use muster_model::{ParticipantId, SessionCode, SessionId};

/// Verdicts a directory call can fail with.
///
/// The coordinator treats [`NotFound`](Self::NotFound) and
/// [`NotAuthorized`](Self::NotAuthorized) on a poll as definitive (the
/// membership is over) and everything else as transient.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The directory service could not be reached, or answered with a
    /// service fault rather than a verdict.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// No live session has this id. Expired sessions land here too: once
    /// the heartbeat window lapses, the directory forgets the record.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// No live session answers to this join code.
    #[error("no session for join code {0}")]
    UnknownCode(SessionCode),

    /// The caller may not perform this operation: a non-host attempting a
    /// host-only call, a non-member fetching a record, or a participant
    /// touching someone else's attributes.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The session is already at `max_participants`.
    #[error("session {0} is full")]
    CapacityExceeded(SessionId),

    /// The caller is already in the session's roster.
    #[error("participant {0} already joined")]
    AlreadyJoined(ParticipantId),

    /// The named participant is not in the session's roster.
    #[error("participant {0} not in session")]
    UnknownParticipant(ParticipantId),

    /// No public session has a free slot for quick join.
    #[error("no open public sessions to join")]
    NoOpenSessions,

    /// The request itself was invalid, such as a zero-capacity create.
    #[error("request rejected: {0}")]
    Rejected(String),
}
