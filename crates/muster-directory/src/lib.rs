//! Session directory client for Muster.
//!
//! The directory service is the source of truth for sessions: a remote
//! store that creates, queries, joins, updates, and deletes session records,
//! and expires any session whose host stops refreshing it. This crate
//! defines:
//!
//! 1. **The client trait** ([`DirectoryClient`]): every operation the
//!    lobby coordinator consumes, expressed against one participant's
//!    identity. Production deployments implement it against their directory
//!    provider's API.
//! 2. **An in-memory reference directory** ([`InMemoryDirectory`]): a
//!    complete in-process implementation of the directory contract
//!    (authorization, capacity, join order, host migration, heartbeat
//!    expiry, visibility redaction). Tests and demos run the whole lobby
//!    stack against it without network access.
//! 3. **Errors** ([`DirectoryError`]): the verdicts a directory call can
//!    come back with.
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← issues directory calls, caches the results
//!     ↕
//! Directory client (this crate)  ← one identity per handle
//!     ↕
//! Model (below)  ← SessionRecord, Participant, metadata types
//! ```

mod client;
mod error;
mod memory;

pub use client::{
    CreateSessionOptions, DirectoryClient, JoinOptions, QueryOrder,
    SessionQuery, UpdateParticipantOptions, UpdateSessionOptions,
};
pub use error::DirectoryError;
pub use memory::{DirectoryConfig, DirectoryHandle, InMemoryDirectory};
