//! Session record model for Muster.
//!
//! This crate defines the data shapes the rest of the stack passes around:
//!
//! - **Identifiers** ([`SessionId`], [`SessionCode`], [`ParticipantId`]):
//!   opaque newtypes for everything the directory service assigns.
//! - **Metadata** ([`MetadataValue`], [`Visibility`]): string key/value
//!   pairs with a per-entry visibility level.
//! - **Records** ([`SessionRecord`], [`Participant`]): the cached mirror of
//!   a remote session and its roster.
//!
//! # Architecture
//!
//! The model crate sits at the bottom of the stack. It knows nothing about
//! the directory service, the relay, or the coordinator. It only defines
//! what a session looks like once it is in this process's hands.
//!
//! ```text
//! Coordinator → Directory/Relay clients → Model (this crate)
//! ```

mod record;
mod types;

pub use record::{keys, Participant, SessionRecord, START_MARKER_WAITING};
pub use types::{MetadataValue, ParticipantId, SessionCode, SessionId, Visibility};
