//! Lobby session coordination for Muster.
//!
//! The coordinator owns a cached mirror of one directory session and runs
//! the two periodic loops that keep it honest: a poll loop every member
//! runs to re-fetch the record, and a heartbeat loop only the host runs to
//! keep the session from expiring. When the host starts the game, members
//! observe the start marker on their next poll, redeem it with the relay,
//! and receive a [`LobbyEvent::JoinedGame`] notification.
//!
//! # Key types
//!
//! - [`LobbyCoordinator`]: the per-process session state machine
//! - [`LobbyConfig`]: loop intervals and session defaults
//! - [`LobbyPhase`]: Idle / Hosting / Joined
//! - [`LobbyEvent`]: notifications, delivered over a broadcast channel

mod config;
mod coordinator;
mod events;

pub use config::{
    LobbyConfig, LobbyPhase, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_POLL_INTERVAL,
};
pub use coordinator::LobbyCoordinator;
pub use events::LobbyEvent;
