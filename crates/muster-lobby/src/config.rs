//! Coordinator configuration and the lobby phase machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Poll cadence. Chosen to keep handoff latency low without flooding the
/// directory with queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1100);

/// Heartbeat cadence. Must sit well under the directory's expiry window so
/// a live host's session never lapses.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`LobbyCoordinator`](crate::LobbyCoordinator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// How often the active session is re-fetched from the directory.
    pub poll_interval: Duration,

    /// How often the host pings the directory to keep the session alive.
    pub heartbeat_interval: Duration,

    /// `gameMode` metadata written at session creation.
    pub default_game_mode: String,

    /// `map` metadata written at session creation.
    pub default_map: String,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            default_game_mode: "CaptureTheFlag".to_string(),
            default_map: "de_dust2".to_string(),
        }
    }
}

impl LobbyConfig {
    /// Returns a copy with zero intervals replaced by the defaults.
    ///
    /// A zero interval would fire its loop on every tick, which the
    /// directory would read as a flood.
    pub fn validated(self) -> Self {
        let mut config = self;
        if config.poll_interval.is_zero() {
            tracing::warn!(
                default_ms = DEFAULT_POLL_INTERVAL.as_millis() as u64,
                "poll_interval of zero replaced with the default"
            );
            config.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if config.heartbeat_interval.is_zero() {
            tracing::warn!(
                default_ms = DEFAULT_HEARTBEAT_INTERVAL.as_millis() as u64,
                "heartbeat_interval of zero replaced with the default"
            );
            config.heartbeat_interval = DEFAULT_HEARTBEAT_INTERVAL;
        }
        config
    }
}

// ---------------------------------------------------------------------------
// LobbyPhase
// ---------------------------------------------------------------------------

/// The coordinator's current relationship to a session.
///
/// ```text
/// Idle → Hosting (create succeeded)
/// Idle → Joined  (join succeeded)
/// Hosting | Joined → Idle (leave, kick, delete, expiry, handoff consumed)
/// ```
///
/// `Hosting` additionally means this process keeps the session alive with
/// heartbeats. A game handoff is not a resting phase: a member redeems the
/// start marker, emits its event, and returns to `Idle` within one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyPhase {
    /// Not in any session.
    Idle,
    /// This process created the session and is its current host.
    Hosting,
    /// A member of a session hosted elsewhere.
    Joined,
}

impl LobbyPhase {
    /// Returns `true` while this process belongs to a session.
    pub fn in_session(&self) -> bool {
        matches!(self, Self::Hosting | Self::Joined)
    }
}

impl std::fmt::Display for LobbyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Hosting => write!(f, "Hosting"),
            Self::Joined => write!(f, "Joined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_config_default() {
        let config = LobbyConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(1100));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.default_game_mode, "CaptureTheFlag");
        assert_eq!(config.default_map, "de_dust2");
    }

    #[test]
    fn test_validated_replaces_zero_intervals() {
        let config = LobbyConfig {
            poll_interval: Duration::ZERO,
            heartbeat_interval: Duration::ZERO,
            ..LobbyConfig::default()
        }
        .validated();
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.heartbeat_interval, DEFAULT_HEARTBEAT_INTERVAL);
    }

    #[test]
    fn test_validated_keeps_custom_intervals() {
        let config = LobbyConfig {
            poll_interval: Duration::from_millis(500),
            ..LobbyConfig::default()
        }
        .validated();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_phase_in_session() {
        assert!(!LobbyPhase::Idle.in_session());
        assert!(LobbyPhase::Hosting.in_session());
        assert!(LobbyPhase::Joined.in_session());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(LobbyPhase::Idle.to_string(), "Idle");
        assert_eq!(LobbyPhase::Hosting.to_string(), "Hosting");
        assert_eq!(LobbyPhase::Joined.to_string(), "Joined");
    }
}
