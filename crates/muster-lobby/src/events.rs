//! Notifications published by the coordinator.

use muster_relay::RelayCode;

/// Capacity of the coordinator's broadcast channel. A subscriber lagging
/// further than this sees `RecvError::Lagged` rather than stalling the
/// coordinator.
pub(crate) const EVENT_CAPACITY: usize = 16;

/// Events a [`LobbyCoordinator`](crate::LobbyCoordinator) emits.
///
/// Subscribe with [`LobbyCoordinator::subscribe`](crate::LobbyCoordinator::subscribe).
/// Delivery is at most once per occurrence; an event sent while no
/// subscriber exists is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    /// The host started the game. The code has already been redeemed with
    /// the relay; connect to the transport session it names. This is the
    /// authoritative lobby-to-game transition signal for members.
    JoinedGame {
        /// The relay join code the host wrote into the session record.
        code: RelayCode,
    },
}
