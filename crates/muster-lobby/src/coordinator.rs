//! The lobby session coordinator.
//!
//! One coordinator lives in each participating process and mirrors one
//! directory session. It is driven by the application's frame loop:
//! [`LobbyCoordinator::poll_tick`] and [`LobbyCoordinator::heartbeat_tick`]
//! are called once per frame with the elapsed time, and everything else
//! happens from there. The coordinator never blocks a tick on the network:
//! loop-issued calls are spawned, and their completions are drained from a
//! channel at the top of the next tick.
//!
//! Two rules keep the cached record honest across those suspend points:
//!
//! - At most one request per loop is in flight at a time. A loop whose
//!   countdown fires while its previous request is still pending skips the
//!   fire instead of stacking a second request behind it.
//! - Every completion carries the epoch at which it was issued. Session
//!   transitions and every locally-initiated write bump the epoch, so a
//!   completion issued against state this process has since replaced is
//!   discarded on arrival instead of overwriting the newer record.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use muster_directory::{
    CreateSessionOptions, DirectoryClient, DirectoryError, JoinOptions,
    SessionQuery, UpdateParticipantOptions, UpdateSessionOptions,
};
use muster_model::{
    keys, MetadataValue, Participant, ParticipantId, SessionCode, SessionId,
    SessionRecord, START_MARKER_WAITING,
};
use muster_relay::{RelayClient, RelayCode};
use muster_tick::Countdown;
use tokio::sync::{broadcast, mpsc};

use crate::events::EVENT_CAPACITY;
use crate::{LobbyConfig, LobbyEvent, LobbyPhase};

/// Open public sessions fetched per browse call.
const SESSION_PAGE_LIMIT: usize = 5;

/// Completion of a spawned "get session" call, tagged with the epoch at
/// which it was issued.
struct PollReply {
    epoch: u64,
    result: Result<SessionRecord, DirectoryError>,
}

/// Completion of a spawned heartbeat ping.
struct HeartbeatReply {
    epoch: u64,
    result: Result<(), DirectoryError>,
}

/// Coordinates one process's membership in a directory session.
///
/// The directory and relay clients are injected at construction, so tests
/// can drive the coordinator against in-memory services with synthetic
/// tick deltas and no real clock.
pub struct LobbyCoordinator<D: DirectoryClient, R: RelayClient> {
    directory: Arc<D>,
    relay: Arc<R>,
    participant_id: ParticipantId,
    config: LobbyConfig,

    /// Present only while this process is the session's host.
    owned: Option<SessionRecord>,
    /// The session this process is currently a member of.
    active: Option<SessionRecord>,

    /// Bumped by every local transition or write that supersedes the caches.
    epoch: u64,
    poll_countdown: Countdown,
    heartbeat_countdown: Countdown,
    /// Epoch of the outstanding poll request, if any.
    poll_in_flight: Option<u64>,
    /// Epoch of the outstanding heartbeat ping, if any.
    heartbeat_in_flight: Option<u64>,

    poll_tx: mpsc::UnboundedSender<PollReply>,
    poll_rx: mpsc::UnboundedReceiver<PollReply>,
    heartbeat_tx: mpsc::UnboundedSender<HeartbeatReply>,
    heartbeat_rx: mpsc::UnboundedReceiver<HeartbeatReply>,

    events: broadcast::Sender<LobbyEvent>,
}

impl<D: DirectoryClient, R: RelayClient> LobbyCoordinator<D, R> {
    /// Creates an idle coordinator for the given participant identity.
    pub fn new(
        directory: D,
        relay: R,
        participant_id: ParticipantId,
        config: LobbyConfig,
    ) -> Self {
        let config = config.validated();
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        let (heartbeat_tx, heartbeat_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            directory: Arc::new(directory),
            relay: Arc::new(relay),
            participant_id,
            owned: None,
            active: None,
            epoch: 0,
            poll_countdown: Countdown::after(config.poll_interval),
            heartbeat_countdown: Countdown::after(config.heartbeat_interval),
            poll_in_flight: None,
            heartbeat_in_flight: None,
            config,
            poll_tx,
            poll_rx,
            heartbeat_tx,
            heartbeat_rx,
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// The coordinator's current phase, derived from its caches.
    pub fn phase(&self) -> LobbyPhase {
        if self.owned.is_some() {
            LobbyPhase::Hosting
        } else if self.active.is_some() {
            LobbyPhase::Joined
        } else {
            LobbyPhase::Idle
        }
    }

    /// Participants of the active session in join order, or empty when
    /// idle. A snapshot: safe to call at any time, never blocks.
    pub fn current_roster(&self) -> Vec<Participant> {
        self.active
            .as_ref()
            .map(|session| session.participants.clone())
            .unwrap_or_default()
    }

    /// The active session's shareable join code.
    pub fn session_code(&self) -> Option<&SessionCode> {
        self.active.as_ref().map(|session| &session.join_code)
    }

    /// The active session's directory id.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.active.as_ref().map(|session| &session.id)
    }

    /// A snapshot of the cached session record.
    pub fn active_session(&self) -> Option<&SessionRecord> {
        self.active.as_ref()
    }

    /// Whether this process currently hosts its session.
    pub fn is_host(&self) -> bool {
        self.owned.is_some()
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    /// Subscribes to coordinator events. Subscribe before the event can
    /// occur; a broadcast sent with no receivers is dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<LobbyEvent> {
        self.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Session entry
    // -----------------------------------------------------------------------

    /// Creates a new session and becomes its host.
    ///
    /// The record is seeded with the configured `gameMode` and `map` plus a
    /// waiting start marker. Returns the session's join code, or `None` if
    /// the directory refused (the coordinator stays idle; the failure is
    /// logged).
    pub async fn create_session(
        &mut self,
        participant_name: &str,
        session_name: &str,
        max_participants: usize,
    ) -> Option<SessionCode> {
        if self.active.is_some() {
            tracing::warn!("create_session while already in a session");
            return None;
        }
        let host =
            Participant::named(self.participant_id.clone(), participant_name);
        let mut options = CreateSessionOptions::for_host(host);
        options.metadata = BTreeMap::from([
            (
                keys::GAME_MODE.to_string(),
                MetadataValue::public(self.config.default_game_mode.as_str()),
            ),
            (
                keys::MAP.to_string(),
                MetadataValue::public(self.config.default_map.as_str()),
            ),
            (
                keys::START_MARKER.to_string(),
                MetadataValue::member(START_MARKER_WAITING),
            ),
        ]);

        let created = self
            .directory
            .create_session(session_name, max_participants, options)
            .await;
        match created {
            Ok(record) => {
                let code = record.join_code.clone();
                tracing::info!(session = %record.id, %code, "session created, hosting");
                self.enter_session(record);
                Some(code)
            }
            Err(err) => {
                tracing::warn!(error = %err, "session create failed");
                None
            }
        }
    }

    /// Joins the session behind a shared code. Returns `false` on any
    /// directory refusal, leaving the coordinator idle.
    pub async fn join_by_code(
        &mut self,
        participant_name: &str,
        code: &SessionCode,
    ) -> bool {
        if self.active.is_some() {
            tracing::warn!("join_by_code while already in a session");
            return false;
        }
        let participant =
            Participant::named(self.participant_id.clone(), participant_name);
        let joined = self
            .directory
            .join_by_code(code, JoinOptions { participant })
            .await;
        match joined {
            Ok(record) => {
                tracing::info!(session = %record.id, "joined session by code");
                self.enter_session(record);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "session join failed");
                false
            }
        }
    }

    /// Joins the oldest open public session the directory knows of.
    pub async fn quick_join(&mut self, participant_name: &str) -> bool {
        if self.active.is_some() {
            tracing::warn!("quick_join while already in a session");
            return false;
        }
        let participant =
            Participant::named(self.participant_id.clone(), participant_name);
        let joined = self
            .directory
            .quick_join(JoinOptions { participant })
            .await;
        match joined {
            Ok(record) => {
                tracing::info!(session = %record.id, "quick joined session");
                self.enter_session(record);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "quick join failed");
                false
            }
        }
    }

    /// Fetches a page of open public sessions for a browse screen.
    /// Failures are logged and surface as an empty page.
    pub async fn list_sessions(&self) -> Vec<SessionRecord> {
        let listed = self
            .directory
            .query_sessions(SessionQuery::open_page(SESSION_PAGE_LIMIT))
            .await;
        match listed {
            Ok(sessions) => sessions,
            Err(err) => {
                tracing::warn!(error = %err, "session query failed");
                Vec::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Periodic loops
    // -----------------------------------------------------------------------

    /// Advances the poll loop by `dt`.
    ///
    /// Call once per frame. Drains completed poll responses first (this is
    /// where game handoff is detected), then, if the countdown fired and no
    /// poll is outstanding, spawns the next "get session" request.
    pub async fn poll_tick(&mut self, dt: Duration) {
        self.drain_poll_replies().await;

        let Some(active) = &self.active else { return };
        if !self.poll_countdown.tick(dt) {
            return;
        }
        if self.poll_in_flight.is_some() {
            tracing::debug!("previous poll still in flight, skipping");
            return;
        }

        let epoch = self.epoch;
        self.poll_in_flight = Some(epoch);
        let directory = Arc::clone(&self.directory);
        let id = active.id.clone();
        let tx = self.poll_tx.clone();
        tokio::spawn(async move {
            let result = directory.get_session(&id).await;
            let _ = tx.send(PollReply { epoch, result });
        });
    }

    /// Advances the heartbeat loop by `dt`. Call once per frame; a no-op
    /// unless this process hosts its session.
    pub fn heartbeat_tick(&mut self, dt: Duration) {
        self.drain_heartbeat_replies();

        let Some(owned) = &self.owned else { return };
        if !self.heartbeat_countdown.tick(dt) {
            return;
        }
        if self.heartbeat_in_flight.is_some() {
            tracing::debug!("previous heartbeat still in flight, skipping");
            return;
        }

        let epoch = self.epoch;
        self.heartbeat_in_flight = Some(epoch);
        let directory = Arc::clone(&self.directory);
        let id = owned.id.clone();
        let tx = self.heartbeat_tx.clone();
        tokio::spawn(async move {
            let result = directory.send_heartbeat(&id).await;
            let _ = tx.send(HeartbeatReply { epoch, result });
        });
    }

    async fn drain_poll_replies(&mut self) {
        while let Ok(reply) = self.poll_rx.try_recv() {
            if reply.epoch != self.epoch {
                tracing::debug!("discarding poll response from a superseded epoch");
                continue;
            }
            self.poll_in_flight = None;
            match reply.result {
                Ok(record) => self.apply_poll_record(record).await,
                Err(DirectoryError::NotFound(id)) => {
                    tracing::info!(session = %id, "session gone, leaving lobby");
                    self.clear_session();
                }
                Err(DirectoryError::NotAuthorized(reason)) => {
                    tracing::info!(%reason, "membership ended, leaving lobby");
                    self.clear_session();
                }
                Err(err) => {
                    tracing::warn!(error = %err, "session poll failed, keeping cached record");
                }
            }
        }
    }

    /// Applies one fresh session record from a poll.
    ///
    /// A non-host seeing a live start marker redeems it, emits
    /// [`LobbyEvent::JoinedGame`], and drops out of the lobby; its cleared
    /// epoch guarantees the event fires at most once. The host ignores its
    /// own marker.
    async fn apply_poll_record(&mut self, record: SessionRecord) {
        let marker = record.start_marker().map(RelayCode::new);
        if let Some(code) = marker {
            if !record.is_host(&self.participant_id) {
                let redeemed = self.relay.redeem(&code).await;
                match redeemed {
                    Ok(()) => {
                        tracing::info!(session = %record.id, %code, "game started, handing off");
                        let _ = self.events.send(LobbyEvent::JoinedGame { code });
                        self.clear_session();
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "relay redeem failed, retrying on next poll");
                        self.refresh_caches(record);
                    }
                }
                return;
            }
        }
        self.refresh_caches(record);
    }

    fn drain_heartbeat_replies(&mut self) {
        while let Ok(reply) = self.heartbeat_rx.try_recv() {
            if reply.epoch != self.epoch {
                tracing::debug!("discarding heartbeat response from a superseded epoch");
                continue;
            }
            self.heartbeat_in_flight = None;
            if let Err(err) = reply.result {
                tracing::warn!(error = %err, "session heartbeat failed");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Host operations
    // -----------------------------------------------------------------------

    /// Starts the game: allocates a relay code and writes it into the
    /// session's start marker for members to observe on their next poll.
    ///
    /// The written code stays readable through
    /// [`active_session`](Self::active_session) as the record's start
    /// marker. Calling again reissues a fresh code; the marker is never
    /// reset to waiting.
    pub async fn start_game(&mut self) -> bool {
        let Some(owned) = &self.owned else {
            tracing::warn!("start_game requires hosting a session");
            return false;
        };
        let session_id = owned.id.clone();

        let allocated = self.relay.allocate().await;
        let code = match allocated {
            Ok(code) => code,
            Err(err) => {
                tracing::warn!(error = %err, "relay allocation failed");
                return false;
            }
        };

        let options = UpdateSessionOptions::set_metadata(
            keys::START_MARKER,
            MetadataValue::member(code.as_str()),
        );
        let updated = self.directory.update_session(&session_id, options).await;
        match updated {
            Ok(record) => {
                tracing::info!(session = %session_id, %code, "start marker written");
                self.apply_local_update(record);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "writing start marker failed");
                false
            }
        }
    }

    /// Removes the participant at `index` in the cached roster.
    ///
    /// The index must be valid for the last-known roster or no call is
    /// issued. On success the cached roster is patched locally; the next
    /// poll supersedes the patch with the directory's view.
    pub async fn kick_participant(&mut self, index: usize) -> bool {
        let Some(active) = &self.active else {
            tracing::debug!("kick_participant without an active session");
            return false;
        };
        let Some(target) = active.participant_at(index) else {
            tracing::warn!(
                index,
                roster = active.participants.len(),
                "kick index out of range"
            );
            return false;
        };
        let session_id = active.id.clone();
        let target_id = target.id.clone();

        let removed = self
            .directory
            .remove_participant(&session_id, &target_id)
            .await;
        match removed {
            Ok(()) => {
                tracing::info!(session = %session_id, participant = %target_id, "participant kicked");
                if target_id == self.participant_id {
                    self.clear_session();
                } else {
                    // A poll already in flight must not restore the entry.
                    self.bump_epoch();
                    self.drop_cached_participant(&target_id);
                }
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "kick failed");
                false
            }
        }
    }

    /// Hands the host role to the participant at `index` in the cached
    /// roster. This process stops heartbeating once the directory confirms.
    pub async fn migrate_host(&mut self, index: usize) -> bool {
        let Some(owned) = &self.owned else {
            tracing::warn!("migrate_host requires hosting a session");
            return false;
        };
        let Some(target) = owned.participant_at(index) else {
            tracing::warn!(
                index,
                roster = owned.participants.len(),
                "migrate index out of range"
            );
            return false;
        };
        let session_id = owned.id.clone();
        let target_id = target.id.clone();

        let updated = self
            .directory
            .update_session(
                &session_id,
                UpdateSessionOptions::migrate_host(target_id.clone()),
            )
            .await;
        match updated {
            Ok(record) => {
                tracing::info!(session = %session_id, new_host = %target_id, "host migrated");
                self.apply_local_update(record);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "host migration failed");
                false
            }
        }
    }

    /// Deletes the hosted session for everyone.
    pub async fn delete_session(&mut self) -> bool {
        let Some(owned) = &self.owned else {
            tracing::warn!("delete_session requires hosting a session");
            return false;
        };
        let session_id = owned.id.clone();

        let deleted = self.directory.delete_session(&session_id).await;
        match deleted {
            Ok(()) => {
                tracing::info!(session = %session_id, "session deleted");
                self.clear_session();
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "session delete failed");
                false
            }
        }
    }

    /// Rewrites the session's `gameMode` metadata. Host only.
    pub async fn update_game_mode(&mut self, game_mode: &str) -> bool {
        let Some(owned) = &self.owned else {
            tracing::warn!("update_game_mode requires hosting a session");
            return false;
        };
        let session_id = owned.id.clone();

        let updated = self
            .directory
            .update_session(
                &session_id,
                UpdateSessionOptions::set_metadata(
                    keys::GAME_MODE,
                    MetadataValue::public(game_mode),
                ),
            )
            .await;
        match updated {
            Ok(record) => {
                tracing::info!(session = %session_id, game_mode, "game mode updated");
                self.apply_local_update(record);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "game mode update failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Member operations
    // -----------------------------------------------------------------------

    /// Leaves the active session. On success the caches clear and any
    /// response still in flight for the old session is discarded when it
    /// lands.
    pub async fn leave_session(&mut self) -> bool {
        let Some(active) = &self.active else {
            tracing::debug!("leave_session without an active session");
            return false;
        };
        let session_id = active.id.clone();

        let removed = self
            .directory
            .remove_participant(&session_id, &self.participant_id)
            .await;
        match removed {
            Ok(()) => {
                tracing::info!(session = %session_id, "left session");
                self.clear_session();
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "leaving session failed");
                false
            }
        }
    }

    /// Rewrites this participant's `displayName` attribute.
    pub async fn update_display_name(&mut self, display_name: &str) -> bool {
        let Some(active) = &self.active else {
            tracing::debug!("update_display_name without an active session");
            return false;
        };
        let session_id = active.id.clone();

        let updated = self
            .directory
            .update_participant(
                &session_id,
                &self.participant_id,
                UpdateParticipantOptions::set_attribute(
                    keys::DISPLAY_NAME,
                    MetadataValue::member(display_name),
                ),
            )
            .await;
        match updated {
            Ok(record) => {
                tracing::info!(session = %session_id, display_name, "display name updated");
                self.apply_local_update(record);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "display name update failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Cache maintenance
    // -----------------------------------------------------------------------

    fn enter_session(&mut self, record: SessionRecord) {
        self.bump_epoch();
        // Both loops fire on the first tick after entry.
        self.poll_countdown = Countdown::ready(self.config.poll_interval);
        self.heartbeat_countdown =
            Countdown::ready(self.config.heartbeat_interval);
        self.owned = record
            .is_host(&self.participant_id)
            .then(|| record.clone());
        self.active = Some(record);
    }

    /// Installs a fresh record from a successful directory response,
    /// reconciling the host role. A poll can reveal that hosting migrated
    /// toward or away from this process; heartbeat duty follows.
    fn refresh_caches(&mut self, record: SessionRecord) {
        let was_host = self.owned.is_some();
        let is_host = record.is_host(&self.participant_id);
        if is_host && !was_host {
            tracing::info!(session = %record.id, "promoted to session host");
            self.heartbeat_countdown.reset();
        } else if !is_host && was_host {
            tracing::info!(session = %record.id, "host role handed over");
        }
        self.owned = is_host.then(|| record.clone());
        self.active = Some(record);
    }

    /// Installs a record returned by a locally-initiated call. The epoch
    /// moves first, so a poll response issued before the call is discarded
    /// when it lands instead of rolling the caches back.
    fn apply_local_update(&mut self, record: SessionRecord) {
        self.bump_epoch();
        self.refresh_caches(record);
    }

    fn drop_cached_participant(&mut self, participant_id: &ParticipantId) {
        if let Some(active) = &mut self.active {
            active.participants.retain(|p| &p.id != participant_id);
        }
        if let Some(owned) = &mut self.owned {
            owned.participants.retain(|p| &p.id != participant_id);
        }
    }

    fn clear_session(&mut self) {
        self.owned = None;
        self.active = None;
        self.bump_epoch();
    }

    fn bump_epoch(&mut self) {
        self.epoch += 1;
        self.poll_in_flight = None;
        self.heartbeat_in_flight = None;
    }
}
