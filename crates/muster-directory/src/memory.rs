//! An in-process directory service for tests and demos.
//!
//! One [`InMemoryDirectory`] plays the role of the hosted service; each
//! participant gets a [`DirectoryHandle`] from
//! [`connect`](InMemoryDirectory::connect) that implements
//! [`DirectoryClient`] with that identity. The store enforces the same
//! contract a hosted directory would: authorization, capacity, join order,
//! host migration, heartbeat expiry, and visibility redaction.
//!
//! # Concurrency note
//!
//! The store is a plain synchronous struct behind one `tokio::sync::Mutex`;
//! each client call is a short critical section.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use muster_model::{
    Participant, ParticipantId, SessionCode, SessionId, SessionRecord,
    Visibility,
};
use rand::Rng;
use tokio::sync::Mutex;

use crate::{
    CreateSessionOptions, DirectoryClient, DirectoryError, JoinOptions,
    QueryOrder, SessionQuery, UpdateParticipantOptions, UpdateSessionOptions,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the in-memory directory.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// A session expires when nothing has refreshed it for this long.
    /// Heartbeats and every mutating call refresh the window; expired
    /// sessions are scrubbed lazily on the next access.
    ///
    /// The default leaves a comfortable margin over the coordinator's
    /// 15-second heartbeat interval.
    pub expiry_window: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            expiry_window: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Code and id generation
// ---------------------------------------------------------------------------

/// Join codes are drawn from an alphabet without 0/O/1/I so they survive
/// being read out loud.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

fn generate_join_code() -> SessionCode {
    let mut rng = rand::rng();
    let code: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    SessionCode(code)
}

fn generate_session_id() -> SessionId {
    let mut rng = rand::rng();
    let bytes: [u8; 8] = rng.random();
    SessionId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

// ---------------------------------------------------------------------------
// The directory and its handles
// ---------------------------------------------------------------------------

/// An in-process stand-in for the hosted directory service.
///
/// Cloning is cheap and every clone shares the same store, so one directory
/// can serve any number of simulated processes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    inner: Arc<Mutex<Store>>,
}

impl InMemoryDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Store {
                config,
                ..Store::default()
            })),
        }
    }

    /// A client speaking for `participant_id`, the way a signed-in process
    /// holds a connection with its identity attached.
    pub fn connect(&self, participant_id: ParticipantId) -> DirectoryHandle {
        DirectoryHandle {
            inner: Arc::clone(&self.inner),
            participant_id,
        }
    }

    /// Live sessions currently in the store. Scrubs expired ones first.
    pub async fn session_count(&self) -> usize {
        let mut store = self.inner.lock().await;
        store.scrub();
        store.sessions.len()
    }
}

/// One participant's connection to an [`InMemoryDirectory`].
#[derive(Debug, Clone)]
pub struct DirectoryHandle {
    inner: Arc<Mutex<Store>>,
    participant_id: ParticipantId,
}

impl DirectoryHandle {
    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }
}

impl DirectoryClient for DirectoryHandle {
    async fn create_session(
        &self,
        name: &str,
        max_participants: usize,
        options: CreateSessionOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.inner.lock().await.create(
            &self.participant_id,
            name,
            max_participants,
            options,
        )
    }

    async fn query_sessions(
        &self,
        query: SessionQuery,
    ) -> Result<Vec<SessionRecord>, DirectoryError> {
        Ok(self.inner.lock().await.query(query))
    }

    async fn join_by_code(
        &self,
        code: &SessionCode,
        options: JoinOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.inner
            .lock()
            .await
            .join_by_code(&self.participant_id, code, options)
    }

    async fn quick_join(
        &self,
        options: JoinOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.inner
            .lock()
            .await
            .quick_join(&self.participant_id, options)
    }

    async fn get_session(
        &self,
        id: &SessionId,
    ) -> Result<SessionRecord, DirectoryError> {
        self.inner.lock().await.get(&self.participant_id, id)
    }

    async fn update_session(
        &self,
        id: &SessionId,
        options: UpdateSessionOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.inner
            .lock()
            .await
            .update_session(&self.participant_id, id, options)
    }

    async fn update_participant(
        &self,
        id: &SessionId,
        participant_id: &ParticipantId,
        options: UpdateParticipantOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.inner.lock().await.update_participant(
            &self.participant_id,
            id,
            participant_id,
            options,
        )
    }

    async fn remove_participant(
        &self,
        id: &SessionId,
        participant_id: &ParticipantId,
    ) -> Result<(), DirectoryError> {
        self.inner.lock().await.remove_participant(
            &self.participant_id,
            id,
            participant_id,
        )
    }

    async fn send_heartbeat(&self, id: &SessionId) -> Result<(), DirectoryError> {
        self.inner.lock().await.heartbeat(&self.participant_id, id)
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), DirectoryError> {
        self.inner.lock().await.delete(&self.participant_id, id)
    }
}

// ---------------------------------------------------------------------------
// The store
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StoredSession {
    record: SessionRecord,
    /// Creation order; queries sort on this.
    created_seq: u64,
    /// Last heartbeat or mutation; drives expiry.
    last_refresh: Instant,
}

#[derive(Debug, Default)]
struct Store {
    config: DirectoryConfig,
    sessions: HashMap<SessionId, StoredSession>,
    /// Index from join code to session id, kept in sync with `sessions`.
    codes: HashMap<SessionCode, SessionId>,
    next_seq: u64,
}

impl Store {
    /// Drops every session whose refresh window has lapsed. Called at the
    /// top of each operation so expiry needs no background task.
    fn scrub(&mut self) {
        let window = self.config.expiry_window;
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.last_refresh.elapsed() >= window)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            if let Some(stored) = self.sessions.remove(&id) {
                self.codes.remove(&stored.record.join_code);
                tracing::info!(%id, "session expired, scrubbing");
            }
        }
    }

    fn live_mut(
        &mut self,
        id: &SessionId,
    ) -> Result<&mut StoredSession, DirectoryError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))
    }

    fn create(
        &mut self,
        caller: &ParticipantId,
        name: &str,
        max_participants: usize,
        options: CreateSessionOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.scrub();
        if max_participants == 0 {
            return Err(DirectoryError::Rejected(
                "max_participants must be at least 1".into(),
            ));
        }
        if &options.host.id != caller {
            return Err(DirectoryError::NotAuthorized(format!(
                "create host must be the signed-in participant {caller}"
            )));
        }

        let id = generate_session_id();
        let mut join_code = generate_join_code();
        while self.codes.contains_key(&join_code) {
            join_code = generate_join_code();
        }

        let record = SessionRecord {
            id: id.clone(),
            name: name.to_string(),
            join_code: join_code.clone(),
            host_id: caller.clone(),
            max_participants,
            private: options.private,
            metadata: options.metadata,
            participants: vec![options.host],
        };

        self.next_seq += 1;
        self.codes.insert(join_code.clone(), id.clone());
        self.sessions.insert(
            id.clone(),
            StoredSession {
                record: record.clone(),
                created_seq: self.next_seq,
                last_refresh: Instant::now(),
            },
        );

        tracing::info!(%id, %join_code, host = %caller, "session created");
        Ok(record)
    }

    fn join_by_code(
        &mut self,
        caller: &ParticipantId,
        code: &SessionCode,
        options: JoinOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.scrub();
        let id = self
            .codes
            .get(code)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownCode(code.clone()))?;
        self.admit(caller, &id, options.participant)
    }

    fn quick_join(
        &mut self,
        caller: &ParticipantId,
        options: JoinOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.scrub();
        // Oldest open public session wins, so early sessions fill first.
        let id = self
            .sessions
            .values()
            .filter(|s| !s.record.private && !s.record.is_full())
            .min_by_key(|s| s.created_seq)
            .map(|s| s.record.id.clone())
            .ok_or(DirectoryError::NoOpenSessions)?;
        self.admit(caller, &id, options.participant)
    }

    /// Shared admission path for both join flavors.
    fn admit(
        &mut self,
        caller: &ParticipantId,
        id: &SessionId,
        participant: Participant,
    ) -> Result<SessionRecord, DirectoryError> {
        if &participant.id != caller {
            return Err(DirectoryError::NotAuthorized(format!(
                "join participant must be the signed-in participant {caller}"
            )));
        }
        let stored = self.live_mut(id)?;
        if stored.record.contains(caller) {
            return Err(DirectoryError::AlreadyJoined(caller.clone()));
        }
        if stored.record.is_full() {
            return Err(DirectoryError::CapacityExceeded(id.clone()));
        }
        stored.record.participants.push(participant);
        stored.last_refresh = Instant::now();
        tracing::debug!(%id, participant = %caller, "participant joined");
        Ok(stored.record.clone())
    }

    fn get(
        &mut self,
        caller: &ParticipantId,
        id: &SessionId,
    ) -> Result<SessionRecord, DirectoryError> {
        self.scrub();
        let stored = self.live_mut(id)?;
        if !stored.record.contains(caller) {
            return Err(DirectoryError::NotAuthorized(format!(
                "{caller} is not a member of session {id}"
            )));
        }
        Ok(stored.record.clone())
    }

    fn update_session(
        &mut self,
        caller: &ParticipantId,
        id: &SessionId,
        options: UpdateSessionOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.scrub();
        let stored = self.live_mut(id)?;
        if !stored.record.is_host(caller) {
            return Err(DirectoryError::NotAuthorized(format!(
                "{caller} is not the host of session {id}"
            )));
        }
        if let Some(new_host) = options.host_id {
            if !stored.record.contains(&new_host) {
                return Err(DirectoryError::UnknownParticipant(new_host));
            }
            tracing::info!(%id, old_host = %stored.record.host_id, new_host = %new_host, "host migrated");
            stored.record.host_id = new_host;
        }
        stored.record.metadata.extend(options.metadata);
        stored.last_refresh = Instant::now();
        Ok(stored.record.clone())
    }

    fn update_participant(
        &mut self,
        caller: &ParticipantId,
        id: &SessionId,
        participant_id: &ParticipantId,
        options: UpdateParticipantOptions,
    ) -> Result<SessionRecord, DirectoryError> {
        self.scrub();
        if participant_id != caller {
            return Err(DirectoryError::NotAuthorized(format!(
                "{caller} may only update its own attributes"
            )));
        }
        let stored = self.live_mut(id)?;
        let participant = stored
            .record
            .participants
            .iter_mut()
            .find(|p| &p.id == participant_id)
            .ok_or_else(|| {
                DirectoryError::UnknownParticipant(participant_id.clone())
            })?;
        participant.attributes.extend(options.attributes);
        stored.last_refresh = Instant::now();
        Ok(stored.record.clone())
    }

    fn remove_participant(
        &mut self,
        caller: &ParticipantId,
        id: &SessionId,
        participant_id: &ParticipantId,
    ) -> Result<(), DirectoryError> {
        self.scrub();
        let stored = self.live_mut(id)?;
        let is_self = participant_id == caller;
        if !is_self && !stored.record.is_host(caller) {
            return Err(DirectoryError::NotAuthorized(format!(
                "{caller} may not remove {participant_id}"
            )));
        }
        let index = stored
            .record
            .participants
            .iter()
            .position(|p| &p.id == participant_id)
            .ok_or_else(|| {
                DirectoryError::UnknownParticipant(participant_id.clone())
            })?;
        stored.record.participants.remove(index);
        stored.last_refresh = Instant::now();
        tracing::debug!(%id, participant = %participant_id, kicked = !is_self, "participant removed");

        if stored.record.participants.is_empty() {
            let stored = self
                .sessions
                .remove(id)
                .expect("session present moments ago");
            self.codes.remove(&stored.record.join_code);
            tracing::info!(%id, "last participant left, session deleted");
        } else if &stored.record.host_id == participant_id {
            // Hosting falls to the next participant in join order.
            let new_host = stored.record.participants[0].id.clone();
            tracing::info!(%id, old_host = %participant_id, new_host = %new_host, "host left, migrating");
            stored.record.host_id = new_host;
        }
        Ok(())
    }

    fn heartbeat(
        &mut self,
        caller: &ParticipantId,
        id: &SessionId,
    ) -> Result<(), DirectoryError> {
        self.scrub();
        let stored = self.live_mut(id)?;
        if !stored.record.is_host(caller) {
            return Err(DirectoryError::NotAuthorized(format!(
                "{caller} is not the host of session {id}"
            )));
        }
        stored.last_refresh = Instant::now();
        tracing::debug!(%id, "heartbeat");
        Ok(())
    }

    fn delete(
        &mut self,
        caller: &ParticipantId,
        id: &SessionId,
    ) -> Result<(), DirectoryError> {
        self.scrub();
        let stored = self.live_mut(id)?;
        if !stored.record.is_host(caller) {
            return Err(DirectoryError::NotAuthorized(format!(
                "{caller} is not the host of session {id}"
            )));
        }
        let stored = self
            .sessions
            .remove(id)
            .expect("session present moments ago");
        self.codes.remove(&stored.record.join_code);
        tracing::info!(%id, "session deleted");
        Ok(())
    }

    fn query(&mut self, query: SessionQuery) -> Vec<SessionRecord> {
        self.scrub();
        let mut matches: Vec<(u64, SessionRecord)> = self
            .sessions
            .values()
            .filter(|s| !s.record.private)
            .filter(|s| !query.only_open || !s.record.is_full())
            .map(|s| (s.created_seq, public_view(&s.record)))
            .collect();
        match query.order {
            QueryOrder::NewestFirst => {
                matches.sort_by(|a, b| b.0.cmp(&a.0));
            }
            QueryOrder::OldestFirst => {
                matches.sort_by(|a, b| a.0.cmp(&b.0));
            }
        }
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        matches.into_iter().map(|(_, record)| record).collect()
    }
}

/// A copy of `record` as a non-member sees it: member-visibility metadata
/// and attributes stripped.
fn public_view(record: &SessionRecord) -> SessionRecord {
    let mut view = record.clone();
    view.metadata
        .retain(|_, v| v.visibility == Visibility::Public);
    for participant in &mut view.participants {
        participant
            .attributes
            .retain(|_, v| v.visibility == Visibility::Public);
    }
    view
}

// =========================================================================
// Tests
// =========================================================================
