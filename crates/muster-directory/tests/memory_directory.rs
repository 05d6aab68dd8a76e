//! Integration tests driving the in-memory directory through several
//! connected clients at once.

use std::time::Duration;

use muster_directory::{
    CreateSessionOptions, DirectoryClient, DirectoryConfig, DirectoryError,
    InMemoryDirectory, JoinOptions, SessionQuery, UpdateParticipantOptions,
};
use muster_model::{keys, MetadataValue, Participant, ParticipantId};

// =========================================================================
// Helpers
// =========================================================================

fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

fn named(id: &str, name: &str) -> Participant {
    Participant::named(pid(id), name)
}

fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new(DirectoryConfig {
        expiry_window: Duration::from_secs(3600),
    })
}

/// Names of the open public sessions, newest first. Generic so it works
/// against any client implementation, not just the in-memory handle.
async fn open_session_names<D: DirectoryClient>(client: &D) -> Vec<String> {
    client
        .query_sessions(SessionQuery::open_page(5))
        .await
        .expect("query should succeed")
        .into_iter()
        .map(|record| record.name)
        .collect()
}

// =========================================================================
// Cross-client flows
// =========================================================================

#[tokio::test]
async fn test_full_session_lifecycle_across_handles() {
    let dir = directory();
    let alice = dir.connect(pid("alice"));
    let bob = dir.connect(pid("bob"));
    let eve = dir.connect(pid("eve"));

    let record = alice
        .create_session(
            "Friday Arena",
            3,
            CreateSessionOptions {
                metadata: [(
                    keys::GAME_MODE.to_string(),
                    MetadataValue::public("CaptureTheFlag"),
                )]
                .into(),
                ..CreateSessionOptions::for_host(named("alice", "Alice"))
            },
        )
        .await
        .unwrap();

    bob.join_by_code(
        &record.join_code,
        JoinOptions {
            participant: named("bob", "Bob"),
        },
    )
    .await
    .unwrap();
    eve.join_by_code(
        &record.join_code,
        JoinOptions {
            participant: named("eve", "Eve"),
        },
    )
    .await
    .unwrap();

    // Bob renames himself; everyone sees it on the next fetch.
    bob.update_participant(
        &record.id,
        &pid("bob"),
        UpdateParticipantOptions::set_attribute(
            keys::DISPLAY_NAME,
            MetadataValue::member("Bobby"),
        ),
    )
    .await
    .unwrap();
    let seen_by_eve = eve.get_session(&record.id).await.unwrap();
    assert_eq!(seen_by_eve.participants[1].display_name(), Some("Bobby"));

    // The host kicks Eve, then leaves; hosting falls to Bob.
    alice
        .remove_participant(&record.id, &pid("eve"))
        .await
        .unwrap();
    alice
        .remove_participant(&record.id, &pid("alice"))
        .await
        .unwrap();

    let seen_by_bob = bob.get_session(&record.id).await.unwrap();
    assert_eq!(seen_by_bob.host_id, pid("bob"));
    assert_eq!(seen_by_bob.participants.len(), 1);

    // As the new host, Bob may tear the session down.
    bob.delete_session(&record.id).await.unwrap();
    assert_eq!(dir.session_count().await, 0);
}

#[tokio::test]
async fn test_generic_driver_sees_open_sessions() {
    let dir = directory();
    let alice = dir.connect(pid("alice"));
    alice
        .create_session(
            "Arena",
            2,
            CreateSessionOptions::for_host(named("alice", "Alice")),
        )
        .await
        .unwrap();

    let viewer = dir.connect(pid("viewer"));
    assert_eq!(open_session_names(&viewer).await, ["Arena"]);
}

#[tokio::test]
async fn test_handles_work_across_spawned_tasks() {
    let dir = directory();
    let alice = dir.connect(pid("alice"));
    let record = alice
        .create_session(
            "Arena",
            2,
            CreateSessionOptions::for_host(named("alice", "Alice")),
        )
        .await
        .unwrap();

    // The handle and its futures must be Send for this spawn to exist.
    let bob = dir.connect(pid("bob"));
    let code = record.join_code.clone();
    let joined = tokio::spawn(async move {
        bob.join_by_code(
            &code,
            JoinOptions {
                participant: named("bob", "Bob"),
            },
        )
        .await
    })
    .await
    .expect("join task should not panic")
    .expect("join should succeed");

    assert_eq!(joined.participants.len(), 2);
}

#[tokio::test]
async fn test_racing_joins_fill_exactly_one_slot() {
    let dir = directory();
    let alice = dir.connect(pid("alice"));
    let record = alice
        .create_session(
            "Arena",
            2,
            CreateSessionOptions::for_host(named("alice", "Alice")),
        )
        .await
        .unwrap();

    let bob = dir.connect(pid("bob"));
    let eve = dir.connect(pid("eve"));
    let code_b = record.join_code.clone();
    let code_e = record.join_code.clone();

    let bob_task = tokio::spawn(async move {
        bob.join_by_code(
            &code_b,
            JoinOptions {
                participant: named("bob", "Bob"),
            },
        )
        .await
    });
    let eve_task = tokio::spawn(async move {
        eve.join_by_code(
            &code_e,
            JoinOptions {
                participant: named("eve", "Eve"),
            },
        )
        .await
    });

    let bob_result = bob_task.await.expect("no panic");
    let eve_result = eve_task.await.expect("no panic");

    let winners =
        [&bob_result, &eve_result].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "one free slot admits exactly one joiner");
    let loser = if bob_result.is_ok() { eve_result } else { bob_result };
    assert!(matches!(
        loser.unwrap_err(),
        DirectoryError::CapacityExceeded(_)
    ));
}

#[tokio::test]
async fn test_expired_sessions_vanish_from_queries() {
    let dir = InMemoryDirectory::new(DirectoryConfig {
        expiry_window: Duration::ZERO,
    });
    let alice = dir.connect(pid("alice"));
    alice
        .create_session(
            "Arena",
            2,
            CreateSessionOptions::for_host(named("alice", "Alice")),
        )
        .await
        .unwrap();

    let viewer = dir.connect(pid("viewer"));
    assert!(open_session_names(&viewer).await.is_empty());
}
