//! Two lobby coordinators sharing one in-memory directory: Alice hosts,
//! Bob quick-joins, and after a short countdown Alice starts the game and
//! Bob gets handed off through the relay.

use std::time::Duration;

use muster_directory::InMemoryDirectory;
use muster_lobby::{LobbyConfig, LobbyCoordinator, LobbyEvent};
use muster_model::{Participant, ParticipantId};
use muster_relay::{LocalRelay, RelayCode};
use muster_tick::{Countdown, FrameTicker};

// ---------------------------------------------------------------------------
// Demo script
// ---------------------------------------------------------------------------

fn roster_line(roster: &[Participant]) -> String {
    roster
        .iter()
        .map(|p| p.display_name().unwrap_or("<unnamed>"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs the whole match day: host, browse, join, start, hand off.
///
/// Returns the relay code Bob's coordinator redeemed.
async fn run_matchday(
    directory: InMemoryDirectory,
    relay: LocalRelay,
) -> Result<RelayCode, Box<dyn std::error::Error>> {
    let mut alice = LobbyCoordinator::new(
        directory.connect(ParticipantId::new("alice")),
        relay.clone(),
        ParticipantId::new("alice"),
        LobbyConfig::default(),
    );
    let mut bob = LobbyCoordinator::new(
        directory.connect(ParticipantId::new("bob")),
        relay.clone(),
        ParticipantId::new("bob"),
        LobbyConfig::default(),
    );

    // Alice opens a lobby; Bob finds it without knowing the code.
    let code = alice
        .create_session("Alice", "Friday Arena", 4)
        .await
        .ok_or("session create refused")?;
    println!("Alice is hosting \"Friday Arena\" (join code {code})");

    for listed in bob.list_sessions().await {
        println!(
            "Bob sees: {} ({}/{} slots taken)",
            listed.name,
            listed.participants.len(),
            listed.max_participants
        );
    }
    if !bob.quick_join("Bob").await {
        return Err("quick join refused".into());
    }
    println!("Bob joined; his roster: {}", roster_line(&bob.current_roster()));

    let mut joined_rx = bob.subscribe();

    // Drive both coordinators at a game-loop rate. Alice starts the game
    // after a short lobby countdown.
    let mut frames = FrameTicker::with_rate(30);
    let mut game_start = Countdown::after(Duration::from_secs(3));
    let mut started = false;
    let mut alice_seen = alice.current_roster().len();
    let mut frames_left = 30 * 10;

    loop {
        if frames_left == 0 {
            return Err("demo timed out waiting for the handoff".into());
        }
        frames_left -= 1;
        let dt = frames.next_frame().await;

        alice.poll_tick(dt).await;
        alice.heartbeat_tick(dt);
        bob.poll_tick(dt).await;
        bob.heartbeat_tick(dt);

        let roster = alice.current_roster();
        if roster.len() != alice_seen {
            alice_seen = roster.len();
            println!("Alice's roster: {}", roster_line(&roster));
        }

        if !started && game_start.tick(dt) {
            started = true;
            if !alice.start_game().await {
                return Err("game start refused".into());
            }
            println!("Alice started the game");
        }

        if let Ok(LobbyEvent::JoinedGame { code }) = joined_rx.try_recv() {
            println!("Bob's lobby handed him off to relay code {code}");
            println!("Alice is {}, Bob is {}", alice.phase(), bob.phase());
            alice.delete_session().await;
            return Ok(code);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let code = run_matchday(InMemoryDirectory::default(), LocalRelay::new()).await?;
    println!("match day complete, game running at {code}");
    Ok(())
}
