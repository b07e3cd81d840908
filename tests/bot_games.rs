//! Whole games played by bots, driven tick by tick through the server.
//!
//! Every intermediate state is checked against the table invariants.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use qdice::config::{EngineConfig, TablesFile};
use qdice::core::clock::ManualClock;
use qdice::game::{Table, TableConfig, TableParams, TableStatus};
use qdice::network::{MemoryScoreStore, RecordingGateway, ServerMessage, TableServer, TableStore, Topic};

const MAX_TICKS: usize = 20_000;

fn root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}

fn config(tag: &str, slots: usize) -> TableConfig {
    TableConfig {
        tag: tag.into(),
        name: tag.into(),
        map_name: "Planeta".into(),
        player_slots: slots,
        start_slots: 2,
        points: 0,
        stack_size: 8,
        params: TableParams { no_flag_rounds: 2, ..TableParams::default() },
    }
}

fn harness(configs: &[TableConfig], salt: u64) -> (TableServer, RecordingGateway, Arc<ManualClock>) {
    let tables = TableStore::load(configs, &root().join("maps"), salt, 20).unwrap();
    let gateway = RecordingGateway::new();
    let clock = Arc::new(ManualClock::new(1_600_000_000_000));
    let server = TableServer::new(
        Arc::new(tables),
        Arc::new(gateway.clone()),
        Arc::new(MemoryScoreStore::new()),
        clock.clone(),
        EngineConfig::default(),
    );
    (server, gateway, clock)
}

async fn table(server: &TableServer, tag: &str) -> Table {
    let session = server.tables().get(tag).await.unwrap();
    let session = session.lock().await;
    session.table().clone()
}

fn check_invariants(t: &Table) {
    assert!(t.players.len() <= t.config.player_slots);
    if t.is_playing() {
        assert!(t.players.len() >= 2, "a running game needs two seats");
        let turn = t.turn_index.expect("running game has a turn");
        assert!(turn < t.players.len());
    }
    for land in &t.lands {
        assert!(land.points >= 1 && land.points <= t.stack_size(), "{land:?}");
        if t.is_playing() {
            assert!(land.color.is_neutral() || t.player_by_color(land.color).is_some(), "{land:?}");
        }
    }
}

/// Seat bots, then tick until the game is over. Returns the tick count.
async fn play_out(server: &TableServer, clock: &ManualClock, tag: &str) -> usize {
    let seated = server.seat_bots(tag).await.unwrap();
    assert_eq!(seated, table(server, tag).await.config.player_slots);

    let mut started = false;
    for ticks in 0..MAX_TICKS {
        clock.advance_ms(600);
        server.tick(tag).await.unwrap();

        let t = table(server, tag).await;
        check_invariants(&t);
        started |= t.is_playing();
        if started && t.status == TableStatus::Finished {
            return ticks;
        }
    }
    panic!("{tag} did not finish within {MAX_TICKS} ticks");
}

#[tokio::test]
async fn test_bot_duel_finishes() {
    let (server, gateway, clock) = harness(&[config("Duel", 2)], 11);
    play_out(&server, &clock, "Duel").await;

    let t = table(&server, "Duel").await;
    assert!(t.players.is_empty());
    assert!(t.game_id.is_some());

    let positions: Vec<usize> = gateway
        .on(&Topic::Table("Duel".into()))
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::Elimination { position, .. } => Some(position),
            _ => None,
        })
        .collect();
    assert_eq!(positions, vec![2, 1]);
}

#[tokio::test]
async fn test_bot_games_finish_for_any_seed() {
    let mut rng = StdRng::seed_from_u64(0x51ce);
    for round in 0..3 {
        let salt: u64 = rng.gen();
        let slots = rng.gen_range(3..=5);
        let tag = format!("Bots{round}");
        let (server, gateway, clock) = harness(&[config(&tag, slots)], salt);
        play_out(&server, &clock, &tag).await;

        // one elimination per starting seat, each position handed out once
        let mut positions: Vec<usize> = gateway
            .on(&Topic::Table(tag.clone()))
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::Elimination { position, .. } => Some(position),
                _ => None,
            })
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, (1..=slots).collect::<Vec<_>>(), "salt {salt}");
    }
}

#[tokio::test]
async fn test_same_salt_same_game() {
    let mut hashes = Vec::new();
    for _ in 0..2 {
        let (server, _, clock) = harness(&[config("Replay", 3)], 99);
        server.seat_bots("Replay").await.unwrap();
        for _ in 0..200 {
            clock.advance_ms(600);
            server.tick("Replay").await.unwrap();
        }
        hashes.push(table(&server, "Replay").await.state_hash());
    }
    assert_eq!(hashes[0], hashes[1]);
}

#[tokio::test]
async fn test_shipped_tables_load() {
    let file = TablesFile::load(&root().join("tables.json")).unwrap();
    assert!(!file.tables.is_empty());
    let store = TableStore::load(&file.tables, &root().join("maps"), 1, 20).unwrap();
    let tags = store.list().await;
    assert_eq!(tags.len(), file.tables.len());
}
