//! Property-based tests for ranking, scoring and the turn pointer.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use proptest::prelude::*;

use qdice::config::EngineConfig;
use qdice::core::rng::DeterministicRng;
use qdice::game::map::{Adjacency, MapDefinition};
use qdice::game::rules::{grouped_positions, player_positions, position_score};
use qdice::game::{
    process_system, Color, Context, Player, SystemCommand, Table, TableConfig, TableParams, TableStatus, User,
};

const COLS: usize = 5;
const ROWS: usize = 4;

/// Playing table with `seats` seats. Land `i` goes to seat `owners[i]`, or
/// stays neutral when that seat does not exist.
fn table(seats: usize, owners: &[usize], out: &[bool], turn: usize) -> Table {
    let def = MapDefinition::hex_grid("Hex", COLS, ROWS);
    let adjacency = Arc::new(Adjacency::from_definition(&def).unwrap());
    let mut t = Table::new(
        TableConfig {
            tag: "Prop".into(),
            name: "Prop".into(),
            map_name: "Hex".into(),
            player_slots: seats,
            start_slots: 2,
            points: 0,
            stack_size: 8,
            params: TableParams::default(),
        },
        adjacency,
    );
    for seat in 0..seats {
        let user = User {
            id: format!("p{seat}"),
            name: format!("P{seat}"),
            picture: String::new(),
            points: 0,
            level: 1,
        };
        let mut player = Player::from_user(&user, Some(format!("c{seat}")), 0);
        player.color = Color::for_seat(seat);
        player.out = out.get(seat).copied().unwrap_or(false);
        t.players.push(player);
    }
    for (land, owner) in t.lands.iter_mut().zip(owners) {
        if *owner < seats {
            land.color = Color::for_seat(*owner);
            land.points = 2;
        }
    }
    t.status = TableStatus::Playing;
    t.player_start_count = seats;
    t.turn_index = Some(turn % seats);
    t
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// The winner takes exactly the stake on any table size.
    #[test]
    fn prop_first_place_earns_stake(stake in 1i64..1_000, size in 1usize..10) {
        let multiplier = stake * 10;
        prop_assert_eq!(position_score(multiplier, size, 1), multiplier);
    }

    /// Scores never go up as the position gets worse, and stay multiples of ten.
    #[test]
    fn prop_position_score_monotone(stake in 1i64..1_000, size in 2usize..10) {
        let multiplier = stake * 10;
        let scores: Vec<i64> = (1..=size).map(|p| position_score(multiplier, size, p)).collect();
        for pair in scores.windows(2) {
            prop_assert!(pair[0] >= pair[1], "{:?}", scores);
        }
        prop_assert!(scores.iter().all(|s| s % 10 == 0));
    }

    /// Strict ranks are a permutation of 1..=N; grouped ranks never exceed
    /// them and are shared exactly by seats with equal land counts.
    #[test]
    fn prop_positions_consistent(
        seats in 2usize..7,
        owners in prop::collection::vec(0usize..8, COLS * ROWS),
    ) {
        let t = table(seats, &owners, &[], 0);
        let strict = player_positions(&t.players, &t.lands);
        let grouped = grouped_positions(&t.players, &t.lands);

        let mut sorted = strict.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (1..=seats).collect::<Vec<_>>());

        let counts: Vec<usize> = t.players.iter().map(|p| t.land_count(p.color)).collect();
        for i in 0..seats {
            prop_assert!(grouped[i] <= strict[i]);
            for j in 0..seats {
                prop_assert_eq!(grouped[i] == grouped[j], counts[i] == counts[j]);
            }
        }
    }

    /// After a turn timeout the pointer is on a seat, lands stay within the
    /// stack, and no land belongs to a color nobody holds.
    #[test]
    fn prop_turn_over_keeps_table_valid(
        seats in 2usize..7,
        owners in prop::collection::vec(0usize..8, COLS * ROWS),
        out in prop::collection::vec(any::<bool>(), 6),
        turn in 0usize..6,
        sit_out in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let mut t = table(seats, &owners, &out, turn);
        let config = EngineConfig::default();
        let mut rng = DeterministicRng::new(seed);
        let mut ctx = Context { now: 100_000, rng: &mut rng, config: &config };

        let result = process_system(&mut ctx, &t, &SystemCommand::TurnOver { sit_out }).unwrap();
        result.delta.apply(&mut t);

        match t.turn_index {
            Some(i) => prop_assert!(i < t.players.len()),
            None => prop_assert!(t.players.is_empty()),
        }
        if t.players.len() > 1 && t.players.iter().any(|p| !p.out) {
            prop_assert!(!t.current_player().unwrap().out);
        }
        for land in &t.lands {
            prop_assert!(land.points >= 1 && land.points <= t.stack_size());
            prop_assert!(land.color.is_neutral() || t.player_by_color(land.color).is_some());
        }
    }
}
