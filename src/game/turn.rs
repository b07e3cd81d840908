//! Turn Manager
//!
//! Reinforcement placement and the turn pointer walk. The walk is a loop,
//! not recursion: each step either settles on a seat or removes one.

use crate::config::millis;
use crate::core::rng::DeterministicRng;
use crate::game::command::{CommandKind, CommandResult, SystemCommand};
use crate::game::commands::Context;
use crate::game::events::TableEvent;
use crate::game::map::{max_connected, neighbours, Adjacency};
use crate::game::rules::{player_positions, remove_player_cascade};
use crate::game::state::{EliminationReason, Land, Player, Table, UserId};

/// Place reinforcements for `player` on `lands`.
///
/// The player receives one die per land of its largest connected group plus
/// its reserve. Each die lands on a random owned land below `stack_size`.
/// With capitals, dice beyond the connected count go to the capital while it
/// has room. Dice with nowhere to go become the new reserve.
///
/// Returns the number of dice granted.
pub fn give_dice(
    rng: &mut DeterministicRng,
    adjacency: &Adjacency,
    stack_size: u8,
    capitals: bool,
    lands: &mut [Land],
    player: &mut Player,
) -> u32 {
    let connected = max_connected(lands, adjacency, player.color) as u32;
    let total = connected + player.reserve_dice;
    let mut reserve = 0;

    for i in 0..total {
        if capitals && i >= connected {
            let capital = lands
                .iter()
                .position(|l| l.color == player.color && l.capital && l.points < stack_size);
            if let Some(c) = capital {
                lands[c].points += 1;
                continue;
            }
        }

        let eligible: Vec<usize> = lands
            .iter()
            .enumerate()
            .filter(|(_, l)| l.color == player.color && l.points < stack_size)
            .map(|(i, _)| i)
            .collect();
        match rng.choose(&eligible) {
            Some(&target) => lands[target].points += 1,
            None => reserve += 1,
        }
    }

    player.reserve_dice = reserve;
    total
}

/// End the current turn and move the pointer.
///
/// The seat ending its turn receives reinforcements (and is marked out first
/// when `sit_out` is set), then the pointer walks on as in [`hand_over`].
///
/// `players` and `lands` are the working copies to start from.
pub fn advance_turn(
    ctx: &mut Context<'_>,
    table: &Table,
    mut players: Vec<Player>,
    mut lands: Vec<Land>,
    kind: CommandKind,
    sit_out: bool,
) -> CommandResult {
    let mut result = CommandResult::new(kind);
    let stack = table.stack_size();
    let capitals = table.config.params.starting_capitals;

    let current = table.turn_index.filter(|i| *i < players.len());
    if let Some(cur) = current {
        if sit_out {
            players[cur].out = true;
            result.events.push(TableEvent::PlayerStatus { player: players[cur].id.clone() });
        }
        let count = give_dice(ctx.rng, &table.adjacency, stack, capitals, &mut lands, &mut players[cur]);
        result.events.push(TableEvent::DiceReceived { player: players[cur].id.clone(), count });
    }

    let handover = Handover { players, lands, index: current, retired: table.retired.clone() };
    hand_over(ctx, table, handover, true, &mut result);
    result
}

/// Working copies carried into a pointer walk.
pub(crate) struct Handover {
    pub players: Vec<Player>,
    pub lands: Vec<Land>,
    /// Seat the walk starts from.
    pub index: Option<usize>,
    /// Retired ids so far, including any removals already in the result.
    pub retired: Vec<UserId>,
}

/// Walk the turn pointer round-robin and write the new turn into `result`.
///
/// With `advance` set the walk first steps past `from.index`; otherwise the
/// seat already at the index is examined first. On each seat:
/// - a seat that flagged at or below its live rank while ranked last
///   surrenders on arrival;
/// - an out seat passes: it receives reinforcements and its out counter
///   increments, or it is eliminated once the counter exceeds the limit;
/// - the walk stops on the first seat that is in, or on an out seat when
///   every seat is out.
pub(crate) fn hand_over(
    ctx: &mut Context<'_>,
    table: &Table,
    from: Handover,
    mut advance: bool,
    result: &mut CommandResult,
) {
    let Handover { mut players, mut lands, mut index, mut retired } = from;
    let stack = table.stack_size();
    let capitals = table.config.params.starting_capitals;
    let mut turn_count = table.turn_count;
    let mut round_count = table.round_count;
    // every step advances past or removes a seat; this bounds the walk
    let mut budget = players.len() * (ctx.config.out_turn_limit as usize + 3) + 1;

    while !players.is_empty() && budget > 0 {
        budget -= 1;

        if advance {
            let next = match index {
                Some(i) => (i + 1) % players.len(),
                None => 0,
            };
            turn_count += 1;
            if next == 0 {
                round_count += 1;
            }
            index = Some(next);
        }
        advance = true;

        let Some(at) = index.filter(|i| *i < players.len()) else {
            index = Some(0);
            continue;
        };
        let seats = players.len();
        let position = player_positions(&players, &lands)[at];
        let holder = players[at].clone();

        if holder.flag.map(|f| f >= position).unwrap_or(false) && position == seats {
            let removal = remove_player_cascade(
                &players,
                &lands,
                index,
                &holder.id,
                position,
                EliminationReason::Surrendered { flag: position, under: None },
            );
            retired.extend(removal.eliminations.iter().map(|e| e.player.id.clone()));
            result.eliminations.extend(removal.eliminations);
            players = removal.players;
            lands = removal.lands;
            index = removal.turn_index;
            if players.len() <= 1 {
                break;
            }
            // the next seat inherited the index
            advance = false;
            continue;
        }

        if !holder.out {
            break;
        }

        if holder.out_turns > ctx.config.out_turn_limit {
            let removal = remove_player_cascade(
                &players,
                &lands,
                index,
                &holder.id,
                seats,
                EliminationReason::TimedOut { turns: holder.out_turns },
            );
            retired.extend(removal.eliminations.iter().map(|e| e.player.id.clone()));
            result.eliminations.extend(removal.eliminations);
            players = removal.players;
            lands = removal.lands;
            index = removal.turn_index;
            if players.len() <= 1 {
                break;
            }
            advance = false;
            continue;
        }

        players[at].out_turns += 1;
        if players.iter().all(|p| p.out) {
            break;
        }
        let count = give_dice(ctx.rng, &table.adjacency, stack, capitals, &mut lands, &mut players[at]);
        result.events.push(TableEvent::DiceReceived { player: players[at].id.clone(), count });
    }

    if players.is_empty() {
        index = None;
    }

    let u = &mut result.delta.table;
    u.turn_index = Some(index);
    u.turn_start = Some(ctx.now);
    u.turn_activity = Some(false);
    u.turn_count = Some(turn_count);
    u.round_count = Some(round_count);
    result.delta.players = Some(players.clone());
    result.delta.lands = Some(lands);
    if !result.eliminations.is_empty() {
        result.delta.retired = Some(retired);
    }

    result.events.push(TableEvent::TurnStarted {
        player: index.and_then(|i| players.get(i)).map(|p| p.id.clone()),
        turn: turn_count,
        round: round_count,
    });

    if table.is_playing() && players.len() <= 1 {
        result.follow_up = Some(SystemCommand::EndGame);
    }
}

/// Whether `player` still has a land that could attack.
pub fn can_attack(table: &Table, lands: &[Land], player: &Player) -> bool {
    lands.iter().any(|land| {
        land.color == player.color
            && land.points > 1
            && neighbours(lands, &table.adjacency, &land.emoji)
                .into_iter()
                .any(|n| lands[n].color != player.color)
    })
}

/// Turn start after an attack: full reset while the attacker can continue,
/// otherwise half of the turn is gone.
pub fn turn_start_after_attack(ctx: &Context<'_>, table: &Table, lands: &[Land], player: &Player) -> i64 {
    if can_attack(table, lands, player) {
        ctx.now
    } else {
        ctx.now - ctx.config.turn_ms(table.config.params.turn_seconds) / 2
    }
}

/// Roll delay for the current turn holder, in milliseconds.
pub fn roll_delay_ms(ctx: &Context<'_>, table: &Table) -> i64 {
    match table.current_player() {
        Some(p) if p.is_bot() => millis(ctx.config.bot_roll_delay),
        _ => millis(ctx.config.roll_delay),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::game::state::fixtures::*;
    use crate::game::state::Color;

    fn run(table: &Table, seed: u64) -> CommandResult {
        let config = EngineConfig::default();
        let mut rng = DeterministicRng::new(seed);
        let mut ctx = Context { now: 50_000, rng: &mut rng, config: &config };
        advance_turn(
            &mut ctx,
            table,
            table.players.clone(),
            table.lands.clone(),
            CommandKind::EndTurn,
            false,
        )
    }

    fn three_players() -> Table {
        let mut t = table(3, 2, 3);
        seat(&mut t, &["a", "b", "c"]);
        playing(&mut t);
        paint(&mut t, "r0c0", 1, 1);
        paint(&mut t, "r0c1", 1, 1);
        paint(&mut t, "r0c2", 2, 1);
        paint(&mut t, "r1c0", 3, 1);
        t
    }

    #[test]
    fn test_give_dice_counts_largest_group() {
        let mut t = table(4, 1, 2);
        seat(&mut t, &["a", "b"]);
        // a owns r0c0, r0c1 (connected) and r0c3 (separate)
        paint(&mut t, "r0c0", 1, 1);
        paint(&mut t, "r0c1", 1, 1);
        paint(&mut t, "r0c2", 2, 1);
        paint(&mut t, "r0c3", 1, 1);
        let mut lands = t.lands.clone();
        let mut player = t.players[0].clone();
        player.reserve_dice = 1;
        let mut rng = DeterministicRng::new(3);
        let granted = give_dice(&mut rng, &t.adjacency, 8, false, &mut lands, &mut player);
        assert_eq!(granted, 3);
        let before: u32 = t.lands.iter().filter(|l| l.color == Color(1)).map(|l| l.points as u32).sum();
        let after: u32 = lands.iter().filter(|l| l.color == Color(1)).map(|l| l.points as u32).sum();
        assert_eq!(after - before, 3);
        assert_eq!(player.reserve_dice, 0);
    }

    #[test]
    fn test_give_dice_overflow_goes_to_reserve() {
        let mut t = table(2, 1, 2);
        seat(&mut t, &["a", "b"]);
        paint(&mut t, "r0c0", 1, 8);
        paint(&mut t, "r0c1", 1, 7);
        let mut lands = t.lands.clone();
        let mut player = t.players[0].clone();
        let mut rng = DeterministicRng::new(3);
        let granted = give_dice(&mut rng, &t.adjacency, 8, false, &mut lands, &mut player);
        assert_eq!(granted, 2);
        assert!(lands.iter().all(|l| l.points == 8));
        assert_eq!(player.reserve_dice, 1);
    }

    #[test]
    fn test_give_dice_prefers_capital_for_reserve() {
        let mut t = table(3, 1, 2);
        seat(&mut t, &["a", "b"]);
        paint(&mut t, "r0c0", 1, 1);
        paint(&mut t, "r0c2", 1, 1);
        t.lands[2].capital = true;
        let mut lands = t.lands.clone();
        let mut player = t.players[0].clone();
        player.reserve_dice = 3;
        let mut rng = DeterministicRng::new(9);
        give_dice(&mut rng, &t.adjacency, 8, true, &mut lands, &mut player);
        // one connected die anywhere, three reserve dice on the capital
        assert!(lands[2].points >= 4);
    }

    #[test]
    fn test_round_robin_and_round_counter() {
        let mut t = three_players();
        t.turn_index = Some(2);
        let result = run(&t, 1);
        assert_eq!(result.delta.table.turn_index, Some(Some(0)));
        assert_eq!(result.delta.table.round_count, Some(2));
        assert_eq!(result.delta.table.turn_count, Some(2));
        assert!(result.follow_up.is_none());
    }

    #[test]
    fn test_skips_out_player() {
        let mut t = three_players();
        t.players[1].out = true;
        let result = run(&t, 1);
        assert_eq!(result.delta.table.turn_index, Some(Some(2)));
        let players = result.delta.players.unwrap();
        assert_eq!(players[1].out_turns, 1);
    }

    #[test]
    fn test_all_out_stops_on_next_seat() {
        let mut t = three_players();
        for p in &mut t.players {
            p.out = true;
        }
        let result = run(&t, 1);
        assert_eq!(result.delta.table.turn_index, Some(Some(1)));
    }

    #[test]
    fn test_chronic_out_player_eliminated() {
        let mut t = three_players();
        t.players[1].out = true;
        t.players[1].out_turns = 6;
        let result = run(&t, 1);
        assert_eq!(result.eliminations.len(), 1);
        let e = &result.eliminations[0];
        assert_eq!(e.player.id, "b");
        assert_eq!(e.position, 3);
        assert_eq!(e.reason, EliminationReason::TimedOut { turns: 6 });
        // c inherits seat 1
        assert_eq!(result.delta.table.turn_index, Some(Some(1)));
        assert_eq!(result.delta.players.unwrap()[1].id, "c");
        assert_eq!(result.delta.retired, Some(vec!["b".to_string()]));
    }

    #[test]
    fn test_last_out_player_ends_game() {
        let mut t = table(3, 2, 2);
        seat(&mut t, &["a", "b"]);
        playing(&mut t);
        paint(&mut t, "r0c0", 1, 1);
        paint(&mut t, "r0c1", 2, 1);
        t.players[1].out = true;
        t.players[1].out_turns = 6;
        let result = run(&t, 1);
        assert_eq!(result.eliminations.len(), 1);
        assert_eq!(result.follow_up, Some(SystemCommand::EndGame));
    }

    #[test]
    fn test_flagged_last_player_surrenders_on_turn() {
        let mut t = three_players();
        // c holds one land, ranks 3 of 3
        t.players[2].flag = Some(3);
        t.turn_index = Some(1);
        let result = run(&t, 1);
        assert_eq!(result.eliminations.len(), 1);
        assert_eq!(result.eliminations[0].player.id, "c");
        // pointer wrapped to a
        assert_eq!(result.delta.table.turn_index, Some(Some(0)));
    }

    #[test]
    fn test_turn_index_always_valid() {
        for seed in 0..20 {
            let mut t = three_players();
            t.turn_index = Some((seed % 3) as usize);
            t.players[(seed % 3) as usize].out = seed % 2 == 0;
            let result = run(&t, seed);
            let players = result.delta.players.unwrap();
            let index = result.delta.table.turn_index.unwrap().unwrap();
            assert!(index < players.len());
            if players.iter().any(|p| !p.out) {
                assert!(!players[index].out);
            }
        }
    }
}
