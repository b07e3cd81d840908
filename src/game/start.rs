//! Game Start
//!
//! Seeds lands and hands every seat its first land.

use crate::core::rng::DeterministicRng;
use crate::game::command::{CommandKind, CommandResult, IllegalMove, IllegalMoveCode};
use crate::game::commands::Context;
use crate::game::events::TableEvent;
use crate::game::state::{Color, Land, Table, TableStatus};

/// Dice on each seat's first land.
pub const STARTING_DICE: u8 = 4;

/// Random neutral strength: usually small, occasionally half or more of the stack.
pub fn random_points(rng: &mut DeterministicRng, stack_size: u8) -> u8 {
    let stack = stack_size.max(1);
    let r = rng.next_unit();
    if r > 0.98 {
        (stack / 2 + 1).min(stack)
    } else if r > 0.9 {
        (stack / 2).max(1)
    } else {
        rng.next_int_range(1, (stack / 4).max(1) as i32) as u8
    }
}

/// Start a game on a paused table.
pub fn start_game(ctx: &mut Context<'_>, table: &Table) -> Result<CommandResult, IllegalMove> {
    if table.is_playing() {
        return Err(IllegalMove::new(IllegalMoveCode::AlreadyPlaying, "Game already running"));
    }
    if table.players.len() < 2 {
        return Err(IllegalMove::new(
            IllegalMoveCode::NotEnoughPlayers,
            "Need at least two players",
        ));
    }

    let stack = table.stack_size();
    let capitals = table.config.params.starting_capitals;

    let mut lands: Vec<Land> = table
        .lands
        .iter()
        .map(|l| Land {
            color: Color::NEUTRAL,
            points: random_points(ctx.rng, stack),
            capital: false,
            ..l.clone()
        })
        .collect();

    let mut order: Vec<usize> = (0..lands.len()).collect();
    ctx.rng.shuffle(&mut order);

    let mut players = table.players.clone();
    for (seat, player) in players.iter_mut().enumerate() {
        player.color = Color::for_seat(seat);
        player.reserve_dice = 0;
        player.out = false;
        player.out_turns = 0;
        player.score = 0;
        player.flag = None;
        player.ready = false;
        if let Some(bot) = player.bot.as_mut() {
            bot.last_aggressor = None;
            bot.deadlock_count = 0;
        }
        if let Some(&land) = order.get(seat) {
            lands[land].color = player.color;
            lands[land].points = STARTING_DICE.min(stack);
            lands[land].capital = capitals;
        }
    }

    let game_id = uuid::Builder::from_random_bytes(ctx.rng.next_bytes16())
        .into_uuid()
        .to_string();

    let mut result = CommandResult::new(CommandKind::Start);
    let u = &mut result.delta.table;
    u.status = Some(TableStatus::Playing);
    u.game_id = Some(game_id.clone());
    u.game_start = Some(ctx.now);
    u.turn_index = Some(Some(0));
    u.turn_start = Some(ctx.now);
    u.turn_activity = Some(false);
    u.turn_count = Some(1);
    u.round_count = Some(1);
    u.player_start_count = Some(players.len());
    u.attack = Some(None);
    result.delta.lands = Some(lands);
    result.delta.retired = Some(Vec::new());

    result.events.push(TableEvent::GameStarted { game_id });
    result.events.push(TableEvent::TurnStarted {
        player: players.first().map(|p| p.id.clone()),
        turn: 1,
        round: 1,
    });
    result.delta.players = Some(players);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::game::state::fixtures::*;

    fn start(t: &Table, seed: u64) -> Result<CommandResult, IllegalMove> {
        let config = EngineConfig::default();
        let mut rng = DeterministicRng::new(seed);
        let mut ctx = Context { now: 7_000, rng: &mut rng, config: &config };
        start_game(&mut ctx, t)
    }

    #[test]
    fn test_random_points_within_stack() {
        let mut rng = DeterministicRng::new(1);
        for _ in 0..1000 {
            let p = random_points(&mut rng, 8);
            assert!((1..=8).contains(&p));
        }
        assert_eq!(random_points(&mut rng, 1), 1);
    }

    #[test]
    fn test_start_assigns_one_land_per_player() {
        let mut t = table(4, 3, 3);
        seat(&mut t, &["a", "b", "c"]);
        t.players[0].score = 40;
        let result = start(&t, 5).unwrap();
        let lands = result.delta.lands.unwrap();
        for seat in 0..3 {
            let owned: Vec<_> = lands.iter().filter(|l| l.color == Color::for_seat(seat)).collect();
            assert_eq!(owned.len(), 1);
            assert_eq!(owned[0].points, STARTING_DICE);
            assert!(!owned[0].capital);
        }
        let players = result.delta.players.unwrap();
        assert_eq!(players[0].score, 0);
        let u = result.delta.table;
        assert_eq!(u.status, Some(TableStatus::Playing));
        assert_eq!(u.turn_index, Some(Some(0)));
        assert_eq!(u.player_start_count, Some(3));
        assert!(u.game_id.is_some());
    }

    #[test]
    fn test_start_with_capitals() {
        let mut t = table(4, 3, 2);
        t.config.params.starting_capitals = true;
        seat(&mut t, &["a", "b"]);
        let lands = start(&t, 5).unwrap().delta.lands.unwrap();
        assert_eq!(lands.iter().filter(|l| l.capital).count(), 2);
    }

    #[test]
    fn test_start_is_deterministic() {
        let mut t = table(4, 3, 2);
        seat(&mut t, &["a", "b"]);
        assert_eq!(start(&t, 42).unwrap().delta, start(&t, 42).unwrap().delta);
    }

    #[test]
    fn test_start_needs_two_players() {
        let mut t = table(4, 3, 2);
        seat(&mut t, &["a"]);
        assert_eq!(start(&t, 1).unwrap_err().code, IllegalMoveCode::NotEnoughPlayers);
    }
}
