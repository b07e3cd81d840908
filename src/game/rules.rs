//! Shared Rule Helpers
//!
//! Ranking, scoring and seat removal. Everything here is a pure function of
//! the values passed in.

use crate::game::map::{max_connected, Adjacency};
use crate::game::state::{Color, Elimination, EliminationReason, Land, Player, Table, UserId};

/// Buy-in used for scoring free tables.
pub const FREE_TABLE_POINTS: i64 = 50;

/// Whether `player_id` holds the turn.
pub fn has_turn(table: &Table, player_id: &str) -> bool {
    table.current_player().map(|p| p.id == player_id).unwrap_or(false)
}

/// Scoring stake of a table.
pub fn table_points(table: &Table) -> i64 {
    if table.config.points == 0 {
        FREE_TABLE_POINTS
    } else {
        table.config.points
    }
}

/// Points for knocking a player out.
pub fn kill_points(table: &Table) -> i64 {
    table_points(table) / 2
}

/// Live rank of every seat, by land count descending.
///
/// Seat order breaks ties so ranks are always `1..=N` and distinct.
pub fn player_positions(players: &[Player], lands: &[Land]) -> Vec<usize> {
    let counts: Vec<usize> = players
        .iter()
        .map(|p| lands.iter().filter(|l| l.color == p.color).count())
        .collect();
    let mut order: Vec<usize> = (0..players.len()).collect();
    // stable: earlier seat wins a tie
    order.sort_by(|a, b| counts[*b].cmp(&counts[*a]));

    let mut positions = vec![0; players.len()];
    for (rank, seat) in order.into_iter().enumerate() {
        positions[seat] = rank + 1;
    }
    positions
}

/// Live rank of one seat. Zero when not seated.
pub fn player_position(table: &Table, player_id: &str) -> usize {
    table
        .player_index(player_id)
        .map(|i| player_positions(&table.players, &table.lands)[i])
        .unwrap_or(0)
}

/// Rank with ties sharing the better position.
pub fn grouped_positions(players: &[Player], lands: &[Land]) -> Vec<usize> {
    let counts: Vec<usize> = players
        .iter()
        .map(|p| lands.iter().filter(|l| l.color == p.color).count())
        .collect();
    counts
        .iter()
        .map(|mine| 1 + counts.iter().filter(|c| *c > mine).count())
        .collect()
}

/// Score for finishing at `position` out of `game_size`, scaled by `multiplier`.
///
/// First place earns `multiplier`; the curve falls off quadratically and is
/// rounded to a multiple of ten.
pub fn position_score(multiplier: i64, game_size: usize, position: usize) -> i64 {
    if game_size == 0 || position == 0 || position > game_size {
        return 0;
    }
    let size = game_size as f64;
    let inverse = (game_size - position + 1) as f64;
    let factor = (inverse * (inverse / size) - size / 2.0) * 2.0;
    // half-up rounding, also for negatives
    let base = (factor * multiplier as f64 / 10.0 / size + 0.5).floor() as i64;
    base * 10
}

/// Dice a color would receive now: largest connected group plus reserve.
pub fn reinforcement_count(lands: &[Land], adjacency: &Adjacency, player: &Player) -> u32 {
    max_connected(lands, adjacency, player.color) as u32 + player.reserve_dice
}

/// Total dice on a color's lands.
pub fn dice_count(lands: &[Land], color: Color) -> u32 {
    lands.iter().filter(|l| l.color == color).map(|l| l.points as u32).sum()
}

// =============================================================================
// SEAT REMOVAL
// =============================================================================

/// Seats, lands and turn pointer after removing players.
#[derive(Clone, Debug)]
pub struct Removal {
    /// Remaining seats.
    pub players: Vec<Player>,
    /// Lands with removed colors made neutral.
    pub lands: Vec<Land>,
    /// New turn pointer.
    pub turn_index: Option<usize>,
    /// One record per removed player, in removal order.
    pub eliminations: Vec<Elimination>,
}

/// Remove one seat during a game.
///
/// The removed color's lands turn neutral. The turn stays with whoever held
/// it; if that was the removed seat, the next seat inherits the index.
pub fn remove_player(
    players: &[Player],
    lands: &[Land],
    player_id: &str,
    turn_index: Option<usize>,
) -> (Vec<Player>, Vec<Land>, Option<usize>) {
    let Some(removed_at) = players.iter().position(|p| p.id == player_id) else {
        return (players.to_vec(), lands.to_vec(), turn_index);
    };
    let color = players[removed_at].color;

    let remaining: Vec<Player> = players
        .iter()
        .filter(|p| p.id != player_id)
        .cloned()
        .collect();
    let lands = lands
        .iter()
        .map(|l| {
            if l.color == color {
                Land { color: Color::NEUTRAL, capital: false, ..l.clone() }
            } else {
                l.clone()
            }
        })
        .collect();

    let turn_index = match turn_index {
        _ if remaining.is_empty() => None,
        None => None,
        Some(current) if current == removed_at => {
            if current >= remaining.len() {
                Some(0)
            } else {
                Some(current)
            }
        }
        Some(current) => {
            let holder = players.get(current).map(|p| p.id.clone());
            holder
                .and_then(|id| remaining.iter().position(|p| p.id == id))
                .or(Some(0))
        }
    };

    (remaining, lands, turn_index)
}

/// Remove a seat, then every seat whose flag matches the shrinking seat count.
///
/// Pending flags drain bottom rank first: after each removal the seat that
/// flagged exactly the new seat count goes next, at that position.
pub fn remove_player_cascade(
    players: &[Player],
    lands: &[Land],
    turn_index: Option<usize>,
    player_id: &str,
    position: usize,
    reason: EliminationReason,
) -> Removal {
    let mut eliminations = Vec::new();
    let mut queue: Vec<(UserId, usize, EliminationReason)> =
        vec![(player_id.to_string(), position, reason)];

    let mut players = players.to_vec();
    let mut lands = lands.to_vec();
    let mut turn_index = turn_index;

    while let Some((id, position, reason)) = queue.pop() {
        let Some(player) = players.iter().find(|p| p.id == id).cloned() else {
            continue;
        };
        let (p, l, t) = remove_player(&players, &lands, &id, turn_index);
        players = p;
        lands = l;
        turn_index = t;
        eliminations.push(Elimination { player, position, reason });

        let seats = players.len();
        if seats <= 1 {
            break;
        }
        if let Some(next) = players.iter().find(|p| p.flag == Some(seats)) {
            queue.push((
                next.id.clone(),
                seats,
                EliminationReason::Surrendered { flag: seats, under: None },
            ));
        }
    }

    Removal { players, lands, turn_index, eliminations }
}

// =============================================================================
// TESTS
// =============================================================================
