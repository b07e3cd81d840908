//! Table Snapshots
//!
//! Full-state view of a table as published to clients. Derived player stats
//! (lands, connected lands, dice, rank, live score) are computed here so
//! clients never need the adjacency graph.
//!
//! Snapshots are flat structs and encode to both JSON and bincode.

use serde::{Serialize, Deserialize};

use crate::core::clock::to_seconds;
use crate::core::hash::to_hex;
use crate::game::map::max_connected;
use crate::game::rules::{dice_count, grouped_positions, position_score, table_points};
use crate::game::state::{Attack, Emoji, Table, TableStatus, UserId};

/// A seat with its derived stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// User id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub picture: String,
    /// Seat color.
    pub color: i8,
    /// Dice carried to the next reinforcement.
    pub reserve_dice: u32,
    /// Sitting out.
    pub out: bool,
    /// Consecutive out turns.
    pub out_turns: u32,
    /// Account balance.
    pub points: i64,
    /// Account level.
    pub level: u32,
    /// Score earned this game.
    pub score: i64,
    /// Flagged rank.
    pub flag: Option<usize>,
    /// Ready to start.
    pub ready: bool,
    /// Driven by a bot.
    pub bot: bool,
    /// Lands owned.
    pub total_lands: usize,
    /// Largest connected group.
    pub connected_lands: usize,
    /// Dice on all owned lands.
    pub current_dice: u32,
    /// Live rank; tied land counts share a rank.
    pub position: usize,
    /// Score if the game ended now.
    pub live_score: i64,
}

/// A land as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandSnapshot {
    /// Land id.
    pub emoji: Emoji,
    /// Owner color.
    pub color: i8,
    /// Dice.
    pub points: u8,
    /// Owner reserve when this is a capital, -1 otherwise.
    pub capital: i64,
}

/// Full state of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Table tag.
    pub tag: String,
    /// Display name.
    pub name: String,
    /// Map name.
    pub map_name: String,
    /// Seat capacity.
    pub player_slots: usize,
    /// Seats needed for the countdown.
    pub start_slots: usize,
    /// Buy-in.
    pub points: i64,
    /// Max dice per land.
    pub stack_size: u8,
    /// Lifecycle status.
    pub status: TableStatus,
    /// Current game id.
    pub game_id: Option<String>,
    /// Turn holder, -1 without a game.
    pub turn_index: i32,
    /// Turn start in seconds.
    pub turn_start: i64,
    /// Game start or countdown deadline in seconds.
    pub game_start: i64,
    /// Turn counter.
    pub turn_count: u32,
    /// Round counter.
    pub round_count: u32,
    /// Seats at game start.
    pub player_start_count: usize,
    /// Attack waiting for its roll.
    pub attack: Option<Attack>,
    /// Seats in turn order.
    pub players: Vec<PlayerSnapshot>,
    /// Lands in map order.
    pub lands: Vec<LandSnapshot>,
    /// Connected watchers.
    pub watch_count: usize,
    /// Hex SHA-256 of the game state.
    pub state_hash: String,
}

impl TableSnapshot {
    /// Snapshot of `table` as it is now.
    pub fn of(table: &Table) -> Self {
        let positions = grouped_positions(&table.players, &table.lands);
        let stake = table_points(table);

        let players = table
            .players
            .iter()
            .zip(positions)
            .map(|(p, position)| PlayerSnapshot {
                id: p.id.clone(),
                name: p.name.clone(),
                picture: p.picture.clone(),
                color: p.color.0,
                reserve_dice: p.reserve_dice,
                out: p.out,
                out_turns: p.out_turns,
                points: p.points,
                level: p.level,
                score: p.score,
                flag: p.flag,
                ready: p.ready,
                bot: p.is_bot(),
                total_lands: table.land_count(p.color),
                connected_lands: max_connected(&table.lands, &table.adjacency, p.color),
                current_dice: dice_count(&table.lands, p.color),
                position,
                live_score: p.score + position_score(stake, table.player_start_count, position),
            })
            .collect();

        let lands = table
            .lands
            .iter()
            .map(|l| LandSnapshot {
                emoji: l.emoji.clone(),
                color: l.color.0,
                points: l.points,
                capital: if l.capital {
                    table.player_by_color(l.color).map(|p| p.reserve_dice as i64).unwrap_or(0)
                } else {
                    -1
                },
            })
            .collect();

        TableSnapshot {
            tag: table.config.tag.clone(),
            name: table.config.name.clone(),
            map_name: table.config.map_name.clone(),
            player_slots: table.config.player_slots,
            start_slots: table.config.start_slots,
            points: table.config.points,
            stack_size: table.config.stack_size,
            status: table.status,
            game_id: table.game_id.clone(),
            turn_index: table.turn_index.map(|i| i as i32).unwrap_or(-1),
            turn_start: to_seconds(table.turn_start),
            game_start: to_seconds(table.game_start),
            turn_count: table.turn_count,
            round_count: table.round_count,
            player_start_count: table.player_start_count,
            attack: table.attack.clone(),
            players,
            lands,
            watch_count: table.watchers.len(),
            state_hash: to_hex(&table.state_hash()),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::fixtures::*;

    fn game() -> Table {
        let mut t = table(4, 1, 2);
        t.config.params.starting_capitals = true;
        seat(&mut t, &["a", "b"]);
        playing(&mut t);
        paint(&mut t, "r0c0", 1, 3);
        paint(&mut t, "r0c1", 1, 2);
        paint(&mut t, "r0c3", 2, 5);
        t.lands[3].capital = true;
        t.players[1].reserve_dice = 4;
        t
    }

    #[test]
    fn test_derived_player_stats() {
        let snap = TableSnapshot::of(&game());
        let a = &snap.players[0];
        assert_eq!((a.total_lands, a.connected_lands, a.current_dice, a.position), (2, 2, 5, 1));
        assert_eq!(a.live_score, 50);
        let b = &snap.players[1];
        assert_eq!((b.total_lands, b.connected_lands, b.current_dice, b.position), (1, 1, 5, 2));
        assert_eq!(b.live_score, -20);
    }

    #[test]
    fn test_capital_shows_reserve() {
        let snap = TableSnapshot::of(&game());
        assert_eq!(snap.lands[3].capital, 4);
        assert_eq!(snap.lands[0].capital, -1);
    }

    #[test]
    fn test_paused_table_has_no_turn() {
        let t = table(3, 1, 2);
        let snap = TableSnapshot::of(&t);
        assert_eq!(snap.turn_index, -1);
        assert_eq!(snap.status, TableStatus::Paused);
        assert_eq!(snap.state_hash.len(), 64);
    }

    #[test]
    fn test_binary_and_json_agree() {
        let snap = TableSnapshot::of(&game());
        let bytes = snap.to_bytes().unwrap();
        assert_eq!(TableSnapshot::from_bytes(&bytes).unwrap(), snap);
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"status\":\"PLAYING\""));
        assert_eq!(TableSnapshot::from_json(&json).unwrap(), snap);
    }

    #[test]
    fn test_hash_tracks_lands() {
        let mut t = game();
        let before = TableSnapshot::of(&t).state_hash;
        paint(&mut t, "r0c2", 2, 1);
        assert_ne!(TableSnapshot::of(&t).state_hash, before);
    }
}
