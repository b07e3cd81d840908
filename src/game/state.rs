//! Table State Definitions
//!
//! The [`Table`] aggregate and everything it owns. Rule code never mutates a
//! `Table` directly; it builds a [`CommandResult`](crate::game::command::CommandResult)
//! and the table store applies it.

use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::core::clock::Timestamp;
use crate::core::hash::{StateHash, compute_state_hash};
use crate::game::map::Adjacency;

/// Land identifier (the map cell's emoji).
pub type Emoji = String;

/// Authenticated user identifier.
pub type UserId = String;

/// Transport connection identifier.
pub type ClientId = String;

// =============================================================================
// COLOR
// =============================================================================

/// Seat/ownership marker. Seats are colored `1..=N` in seat order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Color(pub i8);

impl Color {
    /// Unowned land.
    pub const NEUTRAL: Color = Color(-1);

    /// Color of the seat at `index`.
    pub fn for_seat(index: usize) -> Self {
        Color((index + 1) as i8)
    }

    /// True for the reserved neutral value (and anything below the first seat).
    pub fn is_neutral(self) -> bool {
        self.0 < 1
    }
}

// =============================================================================
// LAND
// =============================================================================

/// One map territory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Land {
    /// Map cell id.
    pub emoji: Emoji,
    /// Owner.
    pub color: Color,
    /// Dice on the land, `1..=stack_size`.
    pub points: u8,
    /// Owner's capital.
    pub capital: bool,
}

impl Land {
    /// Land without capital.
    pub fn new(emoji: impl Into<Emoji>, color: Color, points: u8) -> Self {
        Self { emoji: emoji.into(), color, points, capital: false }
    }
}

// =============================================================================
// USERS & PLAYERS
// =============================================================================

/// Already-authenticated identity handed in with a command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    #[serde(default)]
    pub picture: String,
    /// Points balance (buy-in check).
    #[serde(default)]
    pub points: i64,
    /// Account level.
    #[serde(default)]
    pub level: u32,
}

/// Bot decision styles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotStrategy {
    /// Mostly careless, sometimes careful.
    RandomCareless,
    /// Careful unless it can refill everything anyway.
    RandomCareful,
    /// Goes after whoever attacked it last.
    Revengeful,
    /// Avoids targets that could be retaken.
    TargetCareful,
    /// Avoids targets next to any strong hostile land.
    ExtraCareful,
}

/// A bot identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotPersona {
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub picture: String,
    /// Decision style.
    pub strategy: BotStrategy,
}

/// Per-bot decision memory, owned by the bot's seat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotState {
    /// Who this bot is.
    pub persona: BotPersona,
    /// Last player that attacked one of this bot's lands.
    pub last_aggressor: Option<UserId>,
    /// Consecutive turns ended without attacking.
    pub deadlock_count: u32,
}

/// A seated player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// User id (`bot_<name>` for bots).
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub picture: String,
    /// Connection to send private messages to.
    pub client_id: Option<ClientId>,
    /// Seat color.
    pub color: Color,
    /// Dice that did not fit on any land.
    pub reserve_dice: u32,
    /// Sitting out.
    pub out: bool,
    /// Consecutive turns passed while out.
    pub out_turns: u32,
    /// Points balance at join time.
    pub points: i64,
    /// Account level.
    pub level: u32,
    /// In-game score (kill awards).
    pub score: i64,
    /// Rank this player agreed to surrender at.
    pub flag: Option<usize>,
    /// Ready to start.
    pub ready: bool,
    /// When the player sat down.
    pub joined: Timestamp,
    /// Last heartbeat.
    pub last_beat: Timestamp,
    /// Present for bot seats.
    pub bot: Option<BotState>,
}

impl Player {
    /// Seat for an authenticated user.
    pub fn from_user(user: &User, client_id: Option<ClientId>, now: Timestamp) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            client_id,
            color: Color::NEUTRAL,
            reserve_dice: 0,
            out: false,
            out_turns: 0,
            points: user.points,
            level: user.level,
            score: 0,
            flag: None,
            ready: false,
            joined: now,
            last_beat: now,
            bot: None,
        }
    }

    /// Whether a bot drives this seat.
    pub fn is_bot(&self) -> bool {
        self.bot.is_some()
    }
}

/// A connected observer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watcher {
    /// Connection id.
    pub client_id: ClientId,
    /// Linked user, if logged in.
    pub user_id: Option<UserId>,
    /// Display name, if logged in.
    pub name: Option<String>,
    /// Last heartbeat.
    pub last_beat: Timestamp,
}

/// The attack waiting for its roll.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    /// Source land.
    pub from: Emoji,
    /// Target land.
    pub to: Emoji,
    /// When the attack was declared.
    pub start: Timestamp,
    /// Connection of the attacker.
    pub client_id: Option<ClientId>,
}

// =============================================================================
// ELIMINATIONS
// =============================================================================

/// Stakes handed to the last opponent when a bot gives up head-to-head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderStake {
    /// Player receiving the points.
    pub player: UserId,
    /// Points awarded.
    pub points: i64,
}

/// Why a player left the game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EliminationReason {
    /// Lost the last land in combat.
    Died {
        /// Attacker.
        killer: UserId,
        /// Attacker's display name.
        killer_name: String,
        /// Points the attacker gained.
        points: i64,
    },
    /// Sat out too many turns.
    TimedOut {
        /// Out turns at elimination.
        turns: u32,
    },
    /// Flagged and reached the flagged rank.
    Surrendered {
        /// Flagged rank.
        flag: usize,
        /// Stakes moved to the remaining player, if any.
        under: Option<UnderStake>,
    },
    /// Last one standing.
    Won {
        /// Turns played.
        turns: u32,
    },
}

impl EliminationReason {
    /// Symbol used in chat and logs.
    pub fn symbol(&self) -> &'static str {
        match self {
            EliminationReason::Died { .. } => "☠",
            EliminationReason::TimedOut { .. } => "💤",
            EliminationReason::Surrendered { .. } => "🏳",
            EliminationReason::Won { .. } => "🏆",
        }
    }
}

/// A player leaving the game with a final position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elimination {
    /// The player as they were when removed.
    pub player: Player,
    /// Finishing position, 1 = winner.
    pub position: usize,
    /// Reason and payload.
    pub reason: EliminationReason,
}

// =============================================================================
// TABLE
// =============================================================================

/// Table lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    /// Waiting for players.
    Paused,
    /// Game in progress.
    Playing,
    /// Last game ended, nobody seated yet.
    Finished,
}

/// Optional per-table rules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableParams {
    /// Rounds before surrender flags are accepted.
    pub no_flag_rounds: u32,
    /// Never fill seats with bots.
    pub bot_less: bool,
    /// Give each player a capital at start.
    pub starting_capitals: bool,
    /// Start as soon as this many seated players are ready.
    pub ready_slots: Option<usize>,
    /// Turn length override.
    pub turn_seconds: Option<u32>,
}

/// Static configuration of a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Unique table tag.
    pub tag: String,
    /// Display name.
    pub name: String,
    /// Map to load.
    pub map_name: String,
    /// Seat capacity.
    pub player_slots: usize,
    /// Seats needed before the countdown starts.
    pub start_slots: usize,
    /// Buy-in. Zero means a free table.
    #[serde(default)]
    pub points: i64,
    /// Max dice per land.
    pub stack_size: u8,
    /// Optional rules.
    #[serde(default)]
    pub params: TableParams,
}

/// One game table.
#[derive(Clone, Debug)]
pub struct Table {
    /// Static configuration.
    pub config: TableConfig,
    /// Border graph of the map.
    pub adjacency: Arc<Adjacency>,
    /// Lifecycle status.
    pub status: TableStatus,
    /// Id of the game in progress or last played.
    pub game_id: Option<String>,
    /// Countdown deadline (0 when unset), or when the game started.
    pub game_start: Timestamp,
    /// Seat holding the turn. `None` when there is no game.
    pub turn_index: Option<usize>,
    /// When the current turn began.
    pub turn_start: Timestamp,
    /// Current player attacked this turn.
    pub turn_activity: bool,
    /// Turns played.
    pub turn_count: u32,
    /// Rounds played.
    pub round_count: u32,
    /// Seats at game start.
    pub player_start_count: usize,
    /// Attack waiting for its roll.
    pub attack: Option<Attack>,
    /// Seats in turn order.
    pub players: Vec<Player>,
    /// Lands in map order.
    pub lands: Vec<Land>,
    /// Observers.
    pub watchers: Vec<Watcher>,
    /// Players eliminated from the current game.
    pub retired: Vec<UserId>,
}

impl Table {
    /// Fresh paused table with every land neutral.
    pub fn new(config: TableConfig, adjacency: Arc<Adjacency>) -> Self {
        let lands = adjacency
            .lands()
            .iter()
            .map(|e| Land::new(e.clone(), Color::NEUTRAL, 1))
            .collect();
        Self {
            config,
            adjacency,
            status: TableStatus::Paused,
            game_id: None,
            game_start: 0,
            turn_index: None,
            turn_start: 0,
            turn_activity: false,
            turn_count: 1,
            round_count: 1,
            player_start_count: 0,
            attack: None,
            players: Vec::new(),
            lands,
            watchers: Vec::new(),
            retired: Vec::new(),
        }
    }

    /// Table tag.
    pub fn tag(&self) -> &str {
        &self.config.tag
    }

    /// Max dice per land.
    pub fn stack_size(&self) -> u8 {
        self.config.stack_size
    }

    /// Game in progress.
    pub fn is_playing(&self) -> bool {
        self.status == TableStatus::Playing
    }

    /// Land by id.
    pub fn land(&self, emoji: &str) -> Option<&Land> {
        self.lands.iter().find(|l| l.emoji == emoji)
    }

    /// Index of a land in `lands`.
    pub fn land_index(&self, emoji: &str) -> Option<usize> {
        self.lands.iter().position(|l| l.emoji == emoji)
    }

    /// Seat by user id.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Seat index by user id.
    pub fn player_index(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// Seat owning a color.
    pub fn player_by_color(&self, color: Color) -> Option<&Player> {
        self.players.iter().find(|p| p.color == color)
    }

    /// Seat holding the turn.
    pub fn current_player(&self) -> Option<&Player> {
        self.turn_index.and_then(|i| self.players.get(i))
    }

    /// Number of lands owned by a color.
    pub fn land_count(&self, color: Color) -> usize {
        self.lands.iter().filter(|l| l.color == color).count()
    }

    /// Seated bots.
    pub fn bot_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_bot()).count()
    }

    /// Seated humans.
    pub fn human_count(&self) -> usize {
        self.players.len() - self.bot_count()
    }

    /// Every seat is a bot (false for an empty table).
    pub fn all_bots(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(Player::is_bot)
    }

    /// Digest of status, turn pointer, counters, seats and lands.
    pub fn state_hash(&self) -> StateHash {
        compute_state_hash(self.tag(), |h| {
            h.update_u8(self.status as u8);
            h.update_i64(self.turn_index.map(|i| i as i64).unwrap_or(-1));
            h.update_u32(self.turn_count);
            h.update_u32(self.round_count);
            h.update_bool(self.attack.is_some());
            h.update_u32(self.players.len() as u32);
            for p in &self.players {
                h.update_str(&p.id);
                h.update_u8(p.color.0 as u8);
                h.update_u32(p.reserve_dice);
                h.update_bool(p.out);
            }
            for l in &self.lands {
                h.update_str(&l.emoji);
                h.update_u8(l.color.0 as u8);
                h.update_u8(l.points);
                h.update_bool(l.capital);
            }
        })
    }
}

// =============================================================================
// TEST FIXTURES
// =============================================================================

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::game::map::MapDefinition;

    /// `cols` x `rows` hex table.
    pub fn table(cols: usize, rows: usize, slots: usize) -> Table {
        let def = MapDefinition::hex_grid("Hex", cols, rows);
        let adjacency = Arc::new(Adjacency::from_definition(&def).unwrap());
        Table::new(
            TableConfig {
                tag: "Test".into(),
                name: "Test".into(),
                map_name: "Hex".into(),
                player_slots: slots,
                start_slots: slots,
                points: 0,
                stack_size: 8,
                params: TableParams::default(),
            },
            adjacency,
        )
    }

    pub fn user(id: &str) -> User {
        User {
            id: id.into(),
            name: id.to_uppercase(),
            picture: String::new(),
            points: 1_000,
            level: 1,
        }
    }

    /// Seat `ids` in order and color them.
    pub fn seat(table: &mut Table, ids: &[&str]) {
        for (i, id) in ids.iter().enumerate() {
            let mut p = Player::from_user(&user(id), Some(format!("c-{id}")), 0);
            p.color = Color::for_seat(i);
            table.players.push(p);
        }
    }

    /// Put the table into play with the turn on seat 0.
    pub fn playing(table: &mut Table) {
        table.status = TableStatus::Playing;
        table.turn_index = Some(0);
        table.player_start_count = table.players.len();
    }

    /// Set owner and dice of a land.
    pub fn paint(table: &mut Table, emoji: &str, color: i8, points: u8) {
        let land = table.lands.iter_mut().find(|l| l.emoji == emoji).unwrap();
        land.color = Color(color);
        land.points = points;
    }
}
