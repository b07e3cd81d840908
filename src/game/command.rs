//! Commands, Rejections and Deltas
//!
//! Client commands arrive from the transport; system commands come from the
//! scheduler. Both are processed into a [`CommandResult`], whose [`Delta`]
//! is the only way table state changes.

use serde::{Serialize, Deserialize};

use crate::core::clock::Timestamp;
use crate::game::events::TableEvent;
use crate::game::state::{
    Attack, ClientId, Elimination, Emoji, Land, Player, Table, TableStatus, User, UserId, Watcher,
};

// =============================================================================
// COMMANDS
// =============================================================================

/// Commands a client may send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Start watching.
    Enter,
    /// Stop watching.
    Exit,
    /// Take a seat.
    Join,
    /// Give up a seat before the game starts.
    Leave,
    /// Attack `to` from `from`.
    Attack {
        /// Source land.
        from: Emoji,
        /// Target land.
        to: Emoji,
    },
    /// Pass the turn.
    EndTurn,
    /// Skip turns until sitting back in.
    SitOut,
    /// Resume playing.
    SitIn,
    /// Set readiness.
    ToggleReady {
        /// Ready or not.
        ready: bool,
    },
    /// Agree to surrender once reaching `position`.
    Flag {
        /// Rank the client believes it holds.
        position: usize,
    },
    /// Say something.
    Chat {
        /// Text.
        message: String,
    },
    /// Liveness ping.
    Heartbeat,
}

/// Commands issued by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemCommand {
    /// Resolve the attack in flight.
    Roll,
    /// Turn time ran out.
    TurnOver {
        /// Mark the turn holder out.
        sit_out: bool,
    },
    /// Turn holder is sitting out.
    TurnOut,
    /// Every seat is sitting out.
    AllOut,
    /// Start the game.
    Start,
    /// Seat one bot.
    AddBot,
    /// Drop stale watchers, stale players and surplus bots.
    Clean,
    /// Finish the game.
    EndGame,
}

/// Tag of the command that produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Watcher entered.
    Enter,
    /// Watcher left.
    Exit,
    /// Seat taken.
    Join,
    /// Bot seat taken over.
    Takeover,
    /// Seat given up.
    Leave,
    /// Attack declared.
    Attack,
    /// Attack resolved.
    Roll,
    /// Turn ended by its holder.
    EndTurn,
    /// Turn timed out.
    TickTurnOver,
    /// Out player skipped.
    TickTurnOut,
    /// Everyone out.
    TickTurnAllOut,
    /// Sat out.
    SitOut,
    /// Sat in.
    SitIn,
    /// Ready toggled.
    ToggleReady,
    /// Flag set or surrender.
    Flag,
    /// Chat line.
    Chat,
    /// Liveness ping.
    Heartbeat,
    /// Game started.
    Start,
    /// Bot seated.
    AddBot,
    /// Stale watchers or players dropped.
    Clean,
    /// Game finished.
    EndGame,
}

/// Who sent a command.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Authenticated user, if logged in.
    pub user: Option<User>,
    /// Connection, if any.
    pub client_id: Option<ClientId>,
}

impl Actor {
    /// Logged-in actor on a connection.
    pub fn user(user: User, client_id: impl Into<ClientId>) -> Self {
        Self { user: Some(user), client_id: Some(client_id.into()) }
    }

    /// Anonymous actor on a connection.
    pub fn anonymous(client_id: impl Into<ClientId>) -> Self {
        Self { user: None, client_id: Some(client_id.into()) }
    }

    /// A bot seat acting for itself.
    pub fn bot(player: &Player) -> Self {
        Self {
            user: Some(User {
                id: player.id.clone(),
                name: player.name.clone(),
                picture: player.picture.clone(),
                points: player.points,
                level: player.level,
            }),
            client_id: None,
        }
    }

    /// User id, if logged in.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

// =============================================================================
// REJECTIONS
// =============================================================================

/// Machine-readable rejection reasons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllegalMoveCode {
    /// Command needs a logged-in user.
    NoActor,
    /// Game not running.
    NotPlaying,
    /// Game already running.
    AlreadyPlaying,
    /// Someone else has the turn.
    NotYourTurn,
    /// An attack is waiting for its roll.
    AttackInProgress,
    /// No such land.
    LandNotFound,
    /// Source land is neutral.
    NeutralSource,
    /// Source land belongs to someone else.
    NotOwner,
    /// Source land has a single die.
    NotEnoughDice,
    /// Both lands have the same owner.
    SameColor,
    /// Lands do not share a border.
    NotAdjacent,
    /// Already seated.
    AlreadyJoined,
    /// Balance below buy-in.
    NotEnoughPoints,
    /// No free seat.
    TableFull,
    /// Eliminated from this game.
    Retired,
    /// Game in progress.
    JoinWhilePlaying,
    /// Not seated.
    NotJoined,
    /// Game in progress.
    LeaveWhilePlaying,
    /// Leader cannot surrender.
    FlagFirst,
    /// An existing flag already covers this rank.
    FlagUp,
    /// Surrender not allowed yet this game.
    FlagTooEarly,
    /// Flagged rank differs from live rank.
    FlagMismatch,
    /// Game in progress.
    ReadyWhilePlaying,
    /// Fewer than two seats.
    NotEnoughPlayers,
    /// No bot seat to take over.
    NoBotSeat,
    /// Every bot persona is seated.
    NoPersona,
    /// No game to act on.
    NoGame,
}

/// A command that breaks a rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct IllegalMove {
    /// Reason code.
    pub code: IllegalMoveCode,
    /// Human readable message.
    pub message: String,
    /// Offending source land.
    pub from: Option<Emoji>,
    /// Offending target land.
    pub to: Option<Emoji>,
}

impl IllegalMove {
    /// Rejection without land context.
    pub fn new(code: IllegalMoveCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), from: None, to: None }
    }

    /// Attach the lands involved.
    pub fn with_lands(mut self, from: &str, to: &str) -> Self {
        self.from = Some(from.to_string());
        self.to = Some(to.to_string());
        self
    }
}

// =============================================================================
// DELTAS
// =============================================================================

/// Scalar table fields to overwrite. `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableUpdate {
    /// New status.
    pub status: Option<TableStatus>,
    /// New game id.
    pub game_id: Option<String>,
    /// New countdown deadline or start time.
    pub game_start: Option<Timestamp>,
    /// New turn pointer.
    pub turn_index: Option<Option<usize>>,
    /// New turn start.
    pub turn_start: Option<Timestamp>,
    /// New activity flag.
    pub turn_activity: Option<bool>,
    /// New turn counter.
    pub turn_count: Option<u32>,
    /// New round counter.
    pub round_count: Option<u32>,
    /// New starting seat count.
    pub player_start_count: Option<usize>,
    /// Set or clear the attack in flight.
    pub attack: Option<Option<Attack>>,
}

/// State changes of one command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    /// Scalar fields.
    pub table: TableUpdate,
    /// Replacement lands.
    pub lands: Option<Vec<Land>>,
    /// Replacement seats.
    pub players: Option<Vec<Player>>,
    /// Replacement watchers.
    pub watchers: Option<Vec<Watcher>>,
    /// Replacement retired list.
    pub retired: Option<Vec<UserId>>,
}

impl Delta {
    /// Whether applying this delta changes anything.
    pub fn is_empty(&self) -> bool {
        *self == Delta::default()
    }

    /// Write the delta into a table.
    pub fn apply(self, table: &mut Table) {
        let u = self.table;
        if let Some(v) = u.status {
            table.status = v;
        }
        if let Some(v) = u.game_id {
            table.game_id = Some(v);
        }
        if let Some(v) = u.game_start {
            table.game_start = v;
        }
        if let Some(v) = u.turn_index {
            table.turn_index = v;
        }
        if let Some(v) = u.turn_start {
            table.turn_start = v;
        }
        if let Some(v) = u.turn_activity {
            table.turn_activity = v;
        }
        if let Some(v) = u.turn_count {
            table.turn_count = v;
        }
        if let Some(v) = u.round_count {
            table.round_count = v;
        }
        if let Some(v) = u.player_start_count {
            table.player_start_count = v;
        }
        if let Some(v) = u.attack {
            table.attack = v;
        }
        if let Some(v) = self.lands {
            table.lands = v;
        }
        if let Some(v) = self.players {
            table.players = v;
        }
        if let Some(v) = self.watchers {
            table.watchers = v;
        }
        if let Some(v) = self.retired {
            table.retired = v;
        }
    }
}

/// Output of processing one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandResult {
    /// What produced this result.
    pub kind: CommandKind,
    /// State changes.
    pub delta: Delta,
    /// Players removed from the game, in removal order.
    pub eliminations: Vec<Elimination>,
    /// Facts to publish.
    pub events: Vec<TableEvent>,
    /// Command to run right after this one (game end, immediate start).
    pub follow_up: Option<SystemCommand>,
    /// Liveness bookkeeping only: nothing a client renders changed.
    pub silent: bool,
}

impl CommandResult {
    /// Result with no changes yet.
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            delta: Delta::default(),
            eliminations: Vec::new(),
            events: Vec::new(),
            follow_up: None,
            silent: false,
        }
    }

    /// Add an event.
    pub fn event(mut self, event: TableEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Whether a snapshot should be published after applying.
    pub fn changes_state(&self) -> bool {
        !self.silent && (!self.delta.is_empty() || !self.eliminations.is_empty())
    }
}
