//! Protocol Messages
//!
//! The envelope commands arrive in and the messages the server publishes.
//! Messages are addressed to a [`Topic`]: either everyone watching a table
//! or a single client connection.
//!
//! All messages serialize as JSON. Table snapshots also have a compact
//! bincode form (see [`TableSnapshot::to_bytes`]).

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::core::clock::Timestamp;
use crate::game::command::{ClientCommand, IllegalMove, IllegalMoveCode};
use crate::game::events::TableEvent;
use crate::game::snapshot::TableSnapshot;
use crate::game::state::{ClientId, EliminationReason, User, UserId};

// =============================================================================
// INBOUND
// =============================================================================

/// A client command as delivered to a table.
///
/// `user` is filled in by whatever authenticated the connection; the engine
/// trusts it as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundCommand {
    /// Connection the command came from.
    pub client_id: Option<ClientId>,
    /// Authenticated user, if any.
    pub user: Option<User>,
    /// The command itself.
    #[serde(flatten)]
    pub command: ClientCommand,
}

impl InboundCommand {
    /// Command from a logged-in user.
    pub fn from_user(user: User, client_id: impl Into<ClientId>, command: ClientCommand) -> Self {
        Self { client_id: Some(client_id.into()), user: Some(user), command }
    }

    /// Command from an anonymous connection.
    pub fn anonymous(client_id: impl Into<ClientId>, command: ClientCommand) -> Self {
        Self { client_id: Some(client_id.into()), user: None, command }
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Topic {
    /// Everyone watching a table.
    Table(String),
    /// One connection.
    Client(ClientId),
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Table(tag) => write!(f, "tables/{tag}"),
            Topic::Client(id) => write!(f, "clients/{id}"),
        }
    }
}

/// A chat line kept in a table's backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    /// Sender display name, `None` for system lines.
    pub user: Option<String>,
    /// Text.
    pub message: String,
    /// When it was said.
    pub at: Timestamp,
}

/// Notification settings returned with a profile update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Events the user gets push notifications for.
    #[serde(default)]
    pub push_subscribed: Vec<String>,
    /// Any other stored preference.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Messages published by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full table state.
    Snapshot {
        /// The state.
        table: TableSnapshot,
    },

    /// Something happened at a table.
    Event {
        /// Table tag.
        table: String,
        /// The event.
        event: TableEvent,
    },

    /// A player finished the game.
    Elimination {
        /// Table tag.
        table: String,
        /// Eliminated player.
        player: UserId,
        /// Display name.
        name: String,
        /// Final position.
        position: usize,
        /// Points earned, position award included.
        score: i64,
        /// Why the player left.
        reason: EliminationReason,
    },

    /// Recent chat, sent to a client when it enters.
    ChatBacklog {
        /// Table tag.
        table: String,
        /// Oldest first.
        lines: Vec<ChatLine>,
    },

    /// Refreshed profile after a score change.
    UserUpdate {
        /// The profile.
        user: User,
        /// Notification settings.
        preferences: Preferences,
    },

    /// Something the receiving client did was rejected or failed.
    Error {
        /// Rule code when the error is a rejected move.
        code: Option<IllegalMoveCode>,
        /// Human readable text.
        message: String,
    },
}

impl ServerMessage {
    /// Error message for a rejected command.
    pub fn illegal(err: &IllegalMove) -> Self {
        ServerMessage::Error { code: Some(err.code), message: err.message.clone() }
    }

    /// Error message without a rule code.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { code: None, message: message.into() }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
