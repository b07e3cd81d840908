//! Table Events
//!
//! Facts produced alongside a state delta. The server turns them into
//! outbound messages after the delta has been applied.

use serde::{Serialize, Deserialize};

use crate::core::clock::Timestamp;
use crate::game::state::{ClientId, Emoji, UserId};

/// Something observable that happened at a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableEvent {
    /// A watcher connected.
    Entered {
        /// Connection id.
        client_id: ClientId,
        /// Display name if logged in.
        name: Option<String>,
    },
    /// A watcher disconnected or timed out.
    Exited {
        /// Connection id.
        client_id: ClientId,
        /// Display name if logged in.
        name: Option<String>,
    },
    /// A player sat down.
    Joined {
        /// Seated user.
        player: UserId,
    },
    /// A human took over a bot seat.
    TookOver {
        /// New seat holder.
        player: UserId,
        /// Bot that was replaced.
        bot: UserId,
    },
    /// A player stood up.
    Left {
        /// User that left.
        player: UserId,
    },
    /// Seat flags changed (ready, out, flag).
    PlayerStatus {
        /// Affected seat.
        player: UserId,
    },
    /// An attack was declared and is waiting for its roll.
    MoveStarted {
        /// Attacker.
        player: UserId,
        /// Source land.
        from: Emoji,
        /// Target land.
        to: Emoji,
    },
    /// An attack was resolved.
    Rolled {
        /// Attacker.
        player: UserId,
        /// Source land.
        from: Emoji,
        /// Target land.
        to: Emoji,
        /// Attacker dice faces.
        from_roll: Vec<u8>,
        /// Defender dice faces.
        to_roll: Vec<u8>,
        /// Attacker won.
        success: bool,
    },
    /// Reinforcements were placed.
    DiceReceived {
        /// Receiving player.
        player: UserId,
        /// Dice granted, including those sent to reserve.
        count: u32,
    },
    /// The turn moved.
    TurnStarted {
        /// New turn holder.
        player: Option<UserId>,
        /// Turn counter.
        turn: u32,
        /// Round counter.
        round: u32,
    },
    /// The game-start countdown changed.
    Countdown {
        /// Deadline, or 0 when cancelled.
        at: Timestamp,
    },
    /// A game started.
    GameStarted {
        /// New game id.
        game_id: String,
    },
    /// A game ended.
    GameEnded {
        /// Winner, if anyone was left.
        winner: Option<UserId>,
    },
    /// A chat line.
    Chat {
        /// Sender display name, if any.
        user: Option<String>,
        /// Message text.
        message: String,
    },
}

impl TableEvent {
    /// Events that change seats, used to decide when to log at info level.
    pub fn is_seat_change(&self) -> bool {
        matches!(
            self,
            TableEvent::Joined { .. } | TableEvent::Left { .. } | TableEvent::TookOver { .. }
        )
    }
}
