//! Tick Decisions
//!
//! Turns wall-clock time into commands. The scheduler asks once per firing
//! what is due for a table; at most one command comes back, and the next
//! firing sees its effect.

use crate::game::bots::{decide, wants_bot};
use crate::game::command::{Actor, ClientCommand, SystemCommand};
use crate::game::commands::{needs_clean, Context};
use crate::game::state::{Player, Table};
use crate::game::turn::roll_delay_ms;

/// What a tick wants done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickAction {
    /// A scheduler command.
    System(SystemCommand),
    /// A bot acting through the client command path.
    Bot {
        /// The bot seat.
        actor: Actor,
        /// Its command.
        command: ClientCommand,
    },
}

/// Next due action for `table`, in priority order.
///
/// While playing: game end, turn pointer repair, pending roll, all-out
/// timeout, out player skip, turn timeout, bot turn. While waiting: game
/// start, bot seating. Cleanup runs when nothing else is due.
pub fn decide_tick(ctx: &mut Context<'_>, table: &Table) -> Option<TickAction> {
    if table.is_playing() {
        if let Some(action) = playing_tick(ctx, table) {
            return Some(action);
        }
        // a pending roll blocks everything else, cleanup included
        if table.attack.is_some() {
            return None;
        }
    } else if should_start(ctx, table) {
        return Some(TickAction::System(SystemCommand::Start));
    } else if wants_bot(ctx, table) {
        return Some(TickAction::System(SystemCommand::AddBot));
    }

    needs_clean(ctx, table).then_some(TickAction::System(SystemCommand::Clean))
}

fn playing_tick(ctx: &mut Context<'_>, table: &Table) -> Option<TickAction> {
    let system = |cmd| Some(TickAction::System(cmd));

    if table.players.len() <= 1 {
        return system(SystemCommand::EndGame);
    }
    let Some(current) = table.current_player() else {
        return system(SystemCommand::TurnOver { sit_out: false });
    };

    if let Some(attack) = table.attack.as_ref() {
        if ctx.now - attack.start >= roll_delay_ms(ctx, table) {
            return system(SystemCommand::Roll);
        }
        return None;
    }

    let turn_ms = ctx.config.turn_ms(table.config.params.turn_seconds);
    let timed_out = ctx.now - table.turn_start >= turn_ms;

    if table.players.iter().all(|p| p.out) {
        return if timed_out { system(SystemCommand::AllOut) } else { None };
    }
    if current.out {
        return system(SystemCommand::TurnOut);
    }
    if timed_out {
        return system(SystemCommand::TurnOver { sit_out: !table.turn_activity });
    }
    if current.is_bot() {
        return decide(ctx, table).map(|(actor, command)| TickAction::Bot { actor, command });
    }
    None
}

/// Whether a waiting table should start its game now.
///
/// Starts when bots fill every seat, when enough seats are taken and all are
/// ready, or when the countdown has run out. Never with fewer than two seats.
pub fn should_start(ctx: &Context<'_>, table: &Table) -> bool {
    if table.is_playing() || table.players.len() < 2 {
        return false;
    }
    let seated = table.players.len();
    let bots_fill = table.all_bots() && seated >= table.config.player_slots;
    let all_ready = seated >= table.config.start_slots && table.players.iter().all(|p| p.ready);
    let countdown_over = table.game_start > 0 && ctx.now >= table.game_start;
    bots_fill || all_ready || countdown_over
}

/// Seat a bot would act from, if the turn is a bot's.
pub fn bot_on_turn(table: &Table) -> Option<&Player> {
    table.current_player().filter(|p| p.is_bot())
}
