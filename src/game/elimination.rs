//! Game End & Elimination Scoring

use crate::game::command::{CommandKind, CommandResult};
use crate::game::events::TableEvent;
use crate::game::rules::{player_positions, position_score, table_points};
use crate::game::state::{Elimination, EliminationReason, Table, TableStatus};

/// Finish the game.
///
/// The best-ranked remaining seat (normally the only one) gets a win
/// elimination at position 1. Seats, turn pointer and countdown are cleared;
/// lands stay as they ended for display.
pub fn end_game(table: &Table) -> CommandResult {
    let mut result = CommandResult::new(CommandKind::EndGame);

    let positions = player_positions(&table.players, &table.lands);
    let winner = table
        .players
        .iter()
        .zip(positions)
        .find(|(_, position)| *position == 1)
        .map(|(p, _)| p.clone());

    if let Some(player) = winner.as_ref() {
        result.eliminations.push(Elimination {
            player: player.clone(),
            position: 1,
            reason: EliminationReason::Won { turns: table.turn_count },
        });
    }

    let u = &mut result.delta.table;
    u.status = Some(TableStatus::Finished);
    u.turn_index = Some(None);
    u.game_start = Some(0);
    u.turn_count = Some(1);
    u.round_count = Some(1);
    u.attack = Some(None);
    result.delta.players = Some(Vec::new());
    result.delta.retired = Some(Vec::new());

    result.events.push(TableEvent::GameEnded { winner: winner.map(|p| p.id) });
    result
}

/// Final score of an elimination: in-game score plus the position award.
pub fn elimination_score(table: &Table, elimination: &Elimination) -> i64 {
    elimination.player.score
        + position_score(table_points(table), table.player_start_count, elimination.position)
}
