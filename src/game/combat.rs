//! Combat Resolver
//!
//! Resolves the attack in flight once its roll delay has passed.

use crate::game::command::{CommandKind, CommandResult, IllegalMove, IllegalMoveCode, SystemCommand};
use crate::game::commands::Context;
use crate::game::events::TableEvent;
use crate::game::rules::{kill_points, remove_player_cascade};
use crate::game::state::{Color, EliminationReason, Land, Table};
use crate::game::turn::turn_start_after_attack;

/// Dice faces of one attack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roll {
    /// Attacker faces.
    pub from: Vec<u8>,
    /// Defender faces.
    pub to: Vec<u8>,
}

impl Roll {
    /// Attacker wins strictly on a higher sum.
    pub fn attacker_wins(&self) -> bool {
        sum(&self.from) > sum(&self.to)
    }
}

fn sum(faces: &[u8]) -> u32 {
    faces.iter().map(|f| *f as u32).sum()
}

/// Resolve `table.attack` with fresh dice from the table RNG.
pub fn resolve_roll(ctx: &mut Context<'_>, table: &Table) -> Result<CommandResult, IllegalMove> {
    let attack = table
        .attack
        .as_ref()
        .ok_or_else(|| IllegalMove::new(IllegalMoveCode::NoGame, "No attack to resolve"))?;
    let (from, to) = match (table.land(&attack.from), table.land(&attack.to)) {
        (Some(f), Some(t)) => (f, t),
        _ => {
            return Err(IllegalMove::new(IllegalMoveCode::LandNotFound, "Land not found")
                .with_lands(&attack.from, &attack.to))
        }
    };
    let roll = Roll {
        from: ctx.rng.roll_dice(from.points),
        to: ctx.rng.roll_dice(to.points),
    };
    Ok(apply_roll(ctx, table, roll))
}

/// Apply a known roll to `table.attack`.
///
/// On a win the target takes the attacker's color with `source - 1` dice.
/// The source keeps a single die either way. A defender left without lands
/// is eliminated, followed by any surrender cascade that removal unlocks.
pub fn apply_roll(ctx: &mut Context<'_>, table: &Table, roll: Roll) -> CommandResult {
    let mut result = CommandResult::new(CommandKind::Roll);
    let Some(attack) = table.attack.clone() else {
        return result;
    };
    result.delta.table.attack = Some(None);

    let (Some(from_idx), Some(to_idx)) = (table.land_index(&attack.from), table.land_index(&attack.to)) else {
        return result;
    };
    let mut lands: Vec<Land> = table.lands.clone();
    let mut players = table.players.clone();
    let attacker_color = lands[from_idx].color;
    let defender_color = lands[to_idx].color;
    let was_capital = lands[to_idx].capital;
    let success = roll.attacker_wins();

    if success {
        lands[to_idx] = Land {
            color: attacker_color,
            points: lands[from_idx].points.saturating_sub(1).max(1),
            capital: false,
            ..lands[to_idx].clone()
        };
    }
    lands[from_idx].points = 1;

    let attacker = players.iter().find(|p| p.color == attacker_color).cloned();
    let attacker_id = attacker.as_ref().map(|p| p.id.clone()).unwrap_or_default();

    // defending bots remember who hit them
    if let Some(defender) = players.iter_mut().find(|p| p.color == defender_color) {
        if let Some(bot) = defender.bot.as_mut() {
            bot.last_aggressor = attacker.as_ref().map(|p| p.id.clone());
        }
    }

    let mut turn_index = table.turn_index;
    let mut retired = None;

    if success && !defender_color.is_neutral() {
        let defender = players.iter().find(|p| p.color == defender_color).cloned();
        if let (Some(defender), Some(attacker)) = (defender, attacker.as_ref()) {
            let left = lands.iter().filter(|l| l.color == defender_color).count();
            if left == 0 {
                let points = kill_points(table);
                let removal = remove_player_cascade(
                    &players,
                    &lands,
                    turn_index,
                    &defender.id,
                    players.len(),
                    EliminationReason::Died {
                        killer: attacker.id.clone(),
                        killer_name: attacker.name.clone(),
                        points,
                    },
                );
                let mut all_retired = table.retired.clone();
                all_retired.extend(removal.eliminations.iter().map(|e| e.player.id.clone()));
                retired = Some(all_retired);
                result.eliminations = removal.eliminations;
                players = removal.players;
                lands = removal.lands;
                turn_index = removal.turn_index;
                if let Some(p) = players.iter_mut().find(|p| p.id == attacker.id) {
                    p.score += points;
                }
            } else if was_capital && table.config.params.starting_capitals {
                move_capital(ctx, &mut lands, defender_color);
                let stolen = defender.reserve_dice;
                for p in players.iter_mut() {
                    if p.id == defender.id {
                        p.reserve_dice = 0;
                    } else if p.id == attacker.id {
                        p.reserve_dice += stolen;
                    }
                }
            }
        }
    }

    let turn_start = match players.iter().find(|p| p.id == attacker_id) {
        Some(p) => turn_start_after_attack(ctx, table, &lands, p),
        None => ctx.now,
    };

    result.events.push(TableEvent::Rolled {
        player: attacker_id,
        from: attack.from,
        to: attack.to,
        from_roll: roll.from,
        to_roll: roll.to,
        success,
    });

    let remaining = players.len();
    let u = &mut result.delta.table;
    u.turn_index = Some(turn_index);
    u.turn_start = Some(turn_start);
    result.delta.lands = Some(lands);
    result.delta.players = Some(players);
    result.delta.retired = retired;

    if table.is_playing() && remaining <= 1 {
        result.follow_up = Some(SystemCommand::EndGame);
    }
    result
}

fn move_capital(ctx: &mut Context<'_>, lands: &mut [Land], color: Color) {
    let owned: Vec<usize> = lands
        .iter()
        .enumerate()
        .filter(|(_, l)| l.color == color)
        .map(|(i, _)| i)
        .collect();
    if let Some(&i) = ctx.rng.choose(&owned) {
        lands[i].capital = true;
    }
}

// =============================================================================
// TESTS
// =============================================================================
