//! Bot Attack Tactics
//!
//! A tactic looks at every (source, target) pair and keeps the candidate
//! with the best dice difference it accepts.

use crate::core::rng::DeterministicRng;
use crate::game::map::{land_masses, neighbours};
use crate::game::rules::player_positions;
use crate::game::state::{BotState, BotStrategy, Color, Emoji, Land, Player, Table};

/// How a bot filters candidate attacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tactic {
    /// More dice than the target, or equal dice against neutral.
    Careful,
    /// Any attack, best difference first.
    Careless,
    /// Only this color: careful against neutral, careless otherwise.
    FocusColor(Color),
    /// Only attacks that join two of the bot's land masses.
    Reconnect,
    /// Careful about the target's hostile neighbours.
    TargetCareful,
    /// Like `TargetCareful`, also avoiding targets next to strong hostile lands.
    ExtraCareful,
}

/// A chosen attack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Move {
    /// Source land.
    pub from: Emoji,
    /// Target land.
    pub to: Emoji,
    /// Dice difference.
    pub weight: i32,
}

/// Source lands able to attack, with their foreign neighbours.
#[derive(Clone, Debug)]
pub struct Source {
    /// Index into `table.lands`.
    pub source: usize,
    /// Indexes of attackable neighbours.
    pub targets: Vec<usize>,
}

/// Lands of `player` with more than one die and at least one foreign neighbour.
pub fn sources(table: &Table, player: &Player) -> Vec<Source> {
    table
        .lands
        .iter()
        .enumerate()
        .filter(|(_, l)| l.color == player.color && l.points > 1)
        .filter_map(|(i, l)| {
            let targets: Vec<usize> = neighbours(&table.lands, &table.adjacency, &l.emoji)
                .into_iter()
                .filter(|n| table.lands[*n].color != player.color)
                .collect();
            (!targets.is_empty()).then_some(Source { source: i, targets })
        })
        .collect()
}

/// Whether the next reinforcement would top up every land anyway.
pub fn would_refill_all(table: &Table, player: &Player) -> bool {
    let owned: Vec<&Land> = table.lands.iter().filter(|l| l.color == player.color).collect();
    let missing: u32 = owned
        .iter()
        .map(|l| table.stack_size().saturating_sub(l.points) as u32)
        .sum();
    owned.len() as u32 + player.reserve_dice >= missing + 7
}

/// The bot's territory is split in several masses.
pub fn has_disconnected_lands(table: &Table, player: &Player) -> bool {
    land_masses(&table.lands, &table.adjacency, player.color).len() > 1
}

/// Tactic for this turn.
pub fn pick_tactic(rng: &mut DeterministicRng, table: &Table, player: &Player, bot: &BotState) -> Tactic {
    let would_refill = would_refill_all(table, player);
    let position = table
        .player_index(&player.id)
        .map(|i| player_positions(&table.players, &table.lands)[i])
        .unwrap_or(0);
    if table.round_count > 3 && !would_refill && position == 1 {
        return Tactic::ExtraCareful;
    }

    match bot.persona.strategy {
        BotStrategy::RandomCareless => {
            if rng.percent() > 75 {
                Tactic::Careful
            } else {
                Tactic::Careless
            }
        }
        BotStrategy::Revengeful => {
            let all_full = table
                .lands
                .iter()
                .filter(|l| l.color == player.color)
                .all(|l| l.points >= table.stack_size());
            if all_full {
                return Tactic::Careless;
            }
            if table.players.len() > 2 {
                let color = bot
                    .last_aggressor
                    .as_deref()
                    .and_then(|id| table.player(id))
                    .map(|p| p.color)
                    .unwrap_or(Color::NEUTRAL);
                return Tactic::FocusColor(color);
            }
            Tactic::Careful
        }
        BotStrategy::ExtraCareful => {
            if rng.percent() > 95 || would_refill {
                Tactic::Careless
            } else {
                Tactic::ExtraCareful
            }
        }
        BotStrategy::TargetCareful => {
            if rng.percent() > 95 || would_refill {
                Tactic::Careless
            } else {
                Tactic::TargetCareful
            }
        }
        BotStrategy::RandomCareful => {
            if rng.percent() > 95 || would_refill {
                Tactic::Careless
            } else {
                Tactic::Careful
            }
        }
    }
}

/// Best move for a strategy: reconnecting first when fragmented.
pub fn choose_move(
    rng: &mut DeterministicRng,
    table: &Table,
    player: &Player,
    bot: &BotState,
    sources: &[Source],
) -> Option<Move> {
    if has_disconnected_lands(table, player) {
        if let Some(m) = best_move(Tactic::Reconnect, table, player, sources) {
            return Some(m);
        }
    }
    let tactic = pick_tactic(rng, table, player, bot);
    best_move(tactic, table, player, sources)
}

/// Highest-weight candidate accepted by `tactic`. The first one wins ties.
pub fn best_move(tactic: Tactic, table: &Table, player: &Player, sources: &[Source]) -> Option<Move> {
    let mut best: Option<Move> = None;
    for s in sources {
        let source = &table.lands[s.source];
        for &t in &s.targets {
            let target = &table.lands[t];
            let weight = source.points as i32 - target.points as i32;
            if best.as_ref().map(|b| weight <= b.weight).unwrap_or(false) {
                continue;
            }
            if accepts(tactic, table, player, source, target, weight) {
                best = Some(Move { from: source.emoji.clone(), to: target.emoji.clone(), weight });
            }
        }
    }
    best
}

fn careful(target: &Land, weight: i32) -> bool {
    weight > 0 || (target.color.is_neutral() && weight == 0)
}

fn accepts(tactic: Tactic, table: &Table, player: &Player, source: &Land, target: &Land, weight: i32) -> bool {
    match tactic {
        Tactic::Careful => careful(target, weight),
        Tactic::Careless => true,
        Tactic::FocusColor(color) => {
            if target.color != color {
                false
            } else if color.is_neutral() {
                careful(target, weight)
            } else {
                true
            }
        }
        Tactic::Reconnect => {
            let before = land_masses(&table.lands, &table.adjacency, player.color).len();
            let mut after_lands = table.lands.clone();
            if let Some(l) = after_lands.iter_mut().find(|l| l.emoji == target.emoji) {
                l.color = player.color;
            }
            land_masses(&after_lands, &table.adjacency, player.color).len() < before
        }
        Tactic::TargetCareful => careful(target, weight) && safe_target(table, player, source, target),
        Tactic::ExtraCareful => {
            careful(target, weight)
                && safe_target(table, player, source, target)
                && hostile_neighbours(table, player, target).iter().all(|l| l.points <= 2)
        }
    }
}

fn hostile_neighbours<'a>(table: &'a Table, player: &Player, target: &Land) -> Vec<&'a Land> {
    neighbours(&table.lands, &table.adjacency, &target.emoji)
        .into_iter()
        .map(|i| &table.lands[i])
        .filter(|l| l.color != player.color && !l.color.is_neutral() && l.emoji != target.emoji)
        .collect()
}

/// No hostile neighbour of the target could retake it right away.
fn safe_target(table: &Table, player: &Player, source: &Land, target: &Land) -> bool {
    let margin = if table.round_count < 5 { -1 } else { 0 };
    let remaining = source.points as i32 - 1;
    hostile_neighbours(table, player, target)
        .iter()
        .all(|l| l.points as i32 <= remaining + margin)
}

// =============================================================================
// TESTS
// =============================================================================
