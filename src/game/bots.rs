//! Bot Players
//!
//! Bots are ordinary seats with a [`BotState`] attached. They are seated by
//! the scheduler while a table waits for players and, on their turn, pick a
//! command through the same processor humans use.

use crate::config::millis;
use crate::game::command::{
    Actor, ClientCommand, CommandKind, CommandResult, IllegalMove, IllegalMoveCode,
};
use crate::game::commands::{check_flag, countdown_deadline, recolor, Context};
use crate::game::events::TableEvent;
use crate::game::rules::player_position;
use crate::game::state::{BotPersona, BotState, BotStrategy, Player, Table, User};
use crate::game::tactics::{choose_move, sources};

/// Balance shown for bot seats.
pub const BOT_POINTS: i64 = 100;

const PERSONAS: [(&str, BotStrategy); 8] = [
    ("Alexander", BotStrategy::Revengeful),
    ("Augustus", BotStrategy::TargetCareful),
    ("Ioseb", BotStrategy::RandomCareless),
    ("Napoleon", BotStrategy::ExtraCareful),
    ("Nikolai", BotStrategy::RandomCareful),
    ("Winston", BotStrategy::RandomCareful),
    ("Genghis", BotStrategy::Revengeful),
    ("Hannibal", BotStrategy::ExtraCareful),
];

/// Every bot persona, in a fixed order.
pub fn personas() -> Vec<BotPersona> {
    PERSONAS
        .iter()
        .map(|(name, strategy)| BotPersona {
            name: name.to_string(),
            picture: format!("assets/bots/bot_{}.png", name.to_lowercase()),
            strategy: *strategy,
        })
        .collect()
}

/// A fresh seat for `persona`.
pub fn bot_player(persona: &BotPersona, now: i64) -> Player {
    let user = User {
        id: format!("bot_{}", persona.name.to_lowercase()),
        name: persona.name.clone(),
        picture: persona.picture.clone(),
        points: BOT_POINTS,
        level: 1,
    };
    let mut player = Player::from_user(&user, None, now);
    player.bot = Some(BotState { persona: persona.clone(), last_aggressor: None, deadlock_count: 0 });
    player
}

/// Whether a waiting table should get one more bot now.
///
/// Needs a human seated, a free start slot, and `bot_fill_delay` since the
/// last human sat down.
pub fn wants_bot(ctx: &Context<'_>, table: &Table) -> bool {
    if table.is_playing() || table.config.params.bot_less {
        return false;
    }
    if table.players.len() >= table.config.start_slots {
        return false;
    }
    let last_human = table
        .players
        .iter()
        .filter(|p| !p.is_bot())
        .map(|p| p.joined)
        .max();
    match last_human {
        Some(joined) => ctx.now - joined >= millis(ctx.config.bot_fill_delay),
        None => false,
    }
}

/// Seat one unused persona.
pub fn add_bot(ctx: &mut Context<'_>, table: &Table) -> Result<CommandResult, IllegalMove> {
    if table.is_playing() {
        return Err(IllegalMove::new(IllegalMoveCode::AlreadyPlaying, "Game in progress"));
    }
    if table.players.len() >= table.config.player_slots {
        return Err(IllegalMove::new(IllegalMoveCode::TableFull, "Table is full"));
    }

    let unused: Vec<BotPersona> = personas()
        .into_iter()
        .filter(|persona| {
            !table
                .players
                .iter()
                .filter_map(|p| p.bot.as_ref())
                .any(|b| b.persona.name == persona.name)
        })
        .collect();
    let persona = ctx
        .rng
        .choose(&unused)
        .ok_or_else(|| IllegalMove::new(IllegalMoveCode::NoPersona, "No bot left to seat"))?;

    let player = bot_player(persona, ctx.now);
    let mut result = CommandResult::new(CommandKind::AddBot);
    result.events.push(TableEvent::Joined { player: player.id.clone() });

    let mut players = table.players.clone();
    players.push(player);
    recolor(&mut players);

    let deadline = countdown_deadline(ctx, table, players.len());
    if deadline > 0 {
        result.delta.table.game_start = Some(deadline);
        result.events.push(TableEvent::Countdown { at: deadline });
    }
    result.delta.players = Some(players);
    Ok(result)
}

/// The command the bot holding the turn sends now, if any.
///
/// Waits `bot_think_delay` into the turn. A bot that is stuck (every seat a
/// bot, or too many turns without attacking) or hopelessly behind in a duel
/// flags its rank; otherwise it attacks with its best move or ends the turn.
pub fn decide(ctx: &mut Context<'_>, table: &Table) -> Option<(Actor, ClientCommand)> {
    if table.attack.is_some() {
        return None;
    }
    let seat = table.turn_index?;
    let player = table.players.get(seat)?;
    let bot = player.bot.as_ref()?;
    if ctx.now - table.turn_start < millis(ctx.config.bot_think_delay) {
        return None;
    }
    let actor = Actor::bot(player);

    let position = player_position(table, &player.id);
    let stuck = table.all_bots() || bot.deadlock_count > ctx.config.bot_deadlock_max;
    let losing_duel = table.round_count >= 10
        && table.players.len() == 2
        && position == 2
        && table
            .players
            .iter()
            .find(|p| p.id != player.id)
            .map(|other| table.land_count(other.color) >= table.land_count(player.color))
            .unwrap_or(false);

    if (stuck && position > 1) || losing_duel {
        let command = match check_flag(table, seat, position) {
            Ok(()) => ClientCommand::Flag { position },
            Err(_) => ClientCommand::EndTurn,
        };
        return Some((actor, command));
    }

    let mut candidates = sources(table, player);
    ctx.rng.shuffle(&mut candidates);
    let command = match choose_move(ctx.rng, table, player, bot, &candidates) {
        Some(m) => ClientCommand::Attack { from: m.from, to: m.to },
        None => ClientCommand::EndTurn,
    };
    Some((actor, command))
}
