//! Command Processor
//!
//! One function per command. Each reads the table as it is and returns a
//! [`CommandResult`] or an [`IllegalMove`]; nothing in here writes to the
//! table. The caller applies the delta under the table lock.

use crate::config::{millis, EngineConfig};
use crate::core::clock::Timestamp;
use crate::core::rng::DeterministicRng;
use crate::game::bots::add_bot;
use crate::game::combat::resolve_roll;
use crate::game::command::{
    Actor, ClientCommand, CommandKind, CommandResult, IllegalMove, IllegalMoveCode, SystemCommand,
};
use crate::game::elimination::end_game;
use crate::game::events::TableEvent;
use crate::game::rules::{dice_count, has_turn, kill_points, player_position, remove_player_cascade};
use crate::game::start::start_game;
use crate::game::state::{
    Attack, Color, EliminationReason, Land, Player, Table, TableStatus, UnderStake, User, UserId, Watcher,
};
use crate::game::turn::{advance_turn, hand_over, Handover};

/// Everything a command may read besides the table.
pub struct Context<'a> {
    /// Current time in milliseconds.
    pub now: Timestamp,
    /// The table's random stream.
    pub rng: &'a mut DeterministicRng,
    /// Engine timings.
    pub config: &'a EngineConfig,
}

/// Process a command sent by a client.
pub fn process_client(
    ctx: &mut Context<'_>,
    table: &Table,
    actor: &Actor,
    command: &ClientCommand,
) -> Result<CommandResult, IllegalMove> {
    match command {
        ClientCommand::Enter => enter(ctx, table, actor),
        ClientCommand::Exit => exit(table, actor),
        ClientCommand::Join => join(ctx, table, actor),
        ClientCommand::Leave => leave(ctx, table, actor),
        ClientCommand::Attack { from, to } => attack(ctx, table, actor, from, to),
        ClientCommand::EndTurn => end_turn(ctx, table, actor),
        ClientCommand::SitOut => sit_out(ctx, table, actor),
        ClientCommand::SitIn => sit_in(ctx, table, actor),
        ClientCommand::ToggleReady { ready } => toggle_ready(table, actor, *ready),
        ClientCommand::Flag { position } => flag(ctx, table, actor, *position),
        ClientCommand::Chat { message } => Ok(chat(actor, message)),
        ClientCommand::Heartbeat => heartbeat(ctx, table, actor),
    }
}

/// Process a command issued by the scheduler.
pub fn process_system(
    ctx: &mut Context<'_>,
    table: &Table,
    command: &SystemCommand,
) -> Result<CommandResult, IllegalMove> {
    match command {
        SystemCommand::Roll => resolve_roll(ctx, table),
        SystemCommand::TurnOver { sit_out } => {
            turn_tick(ctx, table, CommandKind::TickTurnOver, *sit_out)
        }
        SystemCommand::TurnOut => turn_tick(ctx, table, CommandKind::TickTurnOut, false),
        SystemCommand::AllOut => turn_tick(ctx, table, CommandKind::TickTurnAllOut, false),
        SystemCommand::Start => start_game(ctx, table),
        SystemCommand::AddBot => add_bot(ctx, table),
        SystemCommand::Clean => Ok(clean(ctx, table)),
        SystemCommand::EndGame => {
            if table.status == TableStatus::Finished {
                return Err(IllegalMove::new(IllegalMoveCode::NoGame, "No game to end"));
            }
            Ok(end_game(table))
        }
    }
}

// =============================================================================
// SHARED CHECKS
// =============================================================================

fn require_user(actor: &Actor) -> Result<&User, IllegalMove> {
    actor
        .user
        .as_ref()
        .ok_or_else(|| IllegalMove::new(IllegalMoveCode::NoActor, "You must be logged in"))
}

fn require_playing(table: &Table) -> Result<(), IllegalMove> {
    if table.is_playing() {
        Ok(())
    } else {
        Err(IllegalMove::new(IllegalMoveCode::NotPlaying, "Game is not running"))
    }
}

fn require_seat(table: &Table, actor: &Actor) -> Result<usize, IllegalMove> {
    let user = require_user(actor)?;
    table
        .player_index(&user.id)
        .ok_or_else(|| IllegalMove::new(IllegalMoveCode::NotJoined, "You are not in this game"))
}

fn require_turn(table: &Table, actor: &Actor) -> Result<usize, IllegalMove> {
    require_playing(table)?;
    let seat = require_seat(table, actor)?;
    if table.turn_index != Some(seat) {
        return Err(IllegalMove::new(IllegalMoveCode::NotYourTurn, "It is not your turn"));
    }
    if table.attack.is_some() {
        return Err(IllegalMove::new(
            IllegalMoveCode::AttackInProgress,
            "Wait for the current attack to resolve",
        ));
    }
    Ok(seat)
}

/// Seat colors follow seat order.
pub(crate) fn recolor(players: &mut [Player]) {
    for (i, p) in players.iter_mut().enumerate() {
        p.color = Color::for_seat(i);
    }
}

/// Countdown deadline for `seated` players, or 0 below the start threshold.
pub(crate) fn countdown_deadline(ctx: &Context<'_>, table: &Table, seated: usize) -> Timestamp {
    if seated < table.config.start_slots {
        return 0;
    }
    let wait = if seated >= table.config.player_slots {
        ctx.config.game_start_countdown_full
    } else {
        ctx.config.game_start_countdown
    };
    ctx.now + millis(wait)
}

fn neutral_lands(table: &Table) -> Vec<Land> {
    table
        .lands
        .iter()
        .map(|l| Land { color: Color::NEUTRAL, points: 1, capital: false, ..l.clone() })
        .collect()
}

// =============================================================================
// WATCHERS
// =============================================================================

fn enter(ctx: &Context<'_>, table: &Table, actor: &Actor) -> Result<CommandResult, IllegalMove> {
    let client_id = actor
        .client_id
        .clone()
        .ok_or_else(|| IllegalMove::new(IllegalMoveCode::NoActor, "No connection"))?;
    let name = actor.user.as_ref().map(|u| u.name.clone());

    let mut result = CommandResult::new(CommandKind::Enter);
    let mut watchers = table.watchers.clone();
    match watchers.iter_mut().find(|w| w.client_id == client_id) {
        Some(w) => {
            w.user_id = actor.user_id().map(str::to_string);
            w.name = name.clone();
            w.last_beat = ctx.now;
        }
        None => watchers.push(Watcher {
            client_id: client_id.clone(),
            user_id: actor.user_id().map(str::to_string),
            name: name.clone(),
            last_beat: ctx.now,
        }),
    }
    result.delta.watchers = Some(watchers);

    if let Some(id) = actor.user_id() {
        let seated = table.player(id).map(|p| p.client_id.as_deref() != Some(client_id.as_str()));
        if seated == Some(true) {
            let mut players = table.players.clone();
            for p in players.iter_mut().filter(|p| p.id == id) {
                p.client_id = Some(client_id.clone());
                p.last_beat = ctx.now;
            }
            result.delta.players = Some(players);
        }
    }

    Ok(result.event(TableEvent::Entered { client_id, name }))
}

fn exit(table: &Table, actor: &Actor) -> Result<CommandResult, IllegalMove> {
    let client_id = actor
        .client_id
        .clone()
        .ok_or_else(|| IllegalMove::new(IllegalMoveCode::NoActor, "No connection"))?;
    let mut result = CommandResult::new(CommandKind::Exit);
    if table.watchers.iter().any(|w| w.client_id == client_id) {
        let watchers = table
            .watchers
            .iter()
            .filter(|w| w.client_id != client_id)
            .cloned()
            .collect();
        result.delta.watchers = Some(watchers);
    }
    let name = actor.user.as_ref().map(|u| u.name.clone());
    Ok(result.event(TableEvent::Exited { client_id, name }))
}

fn heartbeat(ctx: &Context<'_>, table: &Table, actor: &Actor) -> Result<CommandResult, IllegalMove> {
    let client_id = actor
        .client_id
        .clone()
        .ok_or_else(|| IllegalMove::new(IllegalMoveCode::NoActor, "No connection"))?;
    let mut result = CommandResult::new(CommandKind::Heartbeat);

    let mut watchers = table.watchers.clone();
    match watchers.iter_mut().find(|w| w.client_id == client_id) {
        Some(w) => {
            w.last_beat = ctx.now;
            result.silent = true;
        }
        None => watchers.push(Watcher {
            client_id,
            user_id: actor.user_id().map(str::to_string),
            name: actor.user.as_ref().map(|u| u.name.clone()),
            last_beat: ctx.now,
        }),
    }
    result.delta.watchers = Some(watchers);

    if let Some(seat) = actor.user_id().and_then(|id| table.player_index(id)) {
        let mut players = table.players.clone();
        players[seat].last_beat = ctx.now;
        result.delta.players = Some(players);
    }
    Ok(result)
}

fn chat(actor: &Actor, message: &str) -> CommandResult {
    CommandResult::new(CommandKind::Chat).event(TableEvent::Chat {
        user: actor.user.as_ref().map(|u| u.name.clone()),
        message: message.to_string(),
    })
}

// =============================================================================
// SEATS
// =============================================================================

fn join(ctx: &Context<'_>, table: &Table, actor: &Actor) -> Result<CommandResult, IllegalMove> {
    let user = require_user(actor)?;
    if table.is_playing() {
        if table.all_bots() {
            return takeover(ctx, table, actor, user);
        }
        return Err(IllegalMove::new(IllegalMoveCode::JoinWhilePlaying, "Game in progress"));
    }
    if table.player(&user.id).is_some() {
        return Err(IllegalMove::new(IllegalMoveCode::AlreadyJoined, "Already joined"));
    }
    if table.retired.contains(&user.id) {
        return Err(IllegalMove::new(IllegalMoveCode::Retired, "You already played this game"));
    }
    if table.config.points > 0 && user.points < table.config.points {
        return Err(IllegalMove::new(
            IllegalMoveCode::NotEnoughPoints,
            format!("You need {} points to join", table.config.points),
        ));
    }

    let mut result = CommandResult::new(CommandKind::Join);
    let mut players = table.players.clone();
    if players.len() >= table.config.player_slots {
        match players.iter().rposition(Player::is_bot) {
            Some(i) => {
                let bot = players.remove(i);
                result.events.push(TableEvent::Left { player: bot.id });
            }
            None => return Err(IllegalMove::new(IllegalMoveCode::TableFull, "Table is full")),
        }
    }

    // humans sit before bots
    let at = players.iter().position(Player::is_bot).unwrap_or(players.len());
    players.insert(at, Player::from_user(user, actor.client_id.clone(), ctx.now));
    recolor(&mut players);

    if table.status == TableStatus::Finished {
        result.delta.table.status = Some(TableStatus::Paused);
        result.delta.table.turn_count = Some(1);
        result.delta.table.round_count = Some(1);
        result.delta.lands = Some(neutral_lands(table));
    }

    let deadline = countdown_deadline(ctx, table, players.len());
    if deadline > 0 {
        result.delta.table.game_start = Some(deadline);
        result.events.push(TableEvent::Countdown { at: deadline });
    }

    result.events.push(TableEvent::Joined { player: user.id.clone() });
    result.delta.players = Some(players);
    Ok(result)
}

/// A human replaces the weakest bot of an all-bot game.
fn takeover(ctx: &Context<'_>, table: &Table, actor: &Actor, user: &User) -> Result<CommandResult, IllegalMove> {
    if table.retired.contains(&user.id) {
        return Err(IllegalMove::new(IllegalMoveCode::Retired, "You already played this game"));
    }
    if table.player(&user.id).is_some() {
        return Err(IllegalMove::new(IllegalMoveCode::AlreadyJoined, "Already joined"));
    }
    let seat = table
        .players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_bot())
        .min_by_key(|(i, p)| (table.land_count(p.color), dice_count(&table.lands, p.color), *i))
        .map(|(i, _)| i)
        .ok_or_else(|| IllegalMove::new(IllegalMoveCode::NoBotSeat, "No bot seat to take over"))?;

    let mut players = table.players.clone();
    let bot = players[seat].clone();
    let mut human = Player::from_user(user, actor.client_id.clone(), ctx.now);
    human.color = bot.color;
    human.reserve_dice = bot.reserve_dice;
    human.score = bot.score;
    players[seat] = human;

    let mut result = CommandResult::new(CommandKind::Takeover);
    result.delta.players = Some(players);
    Ok(result.event(TableEvent::TookOver { player: user.id.clone(), bot: bot.id }))
}

fn leave(ctx: &Context<'_>, table: &Table, actor: &Actor) -> Result<CommandResult, IllegalMove> {
    let user = require_user(actor)?;
    if table.is_playing() {
        return Err(IllegalMove::new(IllegalMoveCode::LeaveWhilePlaying, "Game in progress"));
    }
    if table.player(&user.id).is_none() {
        return Err(IllegalMove::new(IllegalMoveCode::NotJoined, "You are not in this game"));
    }
    Ok(unseat(ctx, table, &[user.id.clone()], CommandResult::new(CommandKind::Leave)))
}

/// Remove seats from a table that is not playing.
fn unseat(ctx: &Context<'_>, table: &Table, ids: &[UserId], mut result: CommandResult) -> CommandResult {
    let mut players: Vec<Player> = table
        .players
        .iter()
        .filter(|p| !ids.contains(&p.id))
        .cloned()
        .collect();
    recolor(&mut players);

    let all_bots = !players.is_empty() && players.iter().all(Player::is_bot);
    let deadline = if all_bots { 0 } else { countdown_deadline(ctx, table, players.len()) };
    if deadline != table.game_start {
        result.delta.table.game_start = Some(deadline);
        result.events.push(TableEvent::Countdown { at: deadline });
    }
    if players.is_empty() && table.status == TableStatus::Paused {
        result.delta.table.status = Some(TableStatus::Finished);
    }

    for id in ids {
        result.events.push(TableEvent::Left { player: id.clone() });
    }
    result.delta.players = Some(players);
    result
}

// =============================================================================
// TURN
// =============================================================================

fn attack(
    ctx: &Context<'_>,
    table: &Table,
    actor: &Actor,
    from: &str,
    to: &str,
) -> Result<CommandResult, IllegalMove> {
    require_user(actor)?;
    let seat = require_turn(table, actor)?;
    let player = &table.players[seat];
    let reject = |code, message: &str| IllegalMove::new(code, message).with_lands(from, to);

    let (source, target) = match (table.land(from), table.land(to)) {
        (Some(s), Some(t)) => (s, t),
        _ => return Err(reject(IllegalMoveCode::LandNotFound, "Land not found")),
    };
    if source.color.is_neutral() {
        return Err(reject(IllegalMoveCode::NeutralSource, "Cannot attack from a neutral land"));
    }
    if source.color != player.color {
        return Err(reject(IllegalMoveCode::NotOwner, "You do not own that land"));
    }
    if source.points <= 1 {
        return Err(reject(IllegalMoveCode::NotEnoughDice, "You need more than one die to attack"));
    }
    if source.color == target.color {
        return Err(reject(IllegalMoveCode::SameColor, "You already own that land"));
    }
    if !table.adjacency.is_border(from, to) {
        return Err(reject(IllegalMoveCode::NotAdjacent, "Lands do not share a border"));
    }

    let mut result = CommandResult::new(CommandKind::Attack);
    let u = &mut result.delta.table;
    u.attack = Some(Some(Attack {
        from: from.to_string(),
        to: to.to_string(),
        start: ctx.now,
        client_id: actor.client_id.clone(),
    }));
    u.turn_start = Some(ctx.now);
    u.turn_activity = Some(true);

    if player.bot.as_ref().map(|b| b.deadlock_count > 0).unwrap_or(false) {
        let mut players = table.players.clone();
        if let Some(bot) = players[seat].bot.as_mut() {
            bot.deadlock_count = 0;
        }
        result.delta.players = Some(players);
    }

    Ok(result.event(TableEvent::MoveStarted {
        player: player.id.clone(),
        from: from.to_string(),
        to: to.to_string(),
    }))
}

fn end_turn(ctx: &mut Context<'_>, table: &Table, actor: &Actor) -> Result<CommandResult, IllegalMove> {
    let seat = require_turn(table, actor)?;
    let mut players = table.players.clone();
    if let Some(bot) = players[seat].bot.as_mut() {
        bot.deadlock_count += 1;
    }
    Ok(advance_turn(ctx, table, players, table.lands.clone(), CommandKind::EndTurn, false))
}

fn turn_tick(
    ctx: &mut Context<'_>,
    table: &Table,
    kind: CommandKind,
    sit_out: bool,
) -> Result<CommandResult, IllegalMove> {
    require_playing(table)?;
    Ok(advance_turn(ctx, table, table.players.clone(), table.lands.clone(), kind, sit_out))
}

fn sit_out(ctx: &mut Context<'_>, table: &Table, actor: &Actor) -> Result<CommandResult, IllegalMove> {
    require_playing(table)?;
    let seat = require_seat(table, actor)?;
    let mut players = table.players.clone();
    players[seat].out = true;

    if table.turn_index == Some(seat) && table.attack.is_none() {
        let mut result = advance_turn(ctx, table, players, table.lands.clone(), CommandKind::SitOut, false);
        result.events.insert(0, TableEvent::PlayerStatus { player: table.players[seat].id.clone() });
        return Ok(result);
    }

    let mut result = CommandResult::new(CommandKind::SitOut);
    result.events.push(TableEvent::PlayerStatus { player: players[seat].id.clone() });
    result.delta.players = Some(players);
    Ok(result)
}

fn sit_in(ctx: &mut Context<'_>, table: &Table, actor: &Actor) -> Result<CommandResult, IllegalMove> {
    require_playing(table)?;
    let seat = require_seat(table, actor)?;
    let everyone_out = table.players.iter().all(|p| p.out);
    let mut players = table.players.clone();
    players[seat].out = false;
    players[seat].out_turns = 0;
    let status = TableEvent::PlayerStatus { player: players[seat].id.clone() };

    if everyone_out && table.attack.is_none() {
        if table.turn_index == Some(seat) {
            let mut result = CommandResult::new(CommandKind::SitIn);
            result.delta.table.turn_start = Some(ctx.now);
            result.delta.players = Some(players);
            return Ok(result.event(status));
        }
        let mut result = advance_turn(ctx, table, players, table.lands.clone(), CommandKind::SitIn, false);
        result.events.insert(0, status);
        return Ok(result);
    }

    let mut result = CommandResult::new(CommandKind::SitIn);
    result.delta.players = Some(players);
    Ok(result.event(status))
}

fn toggle_ready(table: &Table, actor: &Actor, ready: bool) -> Result<CommandResult, IllegalMove> {
    if table.is_playing() {
        return Err(IllegalMove::new(IllegalMoveCode::ReadyWhilePlaying, "Game in progress"));
    }
    let seat = require_seat(table, actor)?;
    let mut players = table.players.clone();
    players[seat].ready = ready;

    let mut result = CommandResult::new(CommandKind::ToggleReady);
    if let Some(slots) = table.config.params.ready_slots {
        if players.len() >= slots.max(2) && players.iter().all(|p| p.ready) {
            result.follow_up = Some(SystemCommand::Start);
        }
    }
    result.events.push(TableEvent::PlayerStatus { player: players[seat].id.clone() });
    result.delta.players = Some(players);
    Ok(result)
}

// =============================================================================
// FLAG
// =============================================================================

/// Whether the seat at `seat` may flag `position` right now.
pub(crate) fn check_flag(table: &Table, seat: usize, position: usize) -> Result<(), IllegalMove> {
    require_playing(table)?;
    let player = table
        .players
        .get(seat)
        .ok_or_else(|| IllegalMove::new(IllegalMoveCode::NotJoined, "You are not in this game"))?;
    let live = player_position(table, &player.id);

    if position != live {
        return Err(IllegalMove::new(
            IllegalMoveCode::FlagMismatch,
            format!("You are in position {live}, not {position}"),
        ));
    }
    if table.round_count < table.config.params.no_flag_rounds {
        return Err(IllegalMove::new(
            IllegalMoveCode::FlagTooEarly,
            format!("You cannot flag before round {}", table.config.params.no_flag_rounds),
        ));
    }
    if position == 1 {
        return Err(IllegalMove::new(IllegalMoveCode::FlagFirst, "You cannot flag first"));
    }
    if player.flag.map(|f| f >= position).unwrap_or(false) {
        return Err(IllegalMove::new(IllegalMoveCode::FlagUp, "You already flagged that position"));
    }
    Ok(())
}

fn flag(ctx: &mut Context<'_>, table: &Table, actor: &Actor, position: usize) -> Result<CommandResult, IllegalMove> {
    require_playing(table)?;
    let seat = require_seat(table, actor)?;
    check_flag(table, seat, position)?;
    let player = &table.players[seat];

    let seats = table.players.len();
    if has_turn(table, &player.id) && position == seats {
        return Ok(surrender(ctx, table, seat, position));
    }

    let mut players = table.players.clone();
    players[seat].flag = Some(position);
    let mut result = CommandResult::new(CommandKind::Flag);
    result.events.push(TableEvent::PlayerStatus { player: player.id.clone() });
    result.delta.players = Some(players);
    Ok(result)
}

/// The turn holder surrenders in last place, draining pending flags behind it.
fn surrender(ctx: &mut Context<'_>, table: &Table, seat: usize, position: usize) -> CommandResult {
    let player = &table.players[seat];
    let mut players = table.players.clone();
    players[seat].flag = Some(position);

    let under = match (player.is_bot(), table.players.len()) {
        (true, 2) => table
            .players
            .iter()
            .find(|p| p.id != player.id)
            .map(|p| UnderStake { player: p.id.clone(), points: kill_points(table) }),
        _ => None,
    };
    if let Some(stake) = under.as_ref() {
        if let Some(p) = players.iter_mut().find(|p| p.id == stake.player) {
            p.score += stake.points;
        }
    }

    let removal = remove_player_cascade(
        &players,
        &table.lands,
        table.turn_index,
        &player.id,
        position,
        EliminationReason::Surrendered { flag: position, under },
    );

    let mut result = CommandResult::new(CommandKind::Flag);
    let mut retired = table.retired.clone();
    retired.extend(removal.eliminations.iter().map(|e| e.player.id.clone()));
    result.eliminations = removal.eliminations;
    result.delta.table.attack = Some(None);

    if removal.players.len() <= 1 {
        let u = &mut result.delta.table;
        u.turn_index = Some(removal.turn_index);
        u.turn_start = Some(ctx.now);
        u.turn_activity = Some(false);
        result.follow_up = Some(SystemCommand::EndGame);
        result.delta.players = Some(removal.players);
        result.delta.lands = Some(removal.lands);
        result.delta.retired = Some(retired);
        return result;
    }

    // the next seat inherited the index and may itself be out or flagged
    let handover = Handover {
        players: removal.players,
        lands: removal.lands,
        index: removal.turn_index,
        retired,
    };
    hand_over(ctx, table, handover, false, &mut result);
    result
}

// =============================================================================
// CLEANUP
// =============================================================================

/// Whether [`clean`] would drop anything right now.
pub fn needs_clean(ctx: &Context<'_>, table: &Table) -> bool {
    !stale_watchers(ctx, table).is_empty() || !seats_to_drop(ctx, table).is_empty()
}

fn stale_watchers<'t>(ctx: &Context<'_>, table: &'t Table) -> Vec<&'t Watcher> {
    let timeout = millis(ctx.config.watcher_timeout);
    table
        .watchers
        .iter()
        .filter(|w| ctx.now - w.last_beat > timeout)
        .collect()
}

fn seats_to_drop(ctx: &Context<'_>, table: &Table) -> Vec<UserId> {
    if table.is_playing() {
        return Vec::new();
    }
    let timeout = millis(ctx.config.player_timeout);
    let mut drop: Vec<UserId> = table
        .players
        .iter()
        .filter(|p| !p.is_bot() && ctx.now - p.last_beat > timeout)
        .map(|p| p.id.clone())
        .collect();

    let remaining: Vec<&Player> = table.players.iter().filter(|p| !drop.contains(&p.id)).collect();
    if !remaining.is_empty() && remaining.iter().all(|p| p.is_bot()) {
        drop.extend(remaining.iter().map(|p| p.id.clone()));
    } else {
        let surplus = remaining.len().saturating_sub(table.config.start_slots);
        drop.extend(
            remaining
                .iter()
                .rev()
                .filter(|p| p.is_bot())
                .take(surplus)
                .map(|p| p.id.clone()),
        );
    }
    drop
}

/// Drop silent watchers; between games also silent humans and surplus bots.
fn clean(ctx: &Context<'_>, table: &Table) -> CommandResult {
    let mut result = CommandResult::new(CommandKind::Clean);

    let stale = stale_watchers(ctx, table);
    if !stale.is_empty() {
        for w in &stale {
            result.events.push(TableEvent::Exited { client_id: w.client_id.clone(), name: w.name.clone() });
        }
        let watchers = table
            .watchers
            .iter()
            .filter(|w| !stale.iter().any(|s| s.client_id == w.client_id))
            .cloned()
            .collect();
        result.delta.watchers = Some(watchers);
    }

    let drop = seats_to_drop(ctx, table);
    if drop.is_empty() {
        return result;
    }
    unseat(ctx, table, &drop, result)
}

// =============================================================================
// TESTS
// =============================================================================
