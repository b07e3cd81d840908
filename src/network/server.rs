//! Table Server & Scheduler
//!
//! [`TableServer`] is the engine's front door: it runs inbound commands and
//! scheduler ticks against a table under that table's lock, applies the
//! result, publishes what happened and dispatches score persistence.
//!
//! [`Scheduler`] owns one ticker task per table. Each firing asks the table
//! what is due and runs at most one command; tickers are stopped through a
//! watch channel and stopping is idempotent.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::core::clock::{Clock, Timestamp};
use crate::game::command::{Actor, ClientCommand, CommandResult, IllegalMove, SystemCommand};
use crate::game::events::TableEvent;
use crate::game::snapshot::TableSnapshot;
use crate::game::tick::TickAction;
use crate::network::gateway::PublishGateway;
use crate::network::protocol::{InboundCommand, ServerMessage, Topic};
use crate::network::session::{Applied, ScoredElimination, TableSession, TableStore};
use crate::network::store::{ScoreStore, StoreError};

/// System-level failures.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No table with this tag.
    #[error("table {0} not found")]
    TableNotFound(String),

    /// A command broke a rule.
    #[error("illegal move: {0}")]
    Illegal(#[from] IllegalMove),

    /// Persistence failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Startup configuration is broken.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// TABLE SERVER
// =============================================================================

/// Runs commands and ticks against the table store.
#[derive(Clone)]
pub struct TableServer {
    tables: Arc<TableStore>,
    gateway: Arc<dyn PublishGateway>,
    scores: Arc<dyn ScoreStore>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
}

impl TableServer {
    /// Create a server over `tables`.
    pub fn new(
        tables: Arc<TableStore>,
        gateway: Arc<dyn PublishGateway>,
        scores: Arc<dyn ScoreStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self { tables, gateway, scores, clock, config: Arc::new(config) }
    }

    /// The table store.
    pub fn tables(&self) -> &Arc<TableStore> {
        &self.tables
    }

    /// Engine timings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn session(&self, tag: &str) -> Result<Arc<Mutex<TableSession>>, EngineError> {
        self.tables
            .get(tag)
            .await
            .ok_or_else(|| EngineError::TableNotFound(tag.to_string()))
    }

    /// Run a client command.
    ///
    /// A rejected command is reported to the sending connection only and
    /// returned as [`EngineError::Illegal`]; the table is left untouched.
    #[instrument(skip(self, inbound), fields(table = %tag, command = ?inbound.command))]
    pub async fn handle_command(&self, tag: &str, inbound: InboundCommand) -> Result<(), EngineError> {
        let session = self.session(tag).await?;
        let mut session = session.lock().await;
        let now = self.clock.now();

        let InboundCommand { client_id, user, command } = inbound;
        let actor = Actor { user, client_id };

        let result = match session.client(now, &self.config, &actor, &command) {
            Ok(result) => result,
            Err(err) => {
                debug!(code = ?err.code, "Rejected: {}", err.message);
                if let Some(client_id) = actor.client_id.as_ref() {
                    self.gateway.publish(Topic::Client(client_id.clone()), ServerMessage::illegal(&err));
                }
                return Err(err.into());
            }
        };

        self.commit(&mut session, result, now);
        // any accepted command counts as a heartbeat
        session.touch(&actor, now);

        if command == ClientCommand::Enter {
            if let Some(client_id) = actor.client_id {
                let topic = Topic::Client(client_id);
                self.gateway.publish(topic.clone(), ServerMessage::Snapshot { table: session.snapshot() });
                self.gateway.publish(
                    topic,
                    ServerMessage::ChatBacklog { table: tag.to_string(), lines: session.chat_backlog() },
                );
            }
        }
        Ok(())
    }

    /// Run whatever is due on table `tag`.
    ///
    /// Returns the action taken, if any. A due command that turns out to be
    /// illegal is returned as an error and changes nothing.
    #[instrument(level = "trace", skip(self))]
    pub async fn tick(&self, tag: &str) -> Result<Option<TickAction>, EngineError> {
        let session = self.session(tag).await?;
        let mut session = session.lock().await;
        let now = self.clock.now();

        let Some(action) = session.decide(now, &self.config) else {
            return Ok(None);
        };
        let result = match &action {
            TickAction::System(command) => session.system(now, &self.config, command),
            TickAction::Bot { actor, command } => session.client(now, &self.config, actor, command),
        }?;

        self.commit(&mut session, result, now);
        Ok(Some(action))
    }

    /// Seat bots until the table is full. Returns how many sat down.
    #[instrument(skip(self))]
    pub async fn seat_bots(&self, tag: &str) -> Result<usize, EngineError> {
        let session = self.session(tag).await?;
        let mut session = session.lock().await;
        let now = self.clock.now();

        let mut seated = 0;
        while session.table().players.len() < session.table().config.player_slots {
            match session.system(now, &self.config, &SystemCommand::AddBot) {
                Ok(result) => {
                    self.commit(&mut session, result, now);
                    seated += 1;
                }
                Err(err) => {
                    debug!("Stopped seating bots: {}", err);
                    break;
                }
            }
        }
        info!("Seated {} bots", seated);
        Ok(seated)
    }

    /// Current snapshot of table `tag`.
    pub async fn snapshot(&self, tag: &str) -> Result<TableSnapshot, EngineError> {
        let session = self.session(tag).await?;
        let session = session.lock().await;
        Ok(session.snapshot())
    }

    /// Apply a result and everything it asks to run next.
    fn commit(&self, session: &mut TableSession, result: CommandResult, now: Timestamp) {
        let mut next = Some(result);
        while let Some(result) = next.take() {
            let applied = session.apply(result, now);
            self.publish_applied(session, &applied);

            if let Some(command) = applied.follow_up {
                match session.system(now, &self.config, &command) {
                    Ok(result) => next = Some(result),
                    Err(err) => warn!(table = %session.tag(), "Follow-up {:?} rejected: {}", command, err),
                }
            }
        }
    }

    fn publish_applied(&self, session: &TableSession, applied: &Applied) {
        let tag = session.tag().to_string();
        let topic = Topic::Table(tag.clone());

        for event in &applied.events {
            match event {
                TableEvent::GameStarted { game_id } => {
                    info!(table = %tag, "Game {} started with {} players", game_id, session.table().players.len());
                }
                TableEvent::GameEnded { winner } => {
                    info!(table = %tag, "Game ended, winner {:?}", winner);
                }
                e if e.is_seat_change() => info!(table = %tag, "{:?}", e),
                e => debug!(table = %tag, "{:?}", e),
            }
            self.gateway.publish(topic.clone(), ServerMessage::Event { table: tag.clone(), event: event.clone() });
        }

        for scored in &applied.eliminations {
            let e = &scored.elimination;
            info!(
                table = %tag,
                "{} {} finished #{} with {} points",
                e.reason.symbol(),
                e.player.name,
                e.position,
                scored.score
            );
            self.gateway.publish(
                topic.clone(),
                ServerMessage::Elimination {
                    table: tag.clone(),
                    player: e.player.id.clone(),
                    name: e.player.name.clone(),
                    position: e.position,
                    score: scored.score,
                    reason: e.reason.clone(),
                },
            );
            self.persist(scored);
        }

        if applied.changed {
            self.gateway.publish(topic, ServerMessage::Snapshot { table: session.snapshot() });
        }
    }

    /// Store a human's score without holding up the table.
    fn persist(&self, scored: &ScoredElimination) {
        let player = &scored.elimination.player;
        if player.is_bot() {
            return;
        }

        let scores = self.scores.clone();
        let gateway = self.gateway.clone();
        let user_id = player.id.clone();
        let client_id = player.client_id.clone();
        let score = scored.score;

        tokio::spawn(async move {
            let outcome = async {
                let user = scores.add_score(&user_id, score).await?;
                let preferences = scores.get_preferences(&user_id).await?;
                Ok::<_, StoreError>((user, preferences))
            }
            .await;

            match outcome {
                Ok((user, preferences)) => {
                    debug!("Stored {} points for {}", score, user_id);
                    if let Some(client_id) = client_id {
                        gateway.publish(Topic::Client(client_id), ServerMessage::UserUpdate { user, preferences });
                    }
                }
                Err(err) => {
                    warn!("Failed to store {} points for {}: {}", score, user_id, err);
                    if let Some(client_id) = client_id {
                        gateway.publish(
                            Topic::Client(client_id),
                            ServerMessage::error(format!(
                                "You earned {} points, but I failed to add them to your profile.",
                                score
                            )),
                        );
                    }
                }
            }
        });
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

struct Ticker {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// One ticker task per table.
pub struct Scheduler {
    server: TableServer,
    tickers: Mutex<BTreeMap<String, Ticker>>,
}

impl Scheduler {
    /// Scheduler driving `server`.
    pub fn new(server: TableServer) -> Self {
        Self { server, tickers: Mutex::new(BTreeMap::new()) }
    }

    /// The server being driven.
    pub fn server(&self) -> &TableServer {
        &self.server
    }

    /// Start ticking table `tag`. Returns `false` if it already ticks.
    pub async fn start(&self, tag: &str) -> Result<bool, EngineError> {
        self.start_after(tag, Duration::ZERO).await
    }

    async fn start_after(&self, tag: &str, delay: Duration) -> Result<bool, EngineError> {
        if self.server.tables().get(tag).await.is_none() {
            return Err(EngineError::TableNotFound(tag.to_string()));
        }

        let mut tickers = self.tickers.lock().await;
        if let Some(ticker) = tickers.get(tag) {
            if !ticker.handle.is_finished() {
                return Ok(false);
            }
        }

        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_ticker(self.server.clone(), tag.to_string(), delay, stop_rx));
        tickers.insert(tag.to_string(), Ticker { stop, handle });
        info!("Started ticker for {} (offset {:?})", tag, delay);
        Ok(true)
    }

    /// Stop ticking table `tag` and wait for the ticker to exit.
    ///
    /// Returns `false` if it was not ticking.
    pub async fn stop(&self, tag: &str) -> bool {
        let Some(ticker) = self.tickers.lock().await.remove(tag) else {
            return false;
        };
        // receiver gone means the task already ended
        let _ = ticker.stop.send(true);
        if let Err(err) = ticker.handle.await {
            error!("Ticker for {} ended badly: {}", tag, err);
        }
        info!("Stopped ticker for {}", tag);
        true
    }

    /// Start every table, spreading first firings across one tick period.
    pub async fn start_all(&self) -> Result<usize, EngineError> {
        let tags = self.server.tables().list().await;
        let period = self.server.config().tick_period;
        let count = tags.len().max(1) as u32;

        let mut started = 0;
        for (i, tag) in tags.iter().enumerate() {
            let offset = period * i as u32 / count;
            if self.start_after(tag, offset).await? {
                started += 1;
            }
        }
        Ok(started)
    }

    /// Stop every ticker.
    pub async fn stop_all(&self) {
        let tags: Vec<String> = self.tickers.lock().await.keys().cloned().collect();
        for tag in tags {
            self.stop(&tag).await;
        }
    }

    /// Whether table `tag` is ticking.
    pub async fn is_running(&self, tag: &str) -> bool {
        self.tickers
            .lock()
            .await
            .get(tag)
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }

    /// Tags of ticking tables.
    pub async fn running(&self) -> Vec<String> {
        self.tickers
            .lock()
            .await
            .iter()
            .filter(|(_, t)| !t.handle.is_finished())
            .map(|(tag, _)| tag.clone())
            .collect()
    }
}

async fn run_ticker(server: TableServer, tag: String, delay: Duration, mut stop: watch::Receiver<bool>) {
    let period = server.config().tick_period.max(Duration::from_millis(1));
    let mut interval = interval_at(Instant::now() + delay, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        if *stop.borrow() {
            break;
        }

        // own task, so a panicking tick only costs this firing
        let tick_server = server.clone();
        let tick_tag = tag.clone();
        let handle = tokio::spawn(async move { tick_server.tick(&tick_tag).await });
        match handle.await {
            Ok(Ok(Some(action))) => trace!(table = %tag, "Tick ran {:?}", action),
            Ok(Ok(None)) => {}
            Ok(Err(err)) => error!(table = %tag, "Tick failed: {}", err),
            Err(err) => error!(table = %tag, "Tick panicked: {}", err),
        }
    }
    debug!("Ticker for {} exited", tag);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::game::command::{CommandKind, IllegalMoveCode};
    use crate::game::map::{Adjacency, MapDefinition};
    use crate::game::state::{
        Color, Elimination, EliminationReason, Player, Table, TableConfig, TableParams, User,
    };
    use crate::network::gateway::RecordingGateway;
    use crate::network::store::MemoryScoreStore;

    struct Harness {
        server: TableServer,
        gateway: RecordingGateway,
        scores: Arc<MemoryScoreStore>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let def = MapDefinition::hex_grid("Hex", 3, 2);
        let adjacency = Arc::new(Adjacency::from_definition(&def).unwrap());
        let table = Table::new(
            TableConfig {
                tag: "Test".into(),
                name: "Test".into(),
                map_name: "Hex".into(),
                player_slots: 3,
                start_slots: 2,
                points: 0,
                stack_size: 8,
                params: TableParams { ready_slots: Some(2), ..TableParams::default() },
            },
            adjacency,
        );
        let tables = Arc::new(TableStore::from_sessions(vec![TableSession::new(table, 3, 20)]));
        let gateway = RecordingGateway::new();
        let scores = Arc::new(MemoryScoreStore::new());
        let clock = Arc::new(ManualClock::new(1_000_000));
        let mut config = EngineConfig::default();
        config.tick_period = Duration::from_millis(5);
        let server = TableServer::new(tables, Arc::new(gateway.clone()), scores.clone(), clock.clone(), config);
        Harness { server, gateway, scores, clock }
    }

    fn user(id: &str) -> User {
        User { id: id.into(), name: id.to_uppercase(), picture: String::new(), points: 500, level: 1 }
    }

    fn send(id: &str, command: ClientCommand) -> InboundCommand {
        InboundCommand::from_user(user(id), format!("c-{id}"), command)
    }

    async fn wait_for(gateway: &RecordingGateway, topic: &Topic) -> Vec<ServerMessage> {
        for _ in 0..200 {
            let messages = gateway.on(topic);
            if !messages.is_empty() {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Vec::new()
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let h = harness();
        let err = h.server.handle_command("Nope", send("a", ClientCommand::Join)).await.unwrap_err();
        assert!(matches!(err, EngineError::TableNotFound(tag) if tag == "Nope"));
    }

    #[tokio::test]
    async fn test_rejection_goes_to_sender_only() {
        let h = harness();
        let err = h.server.handle_command("Test", send("a", ClientCommand::EndTurn)).await.unwrap_err();
        assert!(matches!(err, EngineError::Illegal(ref e) if e.code == IllegalMoveCode::NotPlaying));

        let mine = h.gateway.on(&Topic::Client("c-a".into()));
        assert!(matches!(mine.as_slice(), [ServerMessage::Error { code: Some(IllegalMoveCode::NotPlaying), .. }]));
        assert!(h.gateway.on(&Topic::Table("Test".into())).is_empty());
    }

    #[tokio::test]
    async fn test_join_publishes_event_and_snapshot() {
        let h = harness();
        h.server.handle_command("Test", send("a", ClientCommand::Join)).await.unwrap();

        let table = h.gateway.on(&Topic::Table("Test".into()));
        assert!(table.iter().any(|m| matches!(
            m,
            ServerMessage::Event { event: TableEvent::Joined { player }, .. } if player == "a"
        )));
        match table.last() {
            Some(ServerMessage::Snapshot { table }) => assert_eq!(table.players.len(), 1),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_enter_replies_with_snapshot_and_backlog() {
        let h = harness();
        h.server
            .handle_command("Test", send("a", ClientCommand::Chat { message: "hi".into() }))
            .await
            .unwrap();
        h.server.handle_command("Test", InboundCommand::anonymous("c-x", ClientCommand::Enter)).await.unwrap();

        let mine = h.gateway.on(&Topic::Client("c-x".into()));
        assert!(matches!(mine[0], ServerMessage::Snapshot { .. }));
        match &mine[1] {
            ServerMessage::ChatBacklog { lines, .. } => {
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].message, "hi");
                assert_eq!(lines[0].user.as_deref(), Some("A"));
            }
            other => panic!("expected backlog, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_heartbeats_stay_off_the_table_topic() {
        let h = harness();
        h.server.handle_command("Test", send("a", ClientCommand::Enter)).await.unwrap();
        h.server.handle_command("Test", send("a", ClientCommand::Join)).await.unwrap();
        h.gateway.clear();

        for _ in 0..3 {
            h.clock.advance_secs(10);
            h.server.handle_command("Test", send("a", ClientCommand::Heartbeat)).await.unwrap();
        }
        assert!(h.gateway.on(&Topic::Table("Test".into())).is_empty());

        let session = h.server.tables().get("Test").await.unwrap();
        let session = session.lock().await;
        assert_eq!(session.table().watchers[0].last_beat, h.clock.now());
        assert_eq!(session.table().players[0].last_beat, h.clock.now());
    }

    #[tokio::test]
    async fn test_heartbeat_from_new_connection_publishes_watcher() {
        let h = harness();
        h.server.handle_command("Test", InboundCommand::anonymous("c-x", ClientCommand::Heartbeat)).await.unwrap();
        match h.gateway.on(&Topic::Table("Test".into())).last() {
            Some(ServerMessage::Snapshot { table }) => assert_eq!(table.watch_count, 1),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_any_command_keeps_watcher_alive() {
        let h = harness();
        h.server.handle_command("Test", InboundCommand::anonymous("c-x", ClientCommand::Enter)).await.unwrap();
        for i in 0..3 {
            h.clock.advance_secs(20);
            let chat = ClientCommand::Chat { message: format!("still here {i}") };
            h.server.handle_command("Test", InboundCommand::anonymous("c-x", chat)).await.unwrap();
        }
        // 60s since entering, 20s since the last chat
        h.clock.advance_secs(20);
        h.server.tick("Test").await.unwrap();

        let session = h.server.tables().get("Test").await.unwrap();
        let session = session.lock().await;
        assert_eq!(session.table().watchers.len(), 1);
    }

    #[tokio::test]
    async fn test_ready_players_start_through_follow_up() {
        let h = harness();
        for id in ["a", "b"] {
            h.server.handle_command("Test", send(id, ClientCommand::Join)).await.unwrap();
        }
        for id in ["a", "b"] {
            h.server.handle_command("Test", send(id, ClientCommand::ToggleReady { ready: true })).await.unwrap();
        }
        let snap = h.server.snapshot("Test").await.unwrap();
        assert_eq!(snap.status, crate::game::state::TableStatus::Playing);
        assert!(h.gateway.on(&Topic::Table("Test".into())).iter().any(|m| matches!(
            m,
            ServerMessage::Event { event: TableEvent::GameStarted { .. }, .. }
        )));
    }

    #[tokio::test]
    async fn test_tick_runs_due_start() {
        let h = harness();
        for id in ["a", "b"] {
            h.server.handle_command("Test", send(id, ClientCommand::Join)).await.unwrap();
        }
        assert_eq!(h.server.tick("Test").await.unwrap(), None);

        h.clock.advance_secs(31);
        let action = h.server.tick("Test").await.unwrap();
        assert_eq!(action, Some(TickAction::System(SystemCommand::Start)));
        assert!(h.server.snapshot("Test").await.unwrap().game_id.is_some());
    }

    #[tokio::test]
    async fn test_seat_bots_fills_table() {
        let h = harness();
        assert_eq!(h.server.seat_bots("Test").await.unwrap(), 3);
        let snap = h.server.snapshot("Test").await.unwrap();
        assert!(snap.players.iter().all(|p| p.bot));
        assert_eq!(h.server.seat_bots("Test").await.unwrap(), 0);
    }

    fn eliminated(id: &str, bot: bool) -> ScoredElimination {
        let mut player = Player::from_user(&user(id), Some(format!("c-{id}")), 0);
        player.color = Color(1);
        if bot {
            player = crate::game::bots::bot_player(&crate::game::bots::personas()[0], 0);
        }
        ScoredElimination {
            elimination: Elimination {
                player,
                position: 2,
                reason: EliminationReason::TimedOut { turns: 5 },
            },
            score: -40,
        }
    }

    #[tokio::test]
    async fn test_persisted_score_sends_user_update() {
        let h = harness();
        h.scores.insert(user("a")).await;
        h.server.persist(&eliminated("a", false));

        let mine = wait_for(&h.gateway, &Topic::Client("c-a".into())).await;
        match mine.as_slice() {
            [ServerMessage::UserUpdate { user, .. }] => assert_eq!(user.points, 460),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_persistence_notifies_player_only() {
        let h = harness();
        h.scores.set_failing(true);
        h.server.persist(&eliminated("a", false));

        let mine = wait_for(&h.gateway, &Topic::Client("c-a".into())).await;
        assert_eq!(
            mine,
            vec![ServerMessage::error("You earned -40 points, but I failed to add them to your profile.")]
        );
        assert!(h.gateway.on(&Topic::Table("Test".into())).is_empty());
    }

    #[tokio::test]
    async fn test_bots_are_not_persisted() {
        let h = harness();
        h.server.persist(&eliminated("x", true));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.gateway.messages().is_empty());
        assert!(h.scores.user("bot_alexander").await.is_none());
    }

    #[tokio::test]
    async fn test_commit_runs_follow_up() {
        let h = harness();
        let session = h.server.tables().get("Test").await.unwrap();
        let mut session = session.lock().await;
        let mut result = CommandResult::new(CommandKind::Clean);
        result.follow_up = Some(SystemCommand::AddBot);
        h.server.commit(&mut session, result, 1_000_000);
        assert_eq!(session.table().players.len(), 1);
    }

    #[tokio::test]
    async fn test_scheduler_start_stop_idempotent() {
        let h = harness();
        let scheduler = Scheduler::new(h.server.clone());

        assert!(scheduler.start("Test").await.unwrap());
        assert!(!scheduler.start("Test").await.unwrap());
        assert!(scheduler.is_running("Test").await);
        assert_eq!(scheduler.running().await, vec!["Test".to_string()]);

        assert!(scheduler.stop("Test").await);
        assert!(!scheduler.stop("Test").await);
        assert!(!scheduler.is_running("Test").await);

        // restartable
        assert!(scheduler.start("Test").await.unwrap());
        scheduler.stop_all().await;
        assert!(scheduler.running().await.is_empty());
    }

    #[tokio::test]
    async fn test_scheduler_unknown_table() {
        let h = harness();
        let scheduler = Scheduler::new(h.server.clone());
        assert!(matches!(scheduler.start("Nope").await, Err(EngineError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_scheduler_ticks_table() {
        let h = harness();
        h.server.handle_command("Test", send("a", ClientCommand::Join)).await.unwrap();
        h.clock.advance_secs(5);

        let scheduler = Scheduler::new(h.server.clone());
        assert_eq!(scheduler.start_all().await.unwrap(), 1);
        for _ in 0..200 {
            if h.server.snapshot("Test").await.unwrap().players.len() > 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        scheduler.stop_all().await;
        // bot fill delay has passed, so the ticker seated a bot
        assert!(h.server.snapshot("Test").await.unwrap().players.iter().any(|p| p.bot));
    }
}
