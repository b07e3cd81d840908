//! Table Sessions
//!
//! A [`TableSession`] owns one table's state, its dice stream and its chat
//! backlog. The [`TableStore`] holds every session of the process behind a
//! per-table mutex: whoever holds the lock is the table's single writer.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::{ConfigError, EngineConfig};
use crate::core::clock::Timestamp;
use crate::core::rng::DeterministicRng;
use crate::game::command::{Actor, ClientCommand, CommandKind, CommandResult, IllegalMove, SystemCommand};
use crate::game::commands::{process_client, process_system, Context};
use crate::game::elimination::elimination_score;
use crate::game::events::TableEvent;
use crate::game::map::{Adjacency, MapDefinition};
use crate::game::snapshot::TableSnapshot;
use crate::game::state::{Elimination, Table, TableConfig};
use crate::game::tick::{decide_tick, TickAction};
use crate::network::protocol::ChatLine;

/// An elimination with its final score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredElimination {
    /// The elimination.
    pub elimination: Elimination,
    /// In-game score plus position award.
    pub score: i64,
}

/// What applying a command result produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Command that produced it.
    pub kind: CommandKind,
    /// Events in emission order.
    pub events: Vec<TableEvent>,
    /// Eliminations, scored against the table before the change.
    pub eliminations: Vec<ScoredElimination>,
    /// Command to run next, if any.
    pub follow_up: Option<SystemCommand>,
    /// Whether table state changed.
    pub changed: bool,
}

/// One table and everything that goes with it.
pub struct TableSession {
    table: Table,
    rng: DeterministicRng,
    chat: VecDeque<ChatLine>,
    chat_limit: usize,
}

impl TableSession {
    /// Session for `table` with dice seeded from its tag and `seed_salt`.
    pub fn new(table: Table, seed_salt: u64, chat_limit: usize) -> Self {
        let rng = DeterministicRng::for_table(table.tag(), seed_salt);
        Self { table, rng, chat: VecDeque::with_capacity(chat_limit), chat_limit }
    }

    /// Table tag.
    pub fn tag(&self) -> &str {
        self.table.tag()
    }

    /// Current table state.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Run a client command against the current state.
    pub fn client(
        &mut self,
        now: Timestamp,
        config: &EngineConfig,
        actor: &Actor,
        command: &ClientCommand,
    ) -> Result<CommandResult, IllegalMove> {
        let mut ctx = Context { now, rng: &mut self.rng, config };
        process_client(&mut ctx, &self.table, actor, command)
    }

    /// Run a scheduler command against the current state.
    pub fn system(
        &mut self,
        now: Timestamp,
        config: &EngineConfig,
        command: &SystemCommand,
    ) -> Result<CommandResult, IllegalMove> {
        let mut ctx = Context { now, rng: &mut self.rng, config };
        process_system(&mut ctx, &self.table, command)
    }

    /// What the scheduler should do now.
    pub fn decide(&mut self, now: Timestamp, config: &EngineConfig) -> Option<TickAction> {
        let mut ctx = Context { now, rng: &mut self.rng, config };
        decide_tick(&mut ctx, &self.table)
    }

    /// Commit a result: score eliminations, apply the delta, record chat.
    pub fn apply(&mut self, result: CommandResult, now: Timestamp) -> Applied {
        let changed = result.changes_state();
        let eliminations = result
            .eliminations
            .iter()
            .map(|e| ScoredElimination { score: elimination_score(&self.table, e), elimination: e.clone() })
            .collect();

        let CommandResult { kind, delta, events, follow_up, .. } = result;
        delta.apply(&mut self.table);

        for event in &events {
            if let TableEvent::Chat { user, message } = event {
                self.push_chat(ChatLine { user: user.clone(), message: message.clone(), at: now });
            }
        }

        Applied { kind, events, eliminations, follow_up, changed }
    }

    /// Mark `actor`'s connection and seat as alive at `now`.
    pub fn touch(&mut self, actor: &Actor, now: Timestamp) {
        if let Some(client_id) = actor.client_id.as_deref() {
            for w in self.table.watchers.iter_mut().filter(|w| w.client_id == client_id) {
                w.last_beat = now;
            }
        }
        if let Some(id) = actor.user_id() {
            for p in self.table.players.iter_mut().filter(|p| p.id == id) {
                p.last_beat = now;
            }
        }
    }

    /// Client view of the table.
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot::of(&self.table)
    }

    /// Recent chat, oldest first.
    pub fn chat_backlog(&self) -> Vec<ChatLine> {
        self.chat.iter().cloned().collect()
    }

    fn push_chat(&mut self, line: ChatLine) {
        if self.chat_limit == 0 {
            return;
        }
        while self.chat.len() >= self.chat_limit {
            self.chat.pop_front();
        }
        self.chat.push_back(line);
    }
}

/// Every table hosted by this process.
#[derive(Default)]
pub struct TableStore {
    tables: RwLock<BTreeMap<String, Arc<Mutex<TableSession>>>>,
}

impl TableStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `sessions`, keyed by tag.
    pub fn from_sessions(sessions: impl IntoIterator<Item = TableSession>) -> Self {
        let tables = sessions
            .into_iter()
            .map(|s| (s.tag().to_string(), Arc::new(Mutex::new(s))))
            .collect();
        Self { tables: RwLock::new(tables) }
    }

    /// Build a table per config, loading each map once from `maps_dir`.
    pub fn load(
        configs: &[TableConfig],
        maps_dir: &Path,
        seed_salt: u64,
        chat_limit: usize,
    ) -> Result<Self, ConfigError> {
        let mut maps: BTreeMap<String, Arc<Adjacency>> = BTreeMap::new();
        let mut sessions = Vec::with_capacity(configs.len());

        for config in configs {
            let adjacency = match maps.get(&config.map_name) {
                Some(adjacency) => adjacency.clone(),
                None => {
                    let def = MapDefinition::load(maps_dir, &config.map_name)?;
                    let adjacency = Arc::new(Adjacency::from_definition(&def)?);
                    debug!("Loaded map {} with {} lands", config.map_name, adjacency.len());
                    maps.insert(config.map_name.clone(), adjacency.clone());
                    adjacency
                }
            };
            sessions.push(TableSession::new(Table::new(config.clone(), adjacency), seed_salt, chat_limit));
        }

        info!("Loaded {} tables on {} maps", sessions.len(), maps.len());
        Ok(Self::from_sessions(sessions))
    }

    /// Add or replace a session.
    pub async fn insert(&self, session: TableSession) {
        let tag = session.tag().to_string();
        self.tables.write().await.insert(tag, Arc::new(Mutex::new(session)));
    }

    /// Session of table `tag`.
    pub async fn get(&self, tag: &str) -> Option<Arc<Mutex<TableSession>>> {
        self.tables.read().await.get(tag).cloned()
    }

    /// Apply `result` to table `tag` under its lock.
    pub async fn apply(&self, tag: &str, result: CommandResult, now: Timestamp) -> Option<Applied> {
        let session = self.get(tag).await?;
        let mut session = session.lock().await;
        Some(session.apply(result, now))
    }

    /// Tags of all tables, sorted.
    pub async fn list(&self) -> Vec<String> {
        self.tables.read().await.keys().cloned().collect()
    }

    /// Number of tables.
    pub async fn len(&self) -> usize {
        self.tables.read().await.len()
    }

    /// No tables at all.
    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{TableParams, User};

    fn config(tag: &str) -> TableConfig {
        TableConfig {
            tag: tag.into(),
            name: tag.into(),
            map_name: "Hex".into(),
            player_slots: 4,
            start_slots: 2,
            points: 0,
            stack_size: 8,
            params: TableParams::default(),
        }
    }

    fn session(tag: &str) -> TableSession {
        let def = MapDefinition::hex_grid("Hex", 3, 2);
        let adjacency = Arc::new(Adjacency::from_definition(&def).unwrap());
        TableSession::new(Table::new(config(tag), adjacency), 7, 3)
    }

    fn actor(id: &str) -> Actor {
        let user = User { id: id.into(), name: id.into(), picture: String::new(), points: 0, level: 1 };
        Actor::user(user, format!("c-{id}"))
    }

    #[test]
    fn test_join_applies_through_session() {
        let config = EngineConfig::default();
        let mut s = session("A");
        let result = s.client(1_000, &config, &actor("u1"), &ClientCommand::Join).unwrap();
        let applied = s.apply(result, 1_000);
        assert_eq!(applied.kind, CommandKind::Join);
        assert!(applied.changed);
        assert_eq!(s.table().players.len(), 1);
        assert_eq!(s.snapshot().players[0].id, "u1");
    }

    #[test]
    fn test_rejected_command_leaves_table_alone() {
        let config = EngineConfig::default();
        let mut s = session("A");
        let before = s.table().state_hash();
        let err = s.client(1_000, &config, &actor("u1"), &ClientCommand::EndTurn).unwrap_err();
        assert_eq!(err.code, crate::game::command::IllegalMoveCode::NotPlaying);
        assert_eq!(s.table().state_hash(), before);
    }

    #[test]
    fn test_chat_backlog_is_bounded() {
        let config = EngineConfig::default();
        let mut s = session("A");
        for i in 0..5 {
            let cmd = ClientCommand::Chat { message: format!("line {i}") };
            let result = s.client(i, &config, &actor("u1"), &cmd).unwrap();
            s.apply(result, i);
        }
        let backlog = s.chat_backlog();
        assert_eq!(backlog.len(), 3);
        assert_eq!(backlog[0].message, "line 2");
        assert_eq!(backlog[2].at, 4);
    }

    #[test]
    fn test_touch_refreshes_watcher_and_seat() {
        let config = EngineConfig::default();
        let mut s = session("A");
        for cmd in [ClientCommand::Enter, ClientCommand::Join] {
            let result = s.client(1_000, &config, &actor("u1"), &cmd).unwrap();
            s.apply(result, 1_000);
        }
        let before = s.table().state_hash();

        s.touch(&actor("u1"), 9_000);
        assert_eq!(s.table().watchers[0].last_beat, 9_000);
        assert_eq!(s.table().players[0].last_beat, 9_000);
        s.touch(&actor("u2"), 12_000);
        assert_eq!(s.table().watchers[0].last_beat, 9_000);
        assert_eq!(s.table().state_hash(), before);
    }

    #[tokio::test]
    async fn test_store_get_and_list() {
        let store = TableStore::from_sessions(vec![session("B"), session("A")]);
        assert_eq!(store.list().await, vec!["A".to_string(), "B".to_string()]);
        assert!(store.get("A").await.is_some());
        assert!(store.get("C").await.is_none());

        store.insert(session("C")).await;
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_store_apply() {
        let store = TableStore::from_sessions(vec![session("A")]);
        let config = EngineConfig::default();
        let result = {
            let s = store.get("A").await.unwrap();
            let mut s = s.lock().await;
            s.client(5, &config, &actor("u1"), &ClientCommand::Enter).unwrap()
        };
        let applied = store.apply("A", result, 5).await.unwrap();
        assert_eq!(applied.kind, CommandKind::Enter);
        let s = store.get("A").await.unwrap();
        assert_eq!(s.lock().await.table().watchers.len(), 1);
        assert!(store.apply("missing", CommandResult::new(CommandKind::Clean), 5).await.is_none());
    }

    #[test]
    fn test_load_shares_maps() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("maps");
        let mut a = config("A");
        a.map_name = "Melchor".into();
        let mut b = config("B");
        b.map_name = "Melchor".into();
        let store = TableStore::load(&[a, b], &dir, 1, 10).unwrap();
        let tables = store.tables.try_read().unwrap();
        let a = tables.get("A").unwrap().try_lock().unwrap();
        let b = tables.get("B").unwrap().try_lock().unwrap();
        assert!(Arc::ptr_eq(&a.table().adjacency, &b.table().adjacency));
    }

    #[test]
    fn test_load_missing_map() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("maps");
        let mut a = config("A");
        a.map_name = "Atlantis".into();
        assert!(matches!(TableStore::load(&[a], &dir, 1, 10), Err(ConfigError::Map(_))));
    }
}
