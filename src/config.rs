//! Engine Configuration
//!
//! Timing knobs for the rules and scheduler ([`EngineConfig`]), the static
//! table list ([`TablesFile`]) and process settings ([`Settings`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::game::map::MapError;
use crate::game::state::TableConfig;

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Tables file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Tables file is not valid JSON.
    #[error("invalid tables json: {0}")]
    Json(#[from] serde_json::Error),
    /// A table's settings are inconsistent.
    #[error("table {tag}: {reason}")]
    InvalidTable {
        /// Offending table.
        tag: String,
        /// What is wrong.
        reason: String,
    },
    /// A map failed to load.
    #[error("map error: {0}")]
    Map(#[from] MapError),
}

/// Rule and scheduler timings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Scheduler interval per table.
    pub tick_period: Duration,
    /// Default turn length in seconds.
    pub turn_seconds: u32,
    /// Delay between an attack and its roll.
    pub roll_delay: Duration,
    /// Roll delay when a bot attacks.
    pub bot_roll_delay: Duration,
    /// Delay before a bot acts on its turn.
    pub bot_think_delay: Duration,
    /// Countdown once enough seats are taken.
    pub game_start_countdown: Duration,
    /// Countdown once every seat is taken.
    pub game_start_countdown_full: Duration,
    /// Wait after the last human joined before seating bots.
    pub bot_fill_delay: Duration,
    /// Watchers silent this long are dropped.
    pub watcher_timeout: Duration,
    /// Seated players silent this long are removed between games.
    pub player_timeout: Duration,
    /// Out turns tolerated before elimination.
    pub out_turn_limit: u32,
    /// Turns a bot may pass in a row before giving up.
    pub bot_deadlock_max: u32,
    /// Chat lines replayed on enter.
    pub chat_backlog: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(100),
            turn_seconds: 10,
            roll_delay: Duration::from_millis(1000),
            bot_roll_delay: Duration::from_millis(500),
            bot_think_delay: Duration::from_millis(500),
            game_start_countdown: Duration::from_secs(30),
            game_start_countdown_full: Duration::from_secs(5),
            bot_fill_delay: Duration::from_secs(3),
            watcher_timeout: Duration::from_secs(30),
            player_timeout: Duration::from_secs(300),
            out_turn_limit: 5,
            bot_deadlock_max: 10,
            chat_backlog: 20,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden from environment variables.
    ///
    /// - `QDICE_TICK_MS`
    /// - `QDICE_TURN_SECONDS`
    /// - `QDICE_ROLL_MS`
    /// - `QDICE_BOT_ROLL_MS`
    /// - `QDICE_COUNTDOWN_SECONDS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_parse::<u64>("QDICE_TICK_MS") {
            config.tick_period = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = env_parse::<u32>("QDICE_TURN_SECONDS") {
            config.turn_seconds = secs;
        }
        if let Some(ms) = env_parse::<u64>("QDICE_ROLL_MS") {
            config.roll_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("QDICE_BOT_ROLL_MS") {
            config.bot_roll_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>("QDICE_COUNTDOWN_SECONDS") {
            config.game_start_countdown = Duration::from_secs(secs);
        }
        config
    }

    /// Turn length for a table in milliseconds.
    pub fn turn_ms(&self, table_turn_seconds: Option<u32>) -> i64 {
        table_turn_seconds.unwrap_or(self.turn_seconds) as i64 * 1000
    }
}

/// Duration as signed milliseconds for timestamp arithmetic.
#[inline]
pub fn millis(d: Duration) -> i64 {
    d.as_millis() as i64
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// `tables.json` contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablesFile {
    /// Tables to host.
    pub tables: Vec<TableConfig>,
}

impl TablesFile {
    /// Read and validate a tables file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Parse and validate JSON.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let file: TablesFile = serde_json::from_str(raw)?;
        for table in &file.tables {
            validate_table(table)?;
        }
        Ok(file)
    }
}

fn validate_table(table: &TableConfig) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidTable {
        tag: table.tag.clone(),
        reason: reason.to_string(),
    };
    if table.tag.is_empty() {
        return Err(invalid("empty tag"));
    }
    if table.player_slots < 2 {
        return Err(invalid("needs at least 2 player slots"));
    }
    if table.start_slots < 2 || table.start_slots > table.player_slots {
        return Err(invalid("start slots must be within 2..=player_slots"));
    }
    if table.stack_size < 2 {
        return Err(invalid("stack size must be at least 2"));
    }
    if table.player_slots > 9 {
        return Err(invalid("at most 9 player slots"));
    }
    Ok(())
}

/// Process-level settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path of the tables file.
    pub tables_path: PathBuf,
    /// Directory of map files.
    pub maps_dir: PathBuf,
    /// Salt mixed into every table's dice seed.
    pub seed_salt: u64,
    /// Fill every table with bots at startup.
    pub bot_tables: bool,
    /// Rule and scheduler timings.
    pub engine: EngineConfig,
}

impl Settings {
    /// Load settings from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `QDICE_TABLES` - tables file (default: `tables.json`)
    /// - `QDICE_MAPS` - maps directory (default: `maps`)
    /// - `QDICE_SEED` - dice seed salt (default: current time)
    ///
    /// CLI flags:
    /// - `--bots` - seat bots on every table at startup
    /// - `--seed <N>` - override the seed salt
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();

        let tables_path = std::env::var("QDICE_TABLES")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tables.json"));
        let maps_dir = std::env::var("QDICE_MAPS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("maps"));

        let seed_salt = parse_cli_value(&args, "--seed")
            .and_then(|v| v.parse().ok())
            .or_else(|| env_parse("QDICE_SEED"))
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as u64);

        Settings {
            tables_path,
            maps_dir,
            seed_salt,
            bot_tables: args.iter().any(|a| a == "--bots"),
            engine: EngineConfig::from_env(),
        }
    }
}

fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find_map(|pair| {
        if pair[0] == flag {
            Some(pair[1].clone())
        } else {
            None
        }
    })
}
