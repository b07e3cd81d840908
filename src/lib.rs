//! # Qdice Table Server
//!
//! Authoritative engine for Qdice, a turn-based multiplayer dice game of
//! territory conquest on a hex map.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     QDICE TABLE SERVER                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── rng.rs      - Seeded Xorshift128+ dice stream           │
//! │  ├── clock.rs    - Millisecond timestamps, manual clock      │
//! │  └── hash.rs     - SHA-256 table state hash                  │
//! │                                                              │
//! │  game/           - Rules (pure, no I/O)                      │
//! │  ├── map.rs      - Border graph and connectivity             │
//! │  ├── state.rs    - Tables, lands, seats                      │
//! │  ├── commands.rs - Command processor                         │
//! │  ├── turn.rs     - Reinforcements and turn order             │
//! │  ├── combat.rs   - Attack resolution                         │
//! │  ├── rules.rs    - Ranks, scores, surrender cascade          │
//! │  ├── bots.rs     - Synthetic players                         │
//! │  └── tick.rs     - What is due on a table now                │
//! │                                                              │
//! │  network/        - Plumbing (async)                          │
//! │  ├── session.rs  - Table store, one writer per table         │
//! │  ├── server.rs   - Command handling, scheduler               │
//! │  ├── gateway.rs  - Outbound publishing                       │
//! │  └── store.rs    - Score persistence                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Rule functions never read the clock or a global RNG. Each takes the
//! table, a timestamp and the table's own seeded dice stream, and returns a
//! delta. Given the same seed, commands and timestamps, a table replays to
//! the same state hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{EngineConfig, Settings, TablesFile};
pub use crate::core::clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use crate::core::rng::DeterministicRng;
pub use game::{ClientCommand, IllegalMove, IllegalMoveCode, SystemCommand, Table, TableSnapshot, TableStatus, User};
pub use network::{EngineError, InboundCommand, Scheduler, ServerMessage, TableServer, TableStore, Topic};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
