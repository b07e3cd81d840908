//! Game Logic Module
//!
//! The rules engine. Everything here is a pure function of a table snapshot,
//! a timestamp and the table's seeded RNG.
//!
//! ## Module Structure
//!
//! - `map`: adjacency graph, land masses, largest connected group
//! - `state`: table, lands, seats, watchers, eliminations
//! - `rules`: ranks, scoring, seat removal and surrender cascade
//! - `command`: command unions, rejections, deltas
//! - `commands`: the command processor
//! - `turn`: reinforcements and the turn pointer
//! - `combat`: attack resolution
//! - `start`: game start seeding
//! - `elimination`: game end and elimination scoring
//! - `bots` / `tactics`: synthetic players
//! - `tick`: what the scheduler should do next
//! - `events`: facts for publishing
//! - `snapshot`: client view with derived stats

pub mod bots;
pub mod combat;
pub mod command;
pub mod commands;
pub mod elimination;
pub mod events;
pub mod map;
pub mod rules;
pub mod snapshot;
pub mod start;
pub mod state;
pub mod tactics;
pub mod tick;
pub mod turn;

// Re-export key types
pub use command::{Actor, ClientCommand, CommandKind, CommandResult, Delta, IllegalMove, IllegalMoveCode, SystemCommand};
pub use commands::{process_client, process_system, Context};
pub use events::TableEvent;
pub use map::{Adjacency, MapDefinition, MapError};
pub use snapshot::TableSnapshot;
pub use state::{Color, Elimination, EliminationReason, Land, Player, Table, TableConfig, TableParams, TableStatus, User};
pub use tick::{decide_tick, TickAction};
