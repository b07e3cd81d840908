//! Network Layer
//!
//! Everything around the rules engine: the message envelope, the publish
//! gateway, score persistence, the table store and the per-table scheduler.
//! This layer reads the clock and spawns tasks; all game logic runs through
//! `game/`.

pub mod gateway;
pub mod protocol;
pub mod server;
pub mod session;
pub mod store;

pub use gateway::{BroadcastGateway, PublishGateway, RecordingGateway};
pub use protocol::{ChatLine, InboundCommand, Preferences, ServerMessage, Topic};
pub use server::{EngineError, Scheduler, TableServer};
pub use session::{Applied, ScoredElimination, TableSession, TableStore};
pub use store::{MemoryScoreStore, ScoreStore, StoreError};
