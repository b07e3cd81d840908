//! Core primitives.
//!
//! Seeded randomness, timestamps and state hashing. Nothing in here knows
//! about tables or players.

pub mod clock;
pub mod rng;
pub mod hash;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use rng::DeterministicRng;
pub use hash::compute_state_hash;
