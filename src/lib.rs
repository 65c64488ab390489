//! Card Clash - two-seat card battle engine with event-log replication
//!
//! The rules core (pending actions, combat, turn structure) runs identically
//! whether a match is played locally or replicated between two peers through
//! an append-only, strictly sequenced event log.

pub mod core;
pub mod error;
pub mod game;
pub mod loader;
pub mod replication;
pub mod targeting;
pub mod zones;

pub use error::{ClashError, Result};
