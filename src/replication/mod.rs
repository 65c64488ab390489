//! Event-log replication
//!
//! Two peers stay converged by appending every action to a shared,
//! strictly sequenced log and replaying that log in order.

pub mod apply;
pub mod client;
pub mod event;
pub mod store;

pub use apply::apply_event;
pub use client::{IngestReport, ReplayMode, ReplicationClient};
pub use event::{CardRef, EventPayload, MatchEvent};
pub use store::{EventStore, MemoryEventStore};
