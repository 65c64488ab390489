//! Error types for the card clash engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClashError {
    #[error("Invalid game action: {0}")]
    InvalidAction(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(u32),

    #[error("Unknown card template: {0}")]
    UnknownTemplate(String),

    #[error("Invalid deck format: {0}")]
    InvalidDeckFormat(String),

    #[error("Invalid card catalog: {0}")]
    InvalidCatalog(String),

    #[error("Event store write failed for sequence {sequence}: {reason}")]
    StoreWrite { sequence: u64, reason: String },

    #[error("Sequence {0} already exists in the event log")]
    SequenceConflict(u64),

    #[error("Replication protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Match stalled at turn {turn} before reaching an end")]
    MatchStalled { turn: u32 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClashError>;
