//! Error types of the memory subsystem.
//!
//! [`StorageError`] is the only error the public entry points return.
//! [`SummarizationFailure`] is absorbed by the compactor's truncation fallback and only logged.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by stores and by the conversation memory manager.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Compare-and-swap save lost against a concurrent writer.
    #[error("Version conflict on conversation {conversation_id}: expected stored version {expected}")]
    VersionConflict {
        conversation_id: String,
        expected: u64,
    },

    /// Packet archive refused a range that intersects an existing packet.
    #[error("Packet [{from}, {to}] overlaps an existing packet of conversation {conversation_id}")]
    PacketOverlap {
        conversation_id: String,
        from: u64,
        to: u64,
    },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Gave up appending to conversation of user {user_id} with coach {coach_id} after {attempts} conflicting attempts")]
    RetriesExhausted {
        user_id: String,
        coach_id: String,
        attempts: usize,
    },
}

impl StorageError {
    pub fn database(err: impl std::fmt::Display) -> Self {
        StorageError::Database(err.to_string())
    }

    /// True for errors caused by a concurrent writer; the whole append may be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorageError::VersionConflict { .. } | StorageError::PacketOverlap { .. }
        )
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Why a compaction could not produce a packet.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SummarizationFailure {
    #[error("summarizer timed out after {0:?}")]
    Timeout(Duration),

    #[error("summarizer error: {0}")]
    Backend(String),

    #[error("summarizer returned an empty summary")]
    Empty,

    #[error("summary too short: {len} chars, minimum {min}")]
    TooShort { len: usize, min: usize },
}
