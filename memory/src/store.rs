//! # Memory Storage
//!
//! This module defines the two persistence contracts of conversation memory.
//!
//! ## MessageStore
//!
//! Persists one [`ConversationMemory`] row per (user, coach) pair.
//!
//! #### `load(&self, conversation_id) -> Result<Option<ConversationMemory>, StorageError>`
//!
//! Point lookup by conversation id.
//!
//! #### `find_by_participants(&self, user_id, coach_id) -> Result<Option<ConversationMemory>, StorageError>`
//!
//! Point lookup by the (user, coach) pair. At most one conversation exists per pair.
//!
//! #### `save(&self, memory) -> Result<(), StorageError>`
//!
//! Compare-and-swap write. Callers bump `memory.version` by one before saving; the write
//! succeeds only if the stored version is `memory.version - 1` (no row when saving
//! version `1`). Otherwise it fails with [`StorageError::VersionConflict`]. Creating a
//! second conversation for an existing pair is also a conflict.
//!
//! ## PacketArchive
//!
//! Append-only store of [`MemoryPacket`]s.
//!
//! #### `append(&self, packet) -> Result<(), StorageError>`
//!
//! Writes a packet. Fails with [`StorageError::PacketOverlap`] instead of overwriting when
//! the range intersects an existing packet of the same conversation and epoch. The check
//! and the insert are atomic.
//!
//! #### `list_recent(&self, conversation_id, limit) -> Result<Vec<MemoryPacket>, StorageError>`
//!
//! Up to `limit` packets, newest first: highest epoch, then highest range.
//!
//! #### `delete_all(&self, conversation_id) -> Result<usize, StorageError>`
//!
//! Removes every packet of a conversation. Only used by an explicit clear.
//!
//! #### `delete_before_epoch(&self, conversation_id, epoch) -> Result<usize, StorageError>`
//!
//! Removes packets of epochs older than `epoch`: leftovers of compactions that raced a clear.
//!
//! ## Implementations
//!
//! - [`crate::InMemoryMessageStore`] / [`crate::InMemoryPacketArchive`]: process-local, for tests and development
//! - `memory-sqlite`: persistent SQLite backend
//!
//! ## Example
//!
//! ```rust
//! use coach_memory::{ConversationMemory, MessageStore, StorageError};
//!
//! async fn create(store: &impl MessageStore) -> Result<ConversationMemory, StorageError> {
//!     let mut memory = ConversationMemory::new("user123", "coach-strength");
//!     memory.version += 1;
//!     store.save(&memory).await?;
//!     Ok(memory)
//! }
//! ```

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{ConversationMemory, MemoryPacket};

/// Persistence of the live window and bookkeeping of each conversation.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Retrieves a conversation by id. Returns `None` if not found.
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationMemory>, StorageError>;

    /// Retrieves the conversation of a (user, coach) pair. Returns `None` if not found.
    async fn find_by_participants(
        &self,
        user_id: &str,
        coach_id: &str,
    ) -> Result<Option<ConversationMemory>, StorageError>;

    /// Compare-and-swap save; see the module docs for the version rule.
    async fn save(&self, memory: &ConversationMemory) -> Result<(), StorageError>;
}

/// Write-once archive of compacted summary packets.
#[async_trait]
pub trait PacketArchive: Send + Sync {
    /// Appends a packet; overlapping ranges are refused.
    async fn append(&self, packet: &MemoryPacket) -> Result<(), StorageError>;

    /// Returns up to `limit` packets of a conversation, newest epoch and range first.
    async fn list_recent(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MemoryPacket>, StorageError>;

    /// Deletes all packets of a conversation and returns how many were removed.
    async fn delete_all(&self, conversation_id: &str) -> Result<usize, StorageError>;

    /// Deletes packets whose epoch is older than `epoch` and returns how many were removed.
    async fn delete_before_epoch(
        &self,
        conversation_id: &str,
        epoch: u64,
    ) -> Result<usize, StorageError>;
}

/// Expected stored version for a compare-and-swap save of `memory`.
pub fn expected_stored_version(memory: &ConversationMemory) -> Result<u64, StorageError> {
    memory.version.checked_sub(1).ok_or_else(|| {
        StorageError::InvariantViolation(format!(
            "conversation {} saved with version 0; bump the version before saving",
            memory.conversation_id
        ))
    })
}
