//! # In-Memory Stores
//!
//! Process-local implementations of [`MessageStore`] and [`PacketArchive`].
//!
//! **Advantages**:
//! - No I/O, simple to set up
//! - Same compare-and-swap and overlap semantics as persistent backends
//!
//! **Limitations**:
//! - Data is lost on restart
//! - Not shared between processes
//!
//! ## Example
//!
//! ```rust
//! use coach_memory::{InMemoryPacketArchive, MemoryPacket, PacketArchive};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), coach_memory::StorageError> {
//!     let archive = InMemoryPacketArchive::new();
//!     archive.append(&MemoryPacket::new("conv-1", 1, 9, "User wants to run a 10k.")).await?;
//!     assert!(archive.append(&MemoryPacket::new("conv-1", 5, 12, "overlap")).await.is_err());
//!     Ok(())
//! }
//! ```
//!
//! ## Thread Safety
//!
//! Both stores use `Arc<RwLock<>>`; each operation holds the lock for its whole
//! check-and-write, which makes compare-and-swap and overlap checks atomic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::store::{expected_stored_version, MessageStore, PacketArchive};
use crate::types::{ConversationMemory, MemoryPacket};

/// In-memory [`MessageStore`] keyed by conversation id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    memories: Arc<RwLock<HashMap<String, ConversationMemory>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations.
    pub async fn len(&self) -> usize {
        self.memories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationMemory>, StorageError> {
        Ok(self.memories.read().await.get(conversation_id).cloned())
    }

    async fn find_by_participants(
        &self,
        user_id: &str,
        coach_id: &str,
    ) -> Result<Option<ConversationMemory>, StorageError> {
        let memories = self.memories.read().await;
        Ok(memories
            .values()
            .find(|m| m.user_id == user_id && m.coach_id == coach_id)
            .cloned())
    }

    async fn save(&self, memory: &ConversationMemory) -> Result<(), StorageError> {
        let expected = expected_stored_version(memory)?;
        let mut memories = self.memories.write().await;

        let stored_version = match memories.get(&memory.conversation_id) {
            Some(stored) => Some(stored.version),
            None => {
                let pair_taken = memories
                    .values()
                    .any(|m| m.user_id == memory.user_id && m.coach_id == memory.coach_id);
                if pair_taken {
                    return Err(StorageError::VersionConflict {
                        conversation_id: memory.conversation_id.clone(),
                        expected,
                    });
                }
                None
            }
        };

        match stored_version {
            Some(version) if version == expected => {}
            None if expected == 0 => {}
            _ => {
                return Err(StorageError::VersionConflict {
                    conversation_id: memory.conversation_id.clone(),
                    expected,
                })
            }
        }

        debug!(
            conversation_id = %memory.conversation_id,
            version = memory.version,
            window_len = memory.window.len(),
            "Saved conversation memory"
        );
        memories.insert(memory.conversation_id.clone(), memory.clone());
        Ok(())
    }
}

/// In-memory [`PacketArchive`]; packets of each conversation are kept sorted by epoch, then range.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPacketArchive {
    packets: Arc<RwLock<HashMap<String, Vec<MemoryPacket>>>>,
}

impl InMemoryPacketArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of packets across all conversations.
    pub async fn len(&self) -> usize {
        self.packets.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PacketArchive for InMemoryPacketArchive {
    async fn append(&self, packet: &MemoryPacket) -> Result<(), StorageError> {
        let mut packets = self.packets.write().await;
        let existing = packets.entry(packet.conversation_id.clone()).or_default();

        if existing.iter().any(|p| p.overlaps(packet)) {
            return Err(StorageError::PacketOverlap {
                conversation_id: packet.conversation_id.clone(),
                from: packet.from_message_index,
                to: packet.to_message_index,
            });
        }

        let key = (packet.epoch, packet.from_message_index);
        let position = existing.partition_point(|p| (p.epoch, p.from_message_index) < key);
        existing.insert(position, packet.clone());
        Ok(())
    }

    async fn list_recent(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MemoryPacket>, StorageError> {
        let packets = self.packets.read().await;
        Ok(packets
            .get(conversation_id)
            .map(|list| list.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_all(&self, conversation_id: &str) -> Result<usize, StorageError> {
        let mut packets = self.packets.write().await;
        Ok(packets.remove(conversation_id).map(|list| list.len()).unwrap_or(0))
    }

    async fn delete_before_epoch(
        &self,
        conversation_id: &str,
        epoch: u64,
    ) -> Result<usize, StorageError> {
        let mut packets = self.packets.write().await;
        let Some(list) = packets.get_mut(conversation_id) else {
            return Ok(0);
        };
        let before = list.len();
        list.retain(|p| p.epoch >= epoch);
        Ok(before - list.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(mut memory: ConversationMemory) -> ConversationMemory {
        memory.version += 1;
        memory
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemoryMessageStore::new();
        let memory = saved(ConversationMemory::new("u1", "c1"));

        store.save(&memory).await.unwrap();

        let loaded = store.load(&memory.conversation_id).await.unwrap().unwrap();
        assert_eq!(loaded, memory);
        let by_pair = store.find_by_participants("u1", "c1").await.unwrap();
        assert_eq!(by_pair.unwrap().conversation_id, memory.conversation_id);
        assert!(store.find_by_participants("u1", "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let store = InMemoryMessageStore::new();
        assert!(store.load("missing").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_save_rejects_stale_version() {
        let store = InMemoryMessageStore::new();
        let first = saved(ConversationMemory::new("u1", "c1"));
        store.save(&first).await.unwrap();

        let second = saved(first.clone());
        store.save(&second).await.unwrap();

        // A writer that loaded `first` and bumps it to version 2 lost the race.
        let stale = saved(first);
        let err = store.save(&stale).await.unwrap_err();
        assert!(matches!(err, StorageError::VersionConflict { expected: 1, .. }));
    }

    #[tokio::test]
    async fn test_save_rejects_version_zero() {
        let store = InMemoryMessageStore::new();
        let memory = ConversationMemory::new("u1", "c1");
        assert!(matches!(
            store.save(&memory).await,
            Err(StorageError::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_second_conversation_for_pair_conflicts() {
        let store = InMemoryMessageStore::new();
        store
            .save(&saved(ConversationMemory::new("u1", "c1")))
            .await
            .unwrap();

        let duplicate = saved(ConversationMemory::new("u1", "c1"));
        assert!(store.save(&duplicate).await.unwrap_err().is_conflict());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_append_and_list_recent_newest_first() {
        let archive = InMemoryPacketArchive::new();
        archive.append(&MemoryPacket::new("conv", 10, 18, "second")).await.unwrap();
        archive.append(&MemoryPacket::new("conv", 1, 9, "first")).await.unwrap();
        archive.append(&MemoryPacket::new("other", 1, 9, "elsewhere")).await.unwrap();

        let recent = archive.list_recent("conv", 5).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|p| p.summary_text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);

        let limited = archive.list_recent("conv", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].from_message_index, 10);
    }

    #[tokio::test]
    async fn test_append_rejects_overlap() {
        let archive = InMemoryPacketArchive::new();
        archive.append(&MemoryPacket::new("conv", 1, 9, "a")).await.unwrap();

        let err = archive
            .append(&MemoryPacket::new("conv", 9, 12, "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PacketOverlap { from: 9, to: 12, .. }));
        assert_eq!(archive.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let archive = InMemoryPacketArchive::new();
        archive.append(&MemoryPacket::new("conv", 1, 9, "a")).await.unwrap();
        archive.append(&MemoryPacket::new("conv", 10, 18, "b")).await.unwrap();
        archive.append(&MemoryPacket::new("other", 1, 9, "c")).await.unwrap();

        assert_eq!(archive.delete_all("conv").await.unwrap(), 2);
        assert_eq!(archive.delete_all("conv").await.unwrap(), 0);
        assert!(archive.list_recent("conv", 10).await.unwrap().is_empty());
        assert_eq!(archive.len().await, 1);
    }

    #[tokio::test]
    async fn test_epochs_are_separate_histories() {
        let archive = InMemoryPacketArchive::new();
        archive.append(&MemoryPacket::new("conv", 1, 9, "old")).await.unwrap();
        archive.append(&MemoryPacket::new("conv", 10, 18, "old-2")).await.unwrap();
        archive
            .append(&MemoryPacket::new("conv", 1, 9, "new").with_epoch(1))
            .await
            .unwrap();

        let recent = archive.list_recent("conv", 2).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|p| p.summary_text.as_str()).collect();
        assert_eq!(texts, vec!["new", "old-2"]);

        assert_eq!(archive.delete_before_epoch("conv", 1).await.unwrap(), 2);
        assert_eq!(archive.delete_before_epoch("missing", 1).await.unwrap(), 0);
        let remaining = archive.list_recent("conv", 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].epoch, 1);
    }
}
