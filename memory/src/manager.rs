//! # Conversation Memory Manager
//!
//! The only entry point for reading and writing conversation memory: `append_message`,
//! `get_context` and `clear`.
//!
//! ## Consistency
//!
//! - Appends and clears of one (user, coach) pair are serialized inside the process by a
//!   per-conversation async mutex.
//! - Every save is a compare-and-swap on `version`; when another process won the race
//!   the whole append is retried from a fresh load, up to `max_append_attempts` times.
//! - Packets are written before the shortened window. Each load for append reconciles
//!   the window against the newest packet, so an append interrupted between the two
//!   writes never duplicates or loses a message.
//! - `clear` starts a new epoch. A compaction that raced the clear can still land a
//!   packet of the old epoch; it is ignored by reads and deleted by the next append.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};

use crate::compactor::{CompactionOutcome, Compactor};
use crate::config::{ConfigError, MemoryConfig};
use crate::context::{ContextAssembler, ConversationContext};
use crate::error::StorageError;
use crate::store::{MessageStore, PacketArchive};
use crate::summarizer::Summarizer;
use crate::types::{ChatMessage, ConversationMemory};

/// Idle lock entries are pruned once the table grows past this size.
const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1024;

type ParticipantKey = (String, String);

/// Per-(user, coach) async mutexes.
#[derive(Default)]
struct ConversationLocks {
    locks: Mutex<HashMap<ParticipantKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationLocks {
    async fn acquire(&self, user_id: &str, coach_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > LOCK_TABLE_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks
                .entry((user_id.to_string(), coach_id.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Rolling conversation memory service.
pub struct ConversationMemoryManager {
    store: Arc<dyn MessageStore>,
    archive: Arc<dyn PacketArchive>,
    compactor: Compactor,
    assembler: ContextAssembler,
    config: MemoryConfig,
    locks: ConversationLocks,
}

impl ConversationMemoryManager {
    /// Builds a manager; fails if `config` is inconsistent.
    pub fn new(
        store: Arc<dyn MessageStore>,
        archive: Arc<dyn PacketArchive>,
        summarizer: Arc<dyn Summarizer>,
        config: MemoryConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            compactor: Compactor::new(archive.clone(), summarizer, config.compaction.clone()),
            assembler: ContextAssembler::new(config.packet_lookahead),
            store,
            archive,
            config,
            locks: ConversationLocks::default(),
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Appends `message` to the (user, coach) conversation, creating it on first use.
    ///
    /// Compacts when the window overflows and returns the memory as saved.
    #[instrument(skip(self, message), fields(role = %message.role()))]
    pub async fn append_message(
        &self,
        user_id: &str,
        coach_id: &str,
        message: ChatMessage,
    ) -> Result<ConversationMemory, StorageError> {
        let _guard = self.locks.acquire(user_id, coach_id).await;

        let attempts = self.config.max_append_attempts;
        for attempt in 1..=attempts {
            match self.try_append(user_id, coach_id, &message).await {
                Ok(memory) => return Ok(memory),
                Err(e) if e.is_conflict() => {
                    warn!(attempt, attempts, error = %e, "Concurrent write detected; retrying append");
                }
                Err(e) => return Err(e),
            }
        }

        Err(StorageError::RetriesExhausted {
            user_id: user_id.to_string(),
            coach_id: coach_id.to_string(),
            attempts,
        })
    }

    async fn try_append(
        &self,
        user_id: &str,
        coach_id: &str,
        message: &ChatMessage,
    ) -> Result<ConversationMemory, StorageError> {
        let mut memory = match self.store.find_by_participants(user_id, coach_id).await? {
            Some(mut memory) => {
                self.reconcile(&mut memory).await?;
                memory
            }
            None => {
                let memory = ConversationMemory::new(user_id, coach_id);
                info!(conversation_id = %memory.conversation_id, "Creating conversation memory");
                memory
            }
        };

        memory.push(message.clone());

        match self.compactor.compact(&mut memory).await? {
            CompactionOutcome::NotDue => {}
            CompactionOutcome::Compacted(packet) => {
                debug!(from = packet.from_message_index, to = packet.to_message_index, "Packet written");
            }
            CompactionOutcome::Truncated { dropped, .. } => {
                debug!(dropped, "Window truncated without packet");
            }
        }

        let limit = self.config.compaction.window_limit;
        if memory.window.len() > limit {
            return Err(StorageError::InvariantViolation(format!(
                "window of conversation {} holds {} messages after compaction (limit {})",
                memory.conversation_id,
                memory.window.len(),
                limit
            )));
        }

        memory.version += 1;
        self.store.save(&memory).await?;
        Ok(memory)
    }

    /// Drops window entries a durable packet already covers and purges packets of
    /// epochs before the memory's.
    async fn reconcile(&self, memory: &mut ConversationMemory) -> Result<(), StorageError> {
        let newest = self.archive.list_recent(&memory.conversation_id, 1).await?;
        if let Some(packet) = newest.first() {
            if packet.epoch < memory.epoch {
                let purged = self
                    .archive
                    .delete_before_epoch(&memory.conversation_id, memory.epoch)
                    .await?;
                warn!(
                    conversation_id = %memory.conversation_id,
                    epoch = memory.epoch,
                    purged,
                    "Deleted packets left over from before the last clear"
                );
                return Ok(());
            }
            if packet.epoch > memory.epoch || packet.to_message_index > memory.total_message_count {
                // Another writer compacted after this memory was loaded.
                return Err(StorageError::VersionConflict {
                    conversation_id: memory.conversation_id.clone(),
                    expected: memory.version,
                });
            }
            let dropped = memory.reconcile_with_packet(packet)?;
            if dropped > 0 {
                warn!(
                    conversation_id = %memory.conversation_id,
                    dropped,
                    to = packet.to_message_index,
                    "Window overlapped newest packet; repaired"
                );
            }
        }
        Ok(())
    }

    /// Returns the assembled context of a conversation. Read-only.
    ///
    /// An absent conversation yields [`ConversationContext::empty`].
    #[instrument(skip(self))]
    pub async fn get_context(
        &self,
        user_id: &str,
        coach_id: &str,
    ) -> Result<ConversationContext, StorageError> {
        let Some(mut memory) = self.store.find_by_participants(user_id, coach_id).await? else {
            return Ok(ConversationContext::empty());
        };

        let limit = self.config.packet_lookahead.max(1);
        let mut packets = self.archive.list_recent(&memory.conversation_id, limit).await?;
        // Packets written after this snapshot was read describe messages it still holds raw;
        // packets of other epochs are not part of its history.
        packets.retain(|p| {
            p.epoch == memory.epoch && p.to_message_index <= memory.total_message_count
        });
        if let Some(newest) = packets.first() {
            memory.reconcile_with_packet(newest)?;
        }

        Ok(self.assembler.assemble(&memory, &packets))
    }

    /// Deletes all packets and resets the conversation to empty in a new epoch, keeping
    /// its id.
    ///
    /// Clearing an absent conversation succeeds without doing anything.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: &str, coach_id: &str) -> Result<(), StorageError> {
        let _guard = self.locks.acquire(user_id, coach_id).await;

        let attempts = self.config.max_append_attempts;
        for attempt in 1..=attempts {
            let Some(mut memory) = self.store.find_by_participants(user_id, coach_id).await?
            else {
                debug!("Nothing to clear");
                return Ok(());
            };

            let deleted = self.archive.delete_all(&memory.conversation_id).await?;
            memory.reset();
            memory.version += 1;
            match self.store.save(&memory).await {
                Ok(()) => {
                    info!(conversation_id = %memory.conversation_id, deleted, "Cleared conversation memory");
                    return Ok(());
                }
                Err(e) if e.is_conflict() => {
                    warn!(attempt, attempts, error = %e, "Concurrent write detected; retrying clear");
                }
                Err(e) => return Err(e),
            }
        }

        Err(StorageError::RetriesExhausted {
            user_id: user_id.to_string(),
            coach_id: coach_id.to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_locks_are_per_pair() {
        let locks = ConversationLocks::default();
        let first = locks.acquire("u1", "c1").await;

        // Another pair is not blocked.
        let _other = locks.acquire("u1", "c2").await;

        let same = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            locks.acquire("u1", "c1"),
        )
        .await;
        assert!(same.is_err());

        drop(first);
        let _again = locks.acquire("u1", "c1").await;
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = MemoryConfig {
            max_append_attempts: 0,
            ..MemoryConfig::default()
        };
        let result = ConversationMemoryManager::new(
            Arc::new(crate::InMemoryMessageStore::new()),
            Arc::new(crate::InMemoryPacketArchive::new()),
            Arc::new(NeverSummarizer),
            config,
        );
        assert!(result.is_err());
    }

    struct NeverSummarizer;

    #[async_trait::async_trait]
    impl Summarizer for NeverSummarizer {
        async fn summarize(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
            anyhow::bail!("not used")
        }
    }
}
