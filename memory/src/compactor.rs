//! # Compactor
//!
//! Replaces the oldest part of an overflowing window with one durable summary packet.
//!
//! ## Algorithm
//!
//! 1. Due when `window.len() > window_limit`.
//! 2. Split the window into `to_compact` (all but the newest `retained_tail`) and `keep`.
//! 3. Absolute range: `from = total - window.len() + 1`, `to = from + to_compact.len() - 1`.
//! 4. Summarize `to_compact` within `summary_timeout`.
//! 5. Success: append the packet to the archive FIRST, then set `window = keep` and
//!    `rolling_summary` to the new text. The caller saves the memory afterwards.
//! 6. Failure (timeout, backend error, empty or too short text): no packet; keep only the
//!    newest `window_limit` messages and leave `rolling_summary` untouched.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::CompactionConfig;
use crate::error::{StorageError, SummarizationFailure};
use crate::store::PacketArchive;
use crate::summarizer::Summarizer;
use crate::types::{ChatMessage, ConversationMemory, MemoryPacket};

/// What a call to [`Compactor::compact`] did to the memory.
#[derive(Debug, Clone, PartialEq)]
pub enum CompactionOutcome {
    /// Window within limit; nothing changed.
    NotDue,
    /// A packet was written and the window shortened to the retained tail.
    Compacted(MemoryPacket),
    /// Summarization failed; `dropped` oldest messages were discarded without a packet.
    Truncated {
        dropped: usize,
        reason: SummarizationFailure,
    },
}

/// Range selected for one compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPlan {
    /// Number of oldest window messages to summarize.
    pub split: usize,
    pub from_message_index: u64,
    pub to_message_index: u64,
}

pub struct Compactor {
    archive: Arc<dyn PacketArchive>,
    summarizer: Arc<dyn Summarizer>,
    config: CompactionConfig,
}

impl Compactor {
    pub fn new(
        archive: Arc<dyn PacketArchive>,
        summarizer: Arc<dyn Summarizer>,
        config: CompactionConfig,
    ) -> Self {
        Self {
            archive,
            summarizer,
            config,
        }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    pub fn is_due(&self, memory: &ConversationMemory) -> bool {
        memory.window.len() > self.config.window_limit
    }

    /// Selects the slice to summarize, or `None` when compaction is not due.
    pub fn plan(&self, memory: &ConversationMemory) -> Option<CompactionPlan> {
        if !self.is_due(memory) {
            return None;
        }
        let split = memory.window.len() - self.config.retained_tail;
        let from_message_index = memory.first_window_index();
        Some(CompactionPlan {
            split,
            from_message_index,
            to_message_index: from_message_index + split as u64 - 1,
        })
    }

    /// Compacts `memory` in place if due.
    ///
    /// Only archive write failures are returned; summarization failures end in the
    /// truncation fallback and are reported through [`CompactionOutcome::Truncated`].
    /// On error the memory is left unmodified.
    #[instrument(
        skip_all,
        fields(
            conversation_id = %memory.conversation_id,
            window_len = memory.window.len(),
            total = memory.total_message_count
        )
    )]
    pub async fn compact(
        &self,
        memory: &mut ConversationMemory,
    ) -> Result<CompactionOutcome, StorageError> {
        let Some(plan) = self.plan(memory) else {
            return Ok(CompactionOutcome::NotDue);
        };

        let summarized = self.summarize(&memory.window[..plan.split]).await;
        match summarized {
            Ok(summary) => {
                let packet = MemoryPacket::new(
                    memory.conversation_id.clone(),
                    plan.from_message_index,
                    plan.to_message_index,
                    summary,
                )
                .with_epoch(memory.epoch);
                self.archive.append(&packet).await?;

                memory.window.drain(..plan.split);
                memory.rolling_summary = packet.summary_text.clone();
                memory.touch();
                info!(
                    from = plan.from_message_index,
                    to = plan.to_message_index,
                    message_count = packet.message_count,
                    summary_len = packet.summary_text.len(),
                    "Compacted window into packet"
                );
                Ok(CompactionOutcome::Compacted(packet))
            }
            Err(reason) => {
                let dropped = memory.window.len() - self.config.window_limit;
                memory.window.drain(..dropped);
                memory.touch();
                warn!(
                    from = plan.from_message_index,
                    to = plan.to_message_index,
                    dropped,
                    error = %reason,
                    "Summarization failed; truncated window without a packet"
                );
                Ok(CompactionOutcome::Truncated { dropped, reason })
            }
        }
    }

    async fn summarize(&self, messages: &[ChatMessage]) -> Result<String, SummarizationFailure> {
        let timeout = self.config.summary_timeout();
        let summary = match tokio::time::timeout(timeout, self.summarizer.summarize(messages)).await
        {
            Err(_) => return Err(SummarizationFailure::Timeout(timeout)),
            Ok(Err(e)) => return Err(SummarizationFailure::Backend(format!("{e:#}"))),
            Ok(Ok(text)) => text,
        };

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(SummarizationFailure::Empty);
        }
        let len = summary.chars().count();
        if len < self.config.min_summary_chars {
            return Err(SummarizationFailure::TooShort {
                len,
                min: self.config.min_summary_chars,
            });
        }
        Ok(summary.to_string())
    }
}
