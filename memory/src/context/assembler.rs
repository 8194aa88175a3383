//! Context assembler: pure function from memory + packets to [`ConversationContext`].

use tracing::debug;

use super::types::ConversationContext;
use crate::config::PACKET_LOOKAHEAD;
use crate::types::{ConversationMemory, MemoryPacket};

/// Separator between concatenated packet summaries.
const SUMMARY_SEPARATOR: &str = "\n\n";

/// Assembles a context from a memory and its most recent packets. Never reads or writes storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAssembler {
    packet_lookahead: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(PACKET_LOOKAHEAD)
    }
}

impl ContextAssembler {
    pub fn new(packet_lookahead: usize) -> Self {
        Self { packet_lookahead }
    }

    pub fn packet_lookahead(&self) -> usize {
        self.packet_lookahead
    }

    /// Builds the context.
    ///
    /// `packets` may come in any order and hold more than `packet_lookahead` entries; the
    /// newest `packet_lookahead` by range are joined newest first. When none are selected
    /// the rolling summary is used (empty for a new conversation). Packets of another
    /// conversation or epoch are ignored.
    pub fn assemble(
        &self,
        memory: &ConversationMemory,
        packets: &[MemoryPacket],
    ) -> ConversationContext {
        let mut selected: Vec<&MemoryPacket> = packets
            .iter()
            .filter(|p| p.conversation_id == memory.conversation_id && p.epoch == memory.epoch)
            .collect();
        selected.sort_by(|a, b| b.to_message_index.cmp(&a.to_message_index));
        selected.truncate(self.packet_lookahead);

        let historical_summary = if selected.is_empty() {
            memory.rolling_summary.clone()
        } else {
            selected
                .iter()
                .map(|p| p.summary_text.as_str())
                .collect::<Vec<_>>()
                .join(SUMMARY_SEPARATOR)
        };

        debug!(
            conversation_id = %memory.conversation_id,
            recent = memory.window.len(),
            packets = selected.len(),
            summary_len = historical_summary.len(),
            "Assembled conversation context"
        );

        ConversationContext {
            conversation_id: Some(memory.conversation_id.clone()),
            recent_messages: memory.window.clone(),
            historical_summary,
            message_count: memory.total_message_count,
        }
    }
}
