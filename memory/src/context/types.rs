//! Assembled context type and its formatting for AI model consumption.

use serde::{Deserialize, Serialize};

use super::utils::estimate_tokens;
use crate::types::ChatMessage;

/// Recent raw messages plus compacted history of one conversation.
///
/// Built by [`super::ContextAssembler`]; consumed by the prompt-construction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// `None` when the conversation does not exist yet.
    pub conversation_id: Option<String>,
    /// The live window, oldest first.
    pub recent_messages: Vec<ChatMessage>,
    /// Newest packet summaries joined by blank lines, or the rolling summary.
    pub historical_summary: String,
    /// Every message ever appended to the conversation.
    pub message_count: u64,
}

impl ConversationContext {
    /// Context of a conversation that has no messages.
    pub fn empty() -> Self {
        Self {
            conversation_id: None,
            recent_messages: Vec::new(),
            historical_summary: String::new(),
            message_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recent_messages.is_empty() && self.historical_summary.is_empty()
    }

    /// Approximate prompt size of the summary and window.
    pub fn estimated_tokens(&self) -> usize {
        let summary = if self.historical_summary.is_empty() {
            0
        } else {
            estimate_tokens(&self.historical_summary)
        };
        summary
            + self
                .recent_messages
                .iter()
                .map(|m| estimate_tokens(m.content()))
                .sum::<usize>()
    }

    /// Returns the context as a single string (no current question).
    pub fn format_for_model(&self, system_message: Option<&str>) -> String {
        let recent = self.prompt_messages();
        prompt::format_for_model(system_message, &self.historical_summary, &recent)
    }

    /// Returns the context as request messages ending with `current_question`.
    pub fn to_messages(
        &self,
        system_message: Option<&str>,
        current_question: &str,
    ) -> Vec<prompt::ChatMessage> {
        prompt::format_for_model_as_messages(
            system_message,
            &self.historical_summary,
            self.prompt_messages(),
            current_question,
        )
    }

    fn prompt_messages(&self) -> Vec<prompt::ChatMessage> {
        self.recent_messages
            .iter()
            .map(ChatMessage::to_prompt_message)
            .collect()
    }
}
