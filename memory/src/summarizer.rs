//! Summarization capability used by compaction.
//!
//! [`Summarizer`] is the black-box seam: ordered messages in, plain text out. The
//! [`LlmSummarizer`] adapter satisfies it with any [`LlmClient`] by sending the fixed
//! instruction from the `prompt` crate plus a `role: content` transcript.

use std::sync::Arc;

use async_trait::async_trait;
use llm_client::LlmClient;
use tracing::{debug, instrument};

use crate::types::ChatMessage;

/// Produces a compact natural-language summary of an ordered slice of messages.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;
}

/// [`Summarizer`] backed by an LLM chat completion.
#[derive(Clone)]
pub struct LlmSummarizer {
    llm: Arc<dyn LlmClient>,
    word_limit: usize,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            word_limit: prompt::DEFAULT_SUMMARY_WORD_LIMIT,
        }
    }

    pub fn with_word_limit(mut self, word_limit: usize) -> Self {
        self.word_limit = word_limit;
        self
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    #[instrument(skip(self, messages), fields(message_count = messages.len(), word_limit = self.word_limit))]
    async fn summarize(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let transcript: Vec<prompt::ChatMessage> =
            messages.iter().map(ChatMessage::to_prompt_message).collect();
        let request = prompt::summarization_request(&transcript, self.word_limit);
        let summary = self.llm.get_llm_response_with_messages(request).await?;
        debug!(summary_len = summary.len(), "Received summary");
        Ok(summary)
    }
}
