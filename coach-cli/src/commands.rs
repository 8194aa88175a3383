//! Command handlers behind `coachmem`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use coach_memory::{ChatMessage, ConversationMemoryManager, LlmSummarizer, Summarizer};
use llm_client::OpenAILlmClient;
use serde_json::json;
use tracing::{info, warn};

use crate::cli::Commands;
use crate::config::AppConfig;

/// Summarizer used when no LLM is configured; compaction then falls back to truncation.
struct UnconfiguredSummarizer;

#[async_trait]
impl Summarizer for UnconfiguredSummarizer {
    async fn summarize(&self, _messages: &[ChatMessage]) -> anyhow::Result<String> {
        anyhow::bail!("OPENAI_API_KEY not set; summarization unavailable")
    }
}

/// Picks the summarizer for `config`: the OpenAI-backed one when a key is present.
pub fn summarizer_for(config: &AppConfig) -> Arc<dyn Summarizer> {
    match &config.llm {
        Some(llm) => {
            let client = OpenAILlmClient::from_config(llm);
            info!(model = client.model(), "Using LLM summarizer");
            Arc::new(
                LlmSummarizer::new(Arc::new(client))
                    .with_word_limit(config.memory.compaction.summary_word_limit),
            )
        }
        None => {
            warn!("OPENAI_API_KEY not set; overflowing windows will be truncated");
            Arc::new(UnconfiguredSummarizer)
        }
    }
}

/// Opens the SQLite stores and builds the manager.
pub async fn build_manager(
    config: &AppConfig,
    summarizer: Arc<dyn Summarizer>,
) -> Result<ConversationMemoryManager> {
    let (store, archive) = memory_sqlite::connect(&config.database_url)
        .await
        .with_context(|| format!("Open memory database {}", config.database_url))?;
    let manager = ConversationMemoryManager::new(
        Arc::new(store),
        Arc::new(archive),
        summarizer,
        config.memory.clone(),
    )?;
    Ok(manager)
}

/// Runs one command and returns what should be printed.
pub async fn run(manager: &ConversationMemoryManager, command: Commands) -> Result<String> {
    match command {
        Commands::Append {
            user,
            coach,
            role,
            content,
        } => {
            let message = ChatMessage::new(role.into(), content);
            let memory = manager
                .append_message(&user, &coach, message)
                .await
                .context("Message not saved, please retry")?;
            Ok(serde_json::to_string_pretty(&memory)?)
        }
        Commands::Context {
            user,
            coach,
            prompt,
            system,
        } => {
            let context = manager.get_context(&user, &coach).await?;
            if prompt {
                Ok(context.format_for_model(system.as_deref()))
            } else {
                let value = json!({
                    "context": context,
                    "estimated_tokens": context.estimated_tokens(),
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
        }
        Commands::Clear { user, coach } => {
            manager.clear(&user, &coach).await?;
            Ok(json!({ "cleared": true, "user_id": user, "coach_id": coach }).to_string())
        }
    }
}
