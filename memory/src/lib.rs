//! # Coach Memory Crate
//!
//! Rolling conversation memory for (user, coach) chats: a bounded live window of recent
//! messages plus an append-only archive of compacted summary packets.
//!
//! ## Features
//!
//! - **Bounded prompt context**: the window never holds more than `window_limit` messages
//! - **No silent loss**: overflow is summarized into durable packets with absolute ranges
//! - **Graceful degradation**: a failed or slow summarizer truncates instead of blocking
//! - **Concurrency safe**: per-conversation locking plus versioned compare-and-swap saves
//! - **Async trait-based design** for storage backends and summarizers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use coach_memory::{
//!     ChatMessage, ConversationMemoryManager, InMemoryMessageStore, InMemoryPacketArchive,
//!     LlmSummarizer, MemoryConfig,
//! };
//!
//! # async fn run(llm: Arc<dyn llm_client::LlmClient>) -> anyhow::Result<()> {
//! let manager = ConversationMemoryManager::new(
//!     Arc::new(InMemoryMessageStore::new()),
//!     Arc::new(InMemoryPacketArchive::new()),
//!     Arc::new(LlmSummarizer::new(llm)),
//!     MemoryConfig::default(),
//! )?;
//!
//! manager.append_message("user123", "coach-run", ChatMessage::user("Ran 5k today")).await?;
//! let context = manager.get_context("user123", "coach-run").await?;
//! println!("{}", context.format_for_model(Some("You are a running coach.")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Messages, conversation memory and packets
//! - [`store`] - Message store and packet archive interfaces
//! - [`inmemory_store`] - In-memory backends
//! - [`summarizer`] - Summarization seam and LLM adapter
//! - [`compactor`] - Window compaction with truncation fallback
//! - [`context`] - Context assembly for prompts
//! - [`manager`] - `append_message`, `get_context`, `clear`
//!
//! ## External Interactions
//!
//! - **Storage backends**: in-memory here, SQLite in the `memory-sqlite` crate
//! - **LLM**: any `llm_client::LlmClient` through [`LlmSummarizer`]

pub mod compactor;
pub mod config;
pub mod context;
pub mod error;
pub mod inmemory_store;
pub mod manager;
pub mod store;
pub mod summarizer;
pub mod types;

pub use compactor::{CompactionOutcome, CompactionPlan, Compactor};
pub use config::{CompactionConfig, ConfigError, MemoryConfig, PACKET_LOOKAHEAD, RETAINED_TAIL, WINDOW_LIMIT};
pub use context::{estimate_tokens, ContextAssembler, ConversationContext};
pub use error::{StorageError, SummarizationFailure};
pub use inmemory_store::{InMemoryMessageStore, InMemoryPacketArchive};
pub use manager::ConversationMemoryManager;
pub use store::{expected_stored_version, MessageStore, PacketArchive};
pub use summarizer::{LlmSummarizer, Summarizer};
pub use types::*;
