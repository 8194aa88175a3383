//! # Context Assembly
//!
//! Builds the [`ConversationContext`] handed to the prompt-construction layer: the live
//! window as raw messages plus the newest packet summaries as one historical block.
//!
//! ## Example
//!
//! ```rust
//! use coach_memory::{ChatMessage, ContextAssembler, ConversationMemory, MemoryPacket};
//!
//! let mut memory = ConversationMemory::new("user123", "coach-run");
//! memory.push(ChatMessage::user("Ran 5k today"));
//! let packets = vec![MemoryPacket::new(memory.conversation_id.clone(), 1, 9, "User trains for a 10k.")];
//!
//! let context = ContextAssembler::default().assemble(&memory, &packets);
//! assert_eq!(context.recent_messages.len(), 1);
//! assert_eq!(context.historical_summary, "User trains for a 10k.");
//! ```

mod assembler;
mod types;
mod utils;

#[cfg(test)]
mod tests;

pub use assembler::ContextAssembler;
pub use types::ConversationContext;
pub use utils::estimate_tokens;
