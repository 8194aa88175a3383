//! # Core Types
//!
//! This module defines the data model of rolling conversation memory.
//!
//! ## ChatMessage
//!
//! One exchanged message between a user and a coach. Immutable once created.
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `role` | `MessageRole` | `user` or `assistant` |
//! | `content` | `String` | Message text |
//! | `timestamp` | `DateTime<Utc>` | When the message was created |
//! | `metadata` | `Option<MessageMetadata>` | Opaque key-value bag |
//!
//! ## ConversationMemory
//!
//! One per (user, coach) pair. Holds the live window of newest messages, the
//! monotonically increasing `total_message_count`, and the most recent summary text.
//! Messages are addressed by their 1-based absolute index in the conversation, so the
//! window always covers `total_message_count - window.len() + 1 ..= total_message_count`.
//!
//! ## MemoryPacket
//!
//! An immutable, range-addressed summary of a contiguous slice of messages that has
//! been compacted out of the window.
//!
//! ## Epochs
//!
//! Every clear starts a new epoch of the conversation. Packets carry the epoch they
//! were compacted in; only packets of the memory's current epoch describe its history.
//!
//! ## Example
//!
//! ```rust
//! use coach_memory::{ChatMessage, ConversationMemory};
//!
//! let mut memory = ConversationMemory::new("user123", "coach-nutrition");
//! memory.push(ChatMessage::user("I want to cut to 75kg by summer"));
//! assert_eq!(memory.total_message_count, 1);
//! assert_eq!(memory.first_window_index(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::StorageError;

/// Who sent a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MessageRole> for prompt::MessageRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => prompt::MessageRole::User,
            MessageRole::Assistant => prompt::MessageRole::Assistant,
        }
    }
}

/// Opaque key-value bag attached to a message. No schema is assumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MessageMetadata(BTreeMap<String, Value>);

impl MessageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// A single exchanged message. Fields are read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    role: MessageRole,
    content: String,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<MessageMetadata>,
}

impl ChatMessage {
    /// Creates a message stamped with the current time.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> Option<&MessageMetadata> {
        self.metadata.as_ref()
    }

    /// Converts to the request message type used by LLM clients.
    pub fn to_prompt_message(&self) -> prompt::ChatMessage {
        prompt::ChatMessage::new(self.role.into(), self.content.clone())
    }
}

/// Rolling memory of one (user, coach) conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMemory {
    /// Generated once on creation, never reused.
    pub conversation_id: String,
    pub user_id: String,
    pub coach_id: String,
    /// Newest last.
    pub window: Vec<ChatMessage>,
    /// Every message ever appended; never decremented except by an explicit reset.
    pub total_message_count: u64,
    /// Text of the most recently produced packet, or empty.
    pub rolling_summary: String,
    /// Optimistic concurrency counter. `0` means never persisted.
    pub version: u64,
    /// Incremented by every reset; message indices restart at 1 in each epoch.
    #[serde(default)]
    pub epoch: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationMemory {
    /// Creates an empty, unsaved memory with a fresh conversation id.
    pub fn new(user_id: impl Into<String>, coach_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            coach_id: coach_id.into(),
            window: Vec::new(),
            total_message_count: 0,
            rolling_summary: String::new(),
            version: 0,
            epoch: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Absolute 1-based index of the oldest live message.
    ///
    /// For an empty window this is `total_message_count + 1`, the index the next message will get.
    pub fn first_window_index(&self) -> u64 {
        self.total_message_count
            .saturating_sub(self.window.len() as u64)
            + 1
    }

    /// True if the window holds no more messages than were ever appended.
    pub fn is_consistent(&self) -> bool {
        self.window.len() as u64 <= self.total_message_count
    }

    /// Appends a message to the window and counts it.
    pub fn push(&mut self, message: ChatMessage) {
        self.window.push(message);
        self.total_message_count += 1;
        self.touch();
    }

    /// Drops all content and starts a new epoch; id, participants and version are kept.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.window.clear();
        self.total_message_count = 0;
        self.rolling_summary.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Drops window entries already covered by `packet`.
    ///
    /// A packet is made durable before the shortened window is saved, so an interrupted
    /// append can leave the window overlapping the newest packet. Returns how many
    /// messages were dropped. A packet of another conversation or epoch, or one reaching
    /// past `total_message_count`, cannot come from this history and is reported as an
    /// invariant violation.
    pub fn reconcile_with_packet(&mut self, packet: &MemoryPacket) -> Result<usize, StorageError> {
        if packet.conversation_id != self.conversation_id {
            return Err(StorageError::InvariantViolation(format!(
                "packet of conversation {} applied to conversation {}",
                packet.conversation_id, self.conversation_id
            )));
        }
        if packet.epoch != self.epoch {
            return Err(StorageError::InvariantViolation(format!(
                "packet of epoch {} applied to epoch {} of conversation {}",
                packet.epoch, self.epoch, self.conversation_id
            )));
        }
        if packet.to_message_index > self.total_message_count {
            return Err(StorageError::InvariantViolation(format!(
                "packet [{}, {}] extends past total message count {} of conversation {}",
                packet.from_message_index,
                packet.to_message_index,
                self.total_message_count,
                self.conversation_id
            )));
        }
        let first = self.first_window_index();
        if packet.to_message_index < first {
            return Ok(0);
        }
        let covered = (packet.to_message_index - first + 1) as usize;
        self.window.drain(..covered);
        self.rolling_summary = packet.summary_text.clone();
        self.touch();
        Ok(covered)
    }
}

/// Compacted summary of messages `from_message_index..=to_message_index`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryPacket {
    pub conversation_id: String,
    pub from_message_index: u64,
    pub to_message_index: u64,
    pub message_count: u64,
    pub summary_text: String,
    /// Epoch of the conversation the packet was compacted in.
    #[serde(default)]
    pub epoch: u64,
    pub created_at: DateTime<Utc>,
}

impl MemoryPacket {
    /// Creates a packet for the inclusive range `from..=to`; `to` must be `>= from`.
    pub fn new(
        conversation_id: impl Into<String>,
        from_message_index: u64,
        to_message_index: u64,
        summary_text: impl Into<String>,
    ) -> Self {
        debug_assert!(to_message_index >= from_message_index);
        Self {
            conversation_id: conversation_id.into(),
            from_message_index,
            to_message_index,
            message_count: to_message_index - from_message_index + 1,
            summary_text: summary_text.into(),
            epoch: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// True if both packets belong to one epoch and their inclusive ranges share an index.
    pub fn overlaps(&self, other: &MemoryPacket) -> bool {
        self.epoch == other.epoch
            && self.from_message_index <= other.to_message_index
            && other.from_message_index <= self.to_message_index
    }
}
