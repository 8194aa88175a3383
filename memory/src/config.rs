//! Tunables of the memory subsystem.
//!
//! All structs deserialize with defaults so partial configuration files work.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum live window length under normal operation.
pub const WINDOW_LIMIT: usize = 10;
/// Newest messages kept live when a compaction fires.
pub const RETAINED_TAIL: usize = 2;
/// Number of recent packets concatenated into the historical summary.
pub const PACKET_LOOKAHEAD: usize = 3;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// When and how the window is compacted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompactionConfig {
    /// Compaction fires once the window holds more than this many messages.
    #[serde(default = "d_window_limit")]
    pub window_limit: usize,
    /// Newest messages left in the window after a successful compaction.
    #[serde(default = "d_retained_tail")]
    pub retained_tail: usize,
    /// Upper bound for one summarization call.
    #[serde(default = "d_summary_timeout_ms")]
    pub summary_timeout_ms: u64,
    /// Summaries shorter than this (in chars, after trimming) are treated as degenerate.
    #[serde(default = "d_min_summary_chars")]
    pub min_summary_chars: usize,
    /// Word limit requested from the summarizer.
    #[serde(default = "d_summary_word_limit")]
    pub summary_word_limit: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            window_limit: WINDOW_LIMIT,
            retained_tail: RETAINED_TAIL,
            summary_timeout_ms: d_summary_timeout_ms(),
            min_summary_chars: d_min_summary_chars(),
            summary_word_limit: d_summary_word_limit(),
        }
    }
}

impl CompactionConfig {
    pub fn summary_timeout(&self) -> Duration {
        Duration::from_millis(self.summary_timeout_ms)
    }

    /// The retained tail must be non-empty and smaller than the window limit, so every
    /// compaction summarizes at least one message and never summarizes the message
    /// being appended.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retained_tail == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retained_tail",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retained_tail >= self.window_limit {
            return Err(ConfigError::InvalidValue {
                field: "retained_tail",
                reason: format!(
                    "must be smaller than window_limit ({})",
                    self.window_limit
                ),
            });
        }
        if self.summary_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "summary_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration of [`crate::ConversationMemoryManager`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    #[serde(default)]
    pub compaction: CompactionConfig,
    #[serde(default = "d_packet_lookahead")]
    pub packet_lookahead: usize,
    /// Whole-append attempts before a version conflict is surfaced.
    #[serde(default = "d_max_append_attempts")]
    pub max_append_attempts: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            compaction: CompactionConfig::default(),
            packet_lookahead: PACKET_LOOKAHEAD,
            max_append_attempts: d_max_append_attempts(),
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compaction.validate()?;
        if self.max_append_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_append_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn d_window_limit() -> usize {
    WINDOW_LIMIT
}
fn d_retained_tail() -> usize {
    RETAINED_TAIL
}
fn d_summary_timeout_ms() -> u64 {
    8_000
}
fn d_min_summary_chars() -> usize {
    40
}
fn d_summary_word_limit() -> usize {
    prompt::DEFAULT_SUMMARY_WORD_LIMIT
}
fn d_packet_lookahead() -> usize {
    PACKET_LOOKAHEAD
}
fn d_max_append_attempts() -> usize {
    3
}
