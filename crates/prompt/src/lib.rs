//! # Prompt
//!
//! Prompt text for the coaching memory subsystem: the request message type sent to
//! LLM APIs, the fixed summarization instruction used by compaction, transcript
//! rendering, and formatting of an assembled conversation context for the model.
//!
//! ## Format
//!
//! - **System** (optional): `System: {message}`
//! - **Earlier in this conversation (summary)**: historical summary text from compaction packets
//! - **Conversation (recent)**: Section title + live window lines in `role: content` form
//!
//! ## External interactions
//!
//! - **AI models**: Output is sent to LLM APIs (OpenAI or any compatible endpoint).

/// Role of a message, one-to-one with OpenAI Chat Completions API `role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    /// System instruction (API `role: "system"`).
    System,
    /// User message (API `role: "user"`).
    User,
    /// Assistant message (API `role: "assistant"`).
    Assistant,
}

impl MessageRole {
    /// Lowercase label used in transcript lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single chat message, one-to-one with one element of OpenAI `messages` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Renders the message as a `role: content` transcript line.
    pub fn to_line(&self) -> String {
        format!("{}: {}", self.role.as_str(), self.content)
    }
}

/// Section title for the compacted history block.
pub const SECTION_HISTORY: &str = "Earlier in this conversation (summary):";

/// Section title for the live window.
pub const SECTION_RECENT: &str = "Conversation (recent):";

/// Word limit the summarization instruction asks for by default.
pub const DEFAULT_SUMMARY_WORD_LIMIT: usize = 200;

/// Builds the fixed system instruction for compacting a slice of coaching conversation.
///
/// The summary is third-person and factual, and must cover topics, decisions, goals and
/// progress, and situational facts (constraints, health notes) useful in later sessions.
pub fn summary_instruction(word_limit: usize) -> String {
    format!(
        "You compress part of a conversation between a user and their fitness and nutrition coach \
         into durable memory. Write one paragraph of at most {word_limit} words, in the third person, \
         strictly factual, with no preamble. Cover: the main topics discussed; any decisions or \
         agreements made; the user's stated goals and reported progress; and notable situational \
         facts relevant to future sessions (schedule or equipment constraints, injuries, health \
         notes, dietary restrictions). Do not invent details that are not in the transcript."
    )
}

/// Renders messages as newline-separated `role: content` lines, oldest first.
pub fn render_transcript<'a, I>(messages: I) -> String
where
    I: IntoIterator<Item = &'a ChatMessage>,
{
    messages
        .into_iter()
        .map(ChatMessage::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the request messages for one summarization call: system instruction + transcript.
pub fn summarization_request<'a, I>(messages: I, word_limit: usize) -> Vec<ChatMessage>
where
    I: IntoIterator<Item = &'a ChatMessage>,
{
    vec![
        ChatMessage::system(summary_instruction(word_limit)),
        ChatMessage::user(render_transcript(messages)),
    ]
}

/// Builds an assembled context as a single string for AI models (no current question).
///
/// Order: optional System (if present), summary section (if non-empty), recent section (if non-empty).
pub fn format_for_model<'a, I>(
    system_message: Option<&str>,
    historical_summary: &str,
    recent_messages: I,
) -> String
where
    I: IntoIterator<Item = &'a ChatMessage>,
{
    let mut out = String::new();
    if let Some(msg) = system_message {
        out.push_str("System: ");
        out.push_str(msg);
        out.push_str("\n\n");
    }
    let summary = historical_summary.trim();
    if !summary.is_empty() {
        out.push_str(SECTION_HISTORY);
        out.push('\n');
        out.push_str(summary);
        out.push_str("\n\n");
    }
    let recent = render_transcript(recent_messages);
    if !recent.is_empty() {
        out.push_str(SECTION_RECENT);
        out.push('\n');
        out.push_str(&recent);
        out.push('\n');
    }
    out
}

/// Builds the request message list for a reply: optional system, optional summary block
/// (as a system message), each live-window message with its own role, then the question.
pub fn format_for_model_as_messages<I>(
    system_message: Option<&str>,
    historical_summary: &str,
    recent_messages: I,
    current_question: &str,
) -> Vec<ChatMessage>
where
    I: IntoIterator<Item = ChatMessage>,
{
    let mut messages = Vec::new();
    if let Some(msg) = system_message {
        messages.push(ChatMessage::system(msg));
    }
    let summary = historical_summary.trim();
    if !summary.is_empty() {
        messages.push(ChatMessage::system(format!("{SECTION_HISTORY}\n{summary}")));
    }
    messages.extend(recent_messages);
    messages.push(ChatMessage::user(current_question));
    messages
}
