//! Unit tests for `prompt` formatting.
//!
//! Verifies transcript rendering, the summarization request, and context section layout.
//! External interactions: none (pure function tests).

use prompt::{
    format_for_model, format_for_model_as_messages, render_transcript, summarization_request,
    summary_instruction, ChatMessage, MessageRole, SECTION_HISTORY, SECTION_RECENT,
};

/// **Test: Transcript lines use lowercase `role: content`, oldest first.**
#[test]
fn render_transcript_uses_role_prefix() {
    let messages = vec![
        ChatMessage::user("I want to run a 10k"),
        ChatMessage::assistant("Great, how often do you run now?"),
    ];
    assert_eq!(
        render_transcript(&messages),
        "user: I want to run a 10k\nassistant: Great, how often do you run now?"
    );
}

#[test]
fn render_transcript_empty() {
    assert_eq!(render_transcript(&[] as &[ChatMessage]), "");
}

/// **Test: Summarization request is system instruction followed by one user transcript message.**
#[test]
fn summarization_request_shape() {
    let messages = vec![ChatMessage::user("knee hurts after squats")];
    let request = summarization_request(&messages, 150);
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, MessageRole::System);
    assert!(request[0].content.contains("at most 150 words"));
    assert_eq!(request[1].role, MessageRole::User);
    assert_eq!(request[1].content, "user: knee hurts after squats");
}

#[test]
fn summary_instruction_mentions_required_topics() {
    let text = summary_instruction(200);
    assert!(text.contains("third person"));
    assert!(text.contains("goals"));
    assert!(text.contains("health notes"));
}

/// **Test: Context string has summary section before recent section.**
#[test]
fn format_orders_summary_before_recent() {
    let recent = vec![ChatMessage::user("Hi again")];
    let out = format_for_model(Some("You are a coach."), "User is vegetarian.", &recent);
    let system = out.find("System: You are a coach.").unwrap();
    let history = out.find(SECTION_HISTORY).unwrap();
    let window = out.find(SECTION_RECENT).unwrap();
    assert!(system < history && history < window);
    assert!(out.contains("user: Hi again"));
}

/// **Test: Empty summary and empty window produce an empty string.**
#[test]
fn format_empty_context_is_empty() {
    let out = format_for_model(None, "   ", &[] as &[ChatMessage]);
    assert!(out.is_empty());
}

/// **Test: Message list keeps real roles for the window and ends with the question.**
#[test]
fn as_messages_keeps_roles_and_question_last() {
    let recent = vec![
        ChatMessage::user("Log my lunch"),
        ChatMessage::assistant("Logged: salad, 450 kcal"),
    ];
    let out = format_for_model_as_messages(Some("sys"), "Earlier summary.", recent, "What next?");
    assert_eq!(out.len(), 5);
    assert_eq!(out[0], ChatMessage::system("sys"));
    assert_eq!(out[1].role, MessageRole::System);
    assert!(out[1].content.starts_with(SECTION_HISTORY));
    assert_eq!(out[2].role, MessageRole::User);
    assert_eq!(out[3].role, MessageRole::Assistant);
    assert_eq!(out[4], ChatMessage::user("What next?"));
}

#[test]
fn as_messages_without_summary_or_system() {
    let out = format_for_model_as_messages(None, "", Vec::new(), "Hello");
    assert_eq!(out, vec![ChatMessage::user("Hello")]);
}
