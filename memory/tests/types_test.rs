use coach_memory::{ChatMessage, ConversationMemory, MemoryPacket, MessageMetadata, MessageRole};

#[test]
fn test_chat_message_creation() {
    let metadata = MessageMetadata::new()
        .with("source", "app")
        .with("meal_logged", true);
    let message = ChatMessage::user("I had oatmeal for breakfast").with_metadata(metadata);

    assert_eq!(message.role(), MessageRole::User);
    assert_eq!(message.content(), "I had oatmeal for breakfast");
    let metadata = message.metadata().unwrap();
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata.get("meal_logged"), Some(&serde_json::json!(true)));
}

#[test]
fn test_message_role_serialization() {
    let serialized = serde_json::to_string(&MessageRole::Assistant).unwrap();
    assert_eq!(serialized, "\"assistant\"");

    let deserialized: MessageRole = serde_json::from_str("\"user\"").unwrap();
    assert_eq!(deserialized, MessageRole::User);
}

#[test]
fn test_message_without_metadata_omits_field() {
    let message = ChatMessage::assistant("Great job!");
    let json = serde_json::to_value(&message).unwrap();

    assert_eq!(json["role"], "assistant");
    assert!(json.get("metadata").is_none());

    let back: ChatMessage = serde_json::from_value(json).unwrap();
    assert_eq!(back, message);
}

#[test]
fn test_conversation_memory_serialization() {
    let mut memory = ConversationMemory::new("user123", "coach-nutrition");
    memory.push(ChatMessage::user("Hi"));
    memory.rolling_summary = "User is vegetarian.".to_string();

    let json = serde_json::to_string(&memory).unwrap();
    let back: ConversationMemory = serde_json::from_str(&json).unwrap();

    assert_eq!(back, memory);
}

#[test]
fn test_conversation_ids_are_unique() {
    let a = ConversationMemory::new("u", "c");
    let b = ConversationMemory::new("u", "c");
    assert_ne!(a.conversation_id, b.conversation_id);
    assert_eq!(a.version, 0);
}

#[test]
fn test_packet_message_count() {
    let packet = MemoryPacket::new("conv", 10, 18, "User switched to a 4-day split.");
    assert_eq!(packet.message_count, 9);
    assert!(packet.overlaps(&MemoryPacket::new("conv", 18, 20, "x")));
    assert!(!packet.overlaps(&MemoryPacket::new("conv", 19, 27, "x")));
}
