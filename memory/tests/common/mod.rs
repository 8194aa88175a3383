//! Shared fixtures for memory integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use coach_memory::{
    ChatMessage, ConversationMemory, ConversationMemoryManager, InMemoryMessageStore,
    InMemoryPacketArchive, MemoryConfig, MemoryPacket, PacketArchive, Summarizer,
};

/// Deterministic summarizer: lists the summarized contents. Can be switched to fail or hang.
#[derive(Default)]
pub struct FakeSummarizer {
    fail: AtomicBool,
    hang: AtomicBool,
    calls: AtomicUsize,
}

impl FakeSummarizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_hanging(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("summarizer unavailable");
        }
        Ok(listing_summary(messages))
    }
}

fn listing_summary(messages: &[ChatMessage]) -> String {
    let contents: Vec<&str> = messages.iter().map(ChatMessage::content).collect();
    format!(
        "Conversation summary covering {} messages: {}",
        messages.len(),
        contents.join(", ")
    )
}

/// Summarizer that, once armed, parks its next call until `release` is notified.
#[derive(Default)]
pub struct GatedSummarizer {
    armed: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedSummarizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Summarizer for GatedSummarizer {
    async fn summarize(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(listing_summary(messages))
    }
}

pub struct Harness {
    pub manager: ConversationMemoryManager,
    pub store: Arc<InMemoryMessageStore>,
    pub archive: Arc<InMemoryPacketArchive>,
    pub summarizer: Arc<FakeSummarizer>,
}

pub fn test_config() -> MemoryConfig {
    let mut config = MemoryConfig::default();
    config.compaction.summary_timeout_ms = 50;
    config
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: MemoryConfig) -> Harness {
    let store = Arc::new(InMemoryMessageStore::new());
    let archive = Arc::new(InMemoryPacketArchive::new());
    let summarizer = FakeSummarizer::new();
    let manager = ConversationMemoryManager::new(
        store.clone(),
        archive.clone(),
        summarizer.clone(),
        config,
    )
    .unwrap();
    Harness {
        manager,
        store,
        archive,
        summarizer,
    }
}

pub fn message(i: usize) -> ChatMessage {
    if i % 2 == 1 {
        ChatMessage::user(format!("m{i}"))
    } else {
        ChatMessage::assistant(format!("m{i}"))
    }
}

/// All packets of a conversation, oldest first.
pub async fn all_packets(archive: &dyn PacketArchive, conversation_id: &str) -> Vec<MemoryPacket> {
    let mut packets = archive.list_recent(conversation_id, usize::MAX).await.unwrap();
    packets.reverse();
    packets
}

/// Packets of the memory's current epoch, oldest first.
pub async fn current_packets(archive: &dyn PacketArchive, memory: &ConversationMemory) -> Vec<MemoryPacket> {
    let mut packets = all_packets(archive, &memory.conversation_id).await;
    packets.retain(|p| p.epoch == memory.epoch);
    packets
}

pub fn assert_no_loss(memory: &ConversationMemory, packets: &[MemoryPacket], appended: u64) {
    assert_eq!(memory.total_message_count, appended);
    let packed: u64 = packets.iter().map(|p| p.message_count).sum();
    assert_eq!(packed + memory.window.len() as u64, appended);
}

pub fn assert_contiguous(packets: &[MemoryPacket]) {
    if let Some(first) = packets.first() {
        assert_eq!(first.from_message_index, 1);
    }
    for pair in packets.windows(2) {
        assert_eq!(pair[0].to_message_index + 1, pair[1].from_message_index);
    }
}
