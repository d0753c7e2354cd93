//! Bounded conversation memory

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::llm::ChatMessage;

/// Ordered message history; the oldest message is evicted once full.
pub struct ConversationMemory {
    messages: RwLock<VecDeque<ChatMessage>>,
    max_messages: usize,
}

impl ConversationMemory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: RwLock::new(VecDeque::with_capacity(max_messages.min(256))),
            max_messages: max_messages.max(1),
        }
    }

    pub fn push(&self, message: ChatMessage) {
        let mut messages = self.messages.write();
        while messages.len() >= self.max_messages {
            messages.pop_front();
        }
        messages.push_back(message);
    }

    /// Snapshot, oldest first
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_messages
    }

    pub fn clear(&self) {
        self.messages.write().clear();
    }
}
