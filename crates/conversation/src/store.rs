use crate::types::Message;
use std::collections::HashMap;

/// Append-only registry of messages with id and conversation indices.
///
/// Lookups by id return the first message inserted under that id.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    by_id: HashMap<String, usize>,
    by_conversation: HashMap<String, Vec<usize>>,
}

impl MessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: Message) {
        let idx = self.messages.len();
        if self.by_id.contains_key(message.id()) {
            log::warn!(
                "Duplicate message id {} (conversation {}); lookups keep the first",
                message.id(),
                message.conversation_id()
            );
        } else {
            self.by_id.insert(message.id().to_string(), idx);
        }
        self.by_conversation
            .entry(message.conversation_id().to_string())
            .or_default()
            .push(idx);
        self.messages.push(message);
    }

    pub fn add_all(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.add(message);
        }
    }

    /// `None` for empty or unknown ids
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&Message> {
        if id.is_empty() {
            return None;
        }
        self.by_id.get(id).and_then(|&idx| self.messages.get(idx))
    }

    /// Messages of one conversation in insertion order
    #[must_use]
    pub fn get_by_conversation(&self, conversation_id: &str) -> Vec<&Message> {
        self.by_conversation
            .get(conversation_id)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&idx| self.messages.get(idx))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.by_conversation.len()
    }
}

impl FromIterator<Message> for MessageStore {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        let mut store = Self::new();
        store.add_all(iter);
        store
    }
}
