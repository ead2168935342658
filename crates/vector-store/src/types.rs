use serde::{Deserialize, Serialize};
use treegpt_conversation::Message;

/// An assistant reply, the user message it answers, and their joint embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextedVector {
    pub context: Option<Message>,
    pub reply: Message,
    pub vector: Vec<f32>,
}

impl ContextedVector {
    #[must_use]
    pub fn reply_id(&self) -> &str {
        self.reply.id()
    }

    #[must_use]
    pub fn context_id(&self) -> Option<&str> {
        self.context.as_ref().map(Message::id)
    }
}

/// Vector for one reply plus how many chunks it was averaged from
#[derive(Debug, Clone, PartialEq)]
pub struct PairEmbedding {
    pub vector: Vec<f32>,
    /// 1 when the text fit the token budget
    pub chunks: usize,
}
