use serde::{Deserialize, Serialize};

/// Counters from linearizing the archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Conversations in the archive
    pub conversations_seen: usize,
    /// Conversations left out by `conversation_limit`
    pub conversations_skipped: usize,
    /// Walks that stopped on a missing node, a missing leaf or a cycle
    pub conversations_truncated: usize,
    pub nodes_visited: usize,
    pub messages_ingested: usize,
}

/// Counters from the embedding phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedStats {
    pub replies_seen: usize,
    pub replies_embedded: usize,
    /// Pairs with no text to embed
    pub replies_skipped: usize,
    pub replies_failed: usize,
    /// Replies whose text went over the token budget
    pub replies_chunked: usize,
    pub chunks_embedded: usize,
    /// Replies with no user message above them
    pub replies_without_context: usize,
}

/// Counters from projection and assembly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub clusters: usize,
    pub noise: usize,
}

/// Everything one CLI invocation did, printed as JSON at the end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphStats>,
    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl RunStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies that could not be turned into a vector
    #[must_use]
    pub fn failures(&self) -> usize {
        self.embed.as_ref().map_or(0, |embed| embed.replies_failed)
    }
}
