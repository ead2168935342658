use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::tokenizer::TokenCounter;

/// Splits text into token-bounded chunks
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    config: ChunkerConfig,
}

impl TextChunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self { config })
    }

    /// Chunk text with the configured token budget
    pub fn chunk(&self, text: &str, counter: &dyn TokenCounter) -> Result<Vec<String>> {
        chunk_text(text, self.config.max_tokens, counter)
    }

    /// Whether `text` is over budget and needs chunking at all
    pub fn exceeds_limit(&self, text: &str, counter: &dyn TokenCounter) -> Result<bool> {
        Ok(counter.count_tokens(text)? > self.config.max_tokens)
    }

    #[must_use]
    pub const fn max_tokens(&self) -> usize {
        self.config.max_tokens
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }
}

/// Split `text` on whitespace and group words until the joined group reaches `max_tokens`.
///
/// The boundary falls on the first word at which the count reaches the limit, so a chunk
/// can overshoot by that word's tokens. Whitespace runs collapse to single spaces.
/// Empty or all-whitespace input yields no chunks.
pub fn chunk_text(text: &str, max_tokens: usize, counter: &dyn TokenCounter) -> Result<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        current.push(word);
        let joined = current.join(" ");
        if counter.count_tokens(&joined)? >= max_tokens {
            chunks.push(joined);
            current.clear();
        }
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    log::trace!("Split {} bytes into {} chunks", text.len(), chunks.len());
    Ok(chunks)
}
