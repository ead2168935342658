use crate::error::{ChunkerError, Result};
use std::path::Path;
use tokenizers::Tokenizer;

/// Deterministic token counting for a fixed text
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self(text))
    }
}

/// One token per whitespace-separated word. Used in stub mode and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenCounter;

impl TokenCounter for WhitespaceTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Token counts from a HuggingFace `tokenizer.json`, without special tokens
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            ChunkerError::tokenizer(format!("Tokenizer load failed ({}): {e}", path.display()))
        })?;
        log::debug!("Loaded token counter from {}", path.display());
        Self::from_tokenizer(tokenizer)
    }

    /// Wrap an already loaded tokenizer, turning off padding and truncation
    pub fn from_tokenizer(mut tokenizer: Tokenizer) -> Result<Self> {
        // Counting must see the whole text, whatever the file configures for inference.
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| ChunkerError::tokenizer(format!("Tokenizer truncation failed: {e}")))?;
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| ChunkerError::tokenizer(format!("Tokenization failed: {e}")))?;
        Ok(encoding.len())
    }
}
