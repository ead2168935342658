use serde::{Deserialize, Serialize};

/// Default token budget per embedded text
pub const DEFAULT_MAX_TOKENS: usize = 400;

/// Configuration for text chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Chunk size in tokens (soft limit, may be exceeded by the last word of a chunk)
    pub max_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ChunkerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tokens == 0 {
            return Err("max_tokens must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(ChunkerConfig::default().validate().is_ok());
        assert_eq!(ChunkerConfig::default().max_tokens, 400);
    }

    #[test]
    fn test_zero_budget_rejected() {
        assert!(ChunkerConfig { max_tokens: 0 }.validate().is_err());
    }
}
