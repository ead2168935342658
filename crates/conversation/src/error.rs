use thiserror::Error;

/// Result type for conversation operations
pub type Result<T> = std::result::Result<T, ConversationError>;

/// Errors raised while reading or reconstructing conversations
#[derive(Error, Debug)]
pub enum ConversationError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Archive is not valid JSON or has the wrong top-level shape
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A message record violates a construction invariant
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

impl ConversationError {
    /// Create an invalid message error
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }
}
