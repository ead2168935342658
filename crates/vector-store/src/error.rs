use thiserror::Error;
use treegpt_text_chunker::ChunkerError;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Chunking error: {0}")]
    ChunkingError(#[from] ChunkerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Unsupported store schema_version {found} (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("{0}")]
    Other(String),
}

impl VectorStoreError {
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingError(msg.into())
    }
}
