use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// Projection output does not line up with the vectors it was computed from
    #[error(
        "Length mismatch: {vectors} vectors, {positions} positions, {labels} labels"
    )]
    LengthMismatch {
        vectors: usize,
        positions: usize,
        labels: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Projection error: {0}")]
    ProjectionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
