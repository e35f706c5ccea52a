//! Error types for the vector store.

use thiserror::Error;

/// Result type alias for vector store operations.
pub type Result<T> = std::result::Result<T, VectorStoreError>;

/// Errors that can occur in the vector store.
#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// Bad caller arguments.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `initialize()` has not been called.
    #[error("vector store not initialized")]
    NotInitialized,

    /// Vector length differs from the store's dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The persistence hook failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<sift_embeddings::EmbeddingError> for VectorStoreError {
    fn from(err: sift_embeddings::EmbeddingError) -> Self {
        match err {
            sift_embeddings::EmbeddingError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            other => Self::InvalidInput(other.to_string()),
        }
    }
}
