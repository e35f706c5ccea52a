//! Error types for the indexing pipeline.

use thiserror::Error;

/// Result type alias for indexing operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while indexing.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The pipeline was built without a required component.
    #[error("missing dependency: {0}")]
    MissingDependency(&'static str),

    /// The path resolver failed; the whole run is aborted.
    #[error("failed to resolve pattern '{pattern}': {message}")]
    PatternResolution { pattern: String, message: String },

    /// A file could not be read.
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    /// Embedding generation failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] sift_embeddings::EmbeddingError),

    /// The vector store rejected the record.
    #[error("store error: {0}")]
    Store(#[from] sift_vector_store::VectorStoreError),

    /// The caller cancelled the run between batches.
    #[error("indexing cancelled after {processed} processed and {failed} failed of {total} files")]
    Cancelled {
        processed: usize,
        failed: usize,
        total: usize,
    },
}
