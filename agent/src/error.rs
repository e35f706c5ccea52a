//! Error types for the agent layer.

use thiserror::Error;

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur in the agent.
///
/// These never cross the tool boundary: [`crate::ToolRegistry::execute`]
/// folds them into a failed [`crate::ToolOutput`].
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed TOML configuration.
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding service error.
    #[error(transparent)]
    Embedding(#[from] sift_embeddings::EmbeddingError),

    /// Vector store error.
    #[error(transparent)]
    Store(#[from] sift_vector_store::VectorStoreError),

    /// Indexing pipeline error.
    #[error(transparent)]
    Index(#[from] sift_indexer::IndexError),

    /// Filesystem adapter error.
    #[error(transparent)]
    Fs(#[from] sift_fs::FsError),

    /// Collaborator failure surfaced as `anyhow`.
    #[error("{0:#}")]
    Collaborator(#[from] anyhow::Error),

    /// Tool arguments did not match the expected shape.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// No tool registered under this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}
