//! Error types for the embeddings system.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors surfaced by [`crate::EmbeddingService`].
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Bad caller arguments. Never worth retrying.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `initialize()` has not completed successfully yet.
    #[error("embedding service not initialized")]
    NotInitialized,

    /// The backend is missing a credential or other required setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The liveness probe failed or returned something that is not a vector.
    #[error("embedding backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A request to the backend failed.
    #[error("embedding request failed: {0}")]
    Request(#[from] BackendError),

    /// A batch request exceeded the configured timeout.
    #[error("embedding request timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// Two vectors that must agree in length do not.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised by an [`crate::EmbeddingBackend`].
#[derive(Error, Debug)]
pub enum BackendError {
    /// No credential configured.
    #[error("embedding backend has no credential configured")]
    NotConfigured,

    /// Transport-level failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; `body` carries the upstream diagnostic text.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request did not finish in time.
    #[error("request timed out after {}ms", after.as_millis())]
    TimedOut { after: Duration },
}
