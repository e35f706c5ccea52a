//! Error types for the filesystem adapters.

use thiserror::Error;

/// Result type alias for filesystem operations.
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors that can occur in the filesystem adapters.
#[derive(Error, Debug)]
pub enum FsError {
    /// Base directory for resolution does not exist.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// File does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Invalid glob pattern.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// File exceeds the configured size limit.
    #[error("file too large: {path} is {size} bytes (limit {limit})")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    /// Requested encoding is not supported.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// File content is not valid UTF-8.
    #[error("{0} is not valid utf-8")]
    InvalidUtf8(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Blocking walk task failed.
    #[error("directory walk failed: {0}")]
    Walk(String),
}
