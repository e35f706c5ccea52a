//! # Filesystem adapters
//!
//! Filesystem-backed implementations of the indexing collaborators:
//!
//! - [`GlobResolver`]: `walkdir` traversal matched with `glob` patterns
//! - [`FsFileReader`]: size-limited UTF-8 reads through `tokio::fs`
//! - [`JsonFilePersistence`]: opt-in JSON Lines [`sift_vector_store::PersistenceHook`]
//! - [`JsonReportSink`]: writes the last indexing report to disk

pub mod error;
pub mod persistence;
pub mod reader;
pub mod resolver;

pub use error::{FsError, Result};
pub use persistence::{JsonFilePersistence, JsonReportSink};
pub use reader::{DEFAULT_MAX_FILE_SIZE, FsFileReader};
pub use resolver::GlobResolver;
