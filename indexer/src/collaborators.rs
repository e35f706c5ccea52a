//! Interfaces of the collaborators the pipeline depends on.
//!
//! Nothing in this crate implements them; callers wire in their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::report::IndexingReport;

/// Options for [`PathResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Directory the pattern is resolved against.
    pub base_dir: String,

    /// Glob patterns whose matches are dropped.
    pub ignore_patterns: Vec<String>,

    /// Upper bound on the number of returned paths.
    pub max_results: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            base_dir: ".".to_string(),
            ignore_patterns: Vec::new(),
            max_results: 1000,
        }
    }
}

/// Options for [`FileReader::read`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    pub encoding: String,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
        }
    }
}

/// Turns a glob-like pattern into an ordered list of paths.
///
/// Implementations must be deterministic for a fixed filesystem snapshot.
#[async_trait]
pub trait PathResolver: Send + Sync {
    async fn resolve(&self, pattern: &str, options: &ResolveOptions) -> anyhow::Result<Vec<String>>;
}

/// Reads a file into a string.
#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read(&self, path: &str, options: &ReadOptions) -> anyhow::Result<String>;
}

/// Receives finished indexing reports (the agent's memory).
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn save_report(&self, report: &IndexingReport) -> anyhow::Result<()>;
}
