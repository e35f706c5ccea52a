//! Indexing reports and progress observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub path: String,

    /// Id of the stored vector.
    pub id: String,

    pub success: bool,

    /// Error message when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Length of the stored embedding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Whether the content came from the cache.
    pub from_cache: bool,
}

/// Result of an indexing run.
///
/// `processed_files + failed_files == total_files` once a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingReport {
    pub pattern: String,
    pub total_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,

    /// One entry per file, in file-list order.
    pub details: Vec<FileOutcome>,

    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl IndexingReport {
    pub(crate) fn new(pattern: impl Into<String>, total_files: usize) -> Self {
        Self {
            pattern: pattern.into(),
            total_files,
            processed_files: 0,
            failed_files: 0,
            details: Vec::with_capacity(total_files),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    pub(crate) fn record(&mut self, outcome: FileOutcome) {
        if outcome.success {
            self.processed_files += 1;
        } else {
            self.failed_files += 1;
        }
        self.details.push(outcome);
    }

    /// Whether every resolved file has an outcome.
    pub fn is_complete(&self) -> bool {
        self.processed_files + self.failed_files == self.total_files
    }

    /// Outcomes of files that failed.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.details.iter().filter(|d| !d.success)
    }
}

/// Emitted after each batch settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    /// 1-based batch number.
    pub batch: usize,
    pub total_batches: usize,

    /// Files settled so far, successes and failures together.
    pub processed_so_far: usize,
    pub total: usize,
    pub failures_so_far: usize,
}
