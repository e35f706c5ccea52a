//! JSON-file backed persistence hook and report sink.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sift_indexer::{IndexingReport, ReportSink};
use sift_vector_store::{PersistenceHook, VectorRecord};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Appends every saved record to a JSON Lines file.
///
/// Deletes are not recorded; a deleted id comes back on the next load if it
/// was ever saved.
pub struct JsonFilePersistence {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFilePersistence {
    /// Persist to `path`, created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &VectorRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!("Persisted vector {}", record.id);
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<VectorRecord>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).await?;

        let mut records: Vec<VectorRecord> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: VectorRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        "Skipping malformed line {} in {}: {e}",
                        number + 1,
                        self.path.display()
                    );
                    continue;
                }
            };
            match positions.get(&record.id) {
                Some(&index) => records[index] = record,
                None => {
                    positions.insert(record.id.clone(), records.len());
                    records.push(record);
                }
            }
        }

        info!(
            "Loaded {} persisted vectors from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

#[async_trait]
impl PersistenceHook for JsonFilePersistence {
    async fn save(&self, record: &VectorRecord) -> anyhow::Result<()> {
        Ok(self.append(record).await?)
    }

    async fn load(&self) -> anyhow::Result<Vec<VectorRecord>> {
        Ok(self.read_all().await?)
    }
}

/// Writes the most recent indexing report to a JSON file.
pub struct JsonReportSink {
    path: PathBuf,
}

impl JsonReportSink {
    /// Write reports to `path`, replacing the previous one.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The report file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the last saved report, if any.
    pub async fn last_report(&self) -> Result<Option<IndexingReport>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn write(&self, report: &IndexingReport) -> Result<()> {
        let content = serde_json::to_string_pretty(report)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, content).await?;
        debug!("Saved indexing report to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ReportSink for JsonReportSink {
    async fn save_report(&self, report: &IndexingReport) -> anyhow::Result<()> {
        Ok(self.write(report).await?)
    }
}
