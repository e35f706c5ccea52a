//! In-memory vector store with exact cosine top-k retrieval.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use sift_embeddings::{Embedding, cosine_similarity};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::error::{Result, VectorStoreError};
use crate::persistence::PersistenceHook;
use crate::types::{
    DeleteReceipt, Metadata, SimilarityMatch, StoreReceipt, StoredVector, VectorRecord,
};

/// Defaults applied by the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Minimum similarity kept by [`VectorStore::find_similar`] when the
    /// caller passes no threshold.
    pub default_threshold: f64,

    /// Result cap used when the caller passes no limit.
    pub default_limit: usize,

    /// Upper bound on a single persistence hook call, in milliseconds.
    pub persist_timeout_ms: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.7,
            default_limit: 10,
            persist_timeout_ms: 5_000,
        }
    }
}

impl VectorStoreConfig {
    /// Set the default similarity threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.default_threshold = threshold;
        self
    }

    /// Set the default result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }
}

/// Dimension and records, always read and written together.
#[derive(Default)]
struct Inner {
    /// Fixed by the first stored vector.
    dimension: Option<usize>,

    /// Records in first-insertion order.
    records: IndexMap<String, VectorRecord>,
}

impl Inner {
    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(VectorStoreError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

/// An associative store of id → (vector, metadata).
///
/// All vectors share one dimension, fixed lazily by the first successful
/// store. Queries are an exhaustive scan; ties in similarity keep insertion
/// order.
///
/// With a persistence hook attached, records are saved one at a time by a
/// single worker, in the order their writes were applied.
pub struct VectorStore {
    inner: RwLock<Inner>,
    initialized: AtomicBool,
    persistence: Option<Arc<dyn PersistenceHook>>,
    persist_tx: OnceLock<mpsc::UnboundedSender<VectorRecord>>,
    config: VectorStoreConfig,
}

impl VectorStore {
    /// Create a purely in-memory store.
    pub fn new() -> Self {
        Self::with_config(VectorStoreConfig::default())
    }

    /// Create a purely in-memory store with custom defaults.
    pub fn with_config(config: VectorStoreConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            initialized: AtomicBool::new(false),
            persistence: None,
            persist_tx: OnceLock::new(),
            config,
        }
    }

    /// Attach a persistence hook.
    pub fn with_persistence(mut self, hook: Arc<dyn PersistenceHook>) -> Self {
        self.persistence = Some(hook);
        self
    }

    /// The active defaults.
    pub fn config(&self) -> &VectorStoreConfig {
        &self.config
    }

    /// Whether `initialize()` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Load persisted records, if any, and mark the store ready.
    pub async fn initialize(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        if self.is_initialized() {
            debug!("Vector store already initialized");
            return Ok(());
        }

        if let Some(hook) = &self.persistence {
            match tokio::time::timeout(self.config.persist_timeout(), hook.load()).await {
                Ok(Ok(records)) => {
                    let loaded = load_records(&mut inner, records);
                    info!("Loaded {loaded} persisted vectors");
                }
                Ok(Err(e)) => warn!("Failed to load persisted vectors: {e:#}"),
                Err(_) => warn!("Timed out loading persisted vectors"),
            }
            let tx = spawn_persistence_worker(Arc::clone(hook), self.config.persist_timeout());
            let _ = self.persist_tx.set(tx);
        }

        self.initialized.store(true, Ordering::Release);
        info!(
            "Vector store initialized with {} vectors",
            inner.records.len()
        );
        Ok(())
    }

    /// Store `vector` under `id`, replacing any previous record.
    pub async fn store_vector(
        &self,
        id: impl Into<String>,
        vector: Embedding,
        metadata: Metadata,
    ) -> Result<StoreReceipt> {
        let id = id.into();
        self.ensure_initialized()?;
        validate_id(&id)?;
        validate_vector(&vector)?;

        let record = VectorRecord {
            id: id.clone(),
            vector,
            metadata,
            stored_at: Utc::now(),
        };

        {
            let mut inner = self.inner.write().await;
            inner.check_dimension(record.vector.len())?;
            if inner.dimension.is_none() {
                info!("Vector store dimension fixed at {}", record.vector.len());
                inner.dimension = Some(record.vector.len());
            }
            let replaced = inner.records.insert(id.clone(), record.clone()).is_some();
            debug!("Stored vector {id} (replaced: {replaced})");
            // Queued under the write lock so saves follow write order.
            self.offer_to_persistence(record);
        }

        Ok(StoreReceipt { id, success: true })
    }

    /// Return up to `limit` records whose cosine similarity to `query` is at
    /// least `threshold`, most similar first.
    pub async fn find_similar(
        &self,
        query: &[f32],
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> Result<Vec<SimilarityMatch>> {
        self.ensure_initialized()?;
        validate_vector(query)?;

        let limit = limit.unwrap_or(self.config.default_limit);
        let threshold = threshold.unwrap_or(self.config.default_threshold);

        let inner = self.inner.read().await;
        inner.check_dimension(query.len())?;

        let mut matches = Vec::new();
        for record in inner.records.values() {
            let similarity = cosine_similarity(query, &record.vector)?;
            if similarity >= threshold {
                matches.push(SimilarityMatch {
                    id: record.id.clone(),
                    similarity,
                    metadata: record.metadata.clone(),
                });
            }
        }
        drop(inner);

        // Stable: equal similarities stay in insertion order.
        matches.sort_by_key(|m| Reverse(OrderedFloat(m.similarity)));
        matches.truncate(limit);

        debug!(
            "Similarity query returned {} matches (limit: {limit}, threshold: {threshold})",
            matches.len()
        );
        Ok(matches)
    }

    /// Remove the record for `id` if present.
    pub async fn delete_vector(&self, id: &str) -> Result<DeleteReceipt> {
        self.ensure_initialized()?;

        let deleted = self.inner.write().await.records.shift_remove(id).is_some();
        debug!("Deleted vector {id}: {deleted}");

        Ok(DeleteReceipt {
            id: id.to_string(),
            success: true,
            deleted,
        })
    }

    /// Every record, in insertion order.
    pub async fn get_all_vectors(&self) -> Result<Vec<StoredVector>> {
        self.ensure_initialized()?;
        let inner = self.inner.read().await;
        Ok(inner.records.values().map(StoredVector::from).collect())
    }

    /// A single record by id.
    pub async fn get_vector(&self, id: &str) -> Result<Option<VectorRecord>> {
        self.ensure_initialized()?;
        Ok(self.inner.read().await.records.get(id).cloned())
    }

    /// Number of stored records.
    pub async fn len(&self) -> Result<usize> {
        self.ensure_initialized()?;
        Ok(self.inner.read().await.records.len())
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// The fixed dimension, once a vector has been stored.
    pub async fn dimension(&self) -> Result<Option<usize>> {
        self.ensure_initialized()?;
        Ok(self.inner.read().await.dimension)
    }

    /// Drop every record. The dimension stays fixed.
    pub async fn clear(&self) -> Result<()> {
        self.ensure_initialized()?;
        self.inner.write().await.records.clear();
        info!("Cleared vector store");
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(VectorStoreError::NotInitialized)
        }
    }

    fn offer_to_persistence(&self, record: VectorRecord) {
        let Some(tx) = self.persist_tx.get() else {
            return;
        };
        if let Err(e) = tx.send(record) {
            warn!(
                "{}",
                VectorStoreError::Persistence(format!(
                    "persistence worker stopped, dropping {}",
                    e.0.id
                ))
            );
        }
    }
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(VectorStoreError::InvalidInput(
            "id must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

fn validate_vector(vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(VectorStoreError::InvalidInput(
            "vector must be non-empty".to_string(),
        ));
    }
    if let Some(position) = vector.iter().position(|x| !x.is_finite()) {
        return Err(VectorStoreError::InvalidInput(format!(
            "vector component {position} is not a finite number"
        )));
    }
    Ok(())
}

/// Save queued records one at a time until the store is dropped.
fn spawn_persistence_worker(
    hook: Arc<dyn PersistenceHook>,
    timeout: Duration,
) -> mpsc::UnboundedSender<VectorRecord> {
    let (tx, mut rx) = mpsc::unbounded_channel::<VectorRecord>();
    tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match tokio::time::timeout(timeout, hook.save(&record)).await {
                Ok(Ok(())) => debug!("Persisted vector {}", record.id),
                Ok(Err(e)) => warn!(
                    "{}",
                    VectorStoreError::Persistence(format!("failed to persist {}: {e:#}", record.id))
                ),
                Err(_) => warn!(
                    "{}",
                    VectorStoreError::Persistence(format!(
                        "persisting {} timed out after {}ms",
                        record.id,
                        timeout.as_millis()
                    ))
                ),
            }
        }
        debug!("Persistence worker stopped");
    });
    tx
}

/// Insert loaded records that satisfy the store invariants; skip the rest.
fn load_records(inner: &mut Inner, records: Vec<VectorRecord>) -> usize {
    let mut loaded = 0;
    for record in records {
        let valid = validate_id(&record.id)
            .and_then(|()| validate_vector(&record.vector))
            .and_then(|()| inner.check_dimension(record.vector.len()));
        if let Err(e) = valid {
            warn!("Skipping persisted vector {}: {e}", record.id);
            continue;
        }
        inner.dimension.get_or_insert(record.vector.len());
        inner.records.insert(record.id.clone(), record);
        loaded += 1;
    }
    loaded
}
