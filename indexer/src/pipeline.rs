//! Indexing pipeline orchestration.
//!
//! Resolve a pattern to paths, then for each path: read through the content
//! cache, embed, and store. Paths are processed in fixed-size batches; every
//! file of a batch runs concurrently and the batch is fully settled before the
//! next one starts. Per-file failures are recorded in the report and never
//! abort the run.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sift_embeddings::EmbeddingService;
use sift_vector_store::{Metadata, VectorStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CacheMetadata, ContentCache};
use crate::collaborators::{FileReader, PathResolver, ReadOptions, ReportSink, ResolveOptions};
use crate::error::{IndexError, Result};
use crate::report::{BatchProgress, FileOutcome, IndexingReport};

/// Id under which the vector for `path` is stored.
pub fn file_id(path: &str) -> String {
    format!("file:{path}")
}

/// Configuration for the indexing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Files processed concurrently per batch.
    pub batch_size: usize,

    /// Options handed to the path resolver.
    pub resolve: ResolveOptions,

    /// Options handed to the file reader.
    pub read: ReadOptions,

    /// Upper bound on handing the report to the sink, in milliseconds.
    pub report_timeout_ms: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            resolve: ResolveOptions::default(),
            read: ReadOptions::default(),
            report_timeout_ms: 5_000,
        }
    }
}

/// Phase of an indexing run, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Resolving,
    Processing { batch: usize, total_batches: usize },
    Aggregating,
    Complete,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolving => write!(f, "resolving"),
            Self::Processing {
                batch,
                total_batches,
            } => write!(f, "processing batch {batch} of {total_batches}"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Components a run cannot proceed without.
struct Dependencies<'a> {
    embeddings: &'a EmbeddingService,
    store: &'a VectorStore,
    reader: &'a dyn FileReader,
}

/// The batched, concurrent indexing pipeline.
pub struct IndexingPipeline {
    config: IndexingConfig,
    embeddings: Option<Arc<EmbeddingService>>,
    store: Option<Arc<VectorStore>>,
    resolver: Option<Arc<dyn PathResolver>>,
    reader: Option<Arc<dyn FileReader>>,
    cache: Arc<ContentCache>,
    report_sink: Option<Arc<dyn ReportSink>>,
    progress: Option<mpsc::UnboundedSender<BatchProgress>>,
}

impl IndexingPipeline {
    /// Start building a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The active configuration.
    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    /// The content cache used by the read path.
    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    /// Resolve `pattern` and index every matching file.
    pub async fn index_files(&self, pattern: &str) -> Result<IndexingReport> {
        self.run(pattern, None, None).await
    }

    /// Like [`Self::index_files`], but stops before the next batch once
    /// `cancel` fires. A batch already in flight always runs to completion.
    pub async fn index_files_with_cancel(
        &self,
        pattern: &str,
        cancel: &CancellationToken,
    ) -> Result<IndexingReport> {
        self.run(pattern, None, Some(cancel)).await
    }

    /// Index an explicit list of paths, skipping resolution.
    pub async fn index_paths(&self, label: &str, paths: Vec<String>) -> Result<IndexingReport> {
        self.run(label, Some(paths), None).await
    }

    async fn run(
        &self,
        pattern: &str,
        paths: Option<Vec<String>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<IndexingReport> {
        let deps = self.dependencies()?;
        let started = Instant::now();

        let paths = match paths {
            Some(paths) => paths,
            None => {
                log_phase(pattern, RunPhase::Resolving);
                self.resolve(pattern).await?
            }
        };

        let batch_size = self.config.batch_size.max(1);
        let total_batches = paths.len().div_ceil(batch_size);
        let mut report = IndexingReport::new(pattern, paths.len());
        info!(
            "Indexing {} files for '{pattern}' in {total_batches} batches of up to {batch_size}",
            paths.len()
        );

        for (index, batch) in paths.chunks(batch_size).enumerate() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                warn!("Indexing run for '{pattern}' cancelled before batch {}", index + 1);
                return Err(IndexError::Cancelled {
                    processed: report.processed_files,
                    failed: report.failed_files,
                    total: report.total_files,
                });
            }

            log_phase(
                pattern,
                RunPhase::Processing {
                    batch: index + 1,
                    total_batches,
                },
            );

            let outcomes = join_all(batch.iter().map(|path| self.index_single_file(&deps, path))).await;
            for outcome in outcomes {
                report.record(outcome);
            }

            self.emit_progress(BatchProgress {
                batch: index + 1,
                total_batches,
                processed_so_far: report.details.len(),
                total: report.total_files,
                failures_so_far: report.failed_files,
            });
        }

        log_phase(pattern, RunPhase::Aggregating);
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "Indexed '{pattern}': {} processed, {} failed of {} in {}ms",
            report.processed_files, report.failed_files, report.total_files, report.duration_ms
        );

        self.offer_report(&report).await;
        log_phase(pattern, RunPhase::Complete);

        Ok(report)
    }

    fn dependencies(&self) -> Result<Dependencies<'_>> {
        let embeddings = self
            .embeddings
            .as_deref()
            .ok_or(IndexError::MissingDependency("embedding service"))?;
        let store = self
            .store
            .as_deref()
            .ok_or(IndexError::MissingDependency("vector store"))?;
        let reader = self
            .reader
            .as_deref()
            .ok_or(IndexError::MissingDependency("file reader"))?;
        Ok(Dependencies {
            embeddings,
            store,
            reader,
        })
    }

    async fn resolve(&self, pattern: &str) -> Result<Vec<String>> {
        let resolver = self
            .resolver
            .as_deref()
            .ok_or(IndexError::MissingDependency("path resolver"))?;

        resolver
            .resolve(pattern, &self.config.resolve)
            .await
            .map_err(|e| IndexError::PatternResolution {
                pattern: pattern.to_string(),
                message: format!("{e:#}"),
            })
    }

    async fn index_single_file(&self, deps: &Dependencies<'_>, path: &str) -> FileOutcome {
        let id = file_id(path);
        let mut from_cache = false;

        let result = self.try_index_file(deps, path, &id, &mut from_cache).await;
        match result {
            Ok(dimension) => {
                debug!("Indexed {path} as {id}");
                FileOutcome {
                    path: path.to_string(),
                    id,
                    success: true,
                    error: None,
                    dimension: Some(dimension),
                    from_cache,
                }
            }
            Err(e) => {
                warn!("Failed to index {path}: {e}");
                FileOutcome {
                    path: path.to_string(),
                    id,
                    success: false,
                    error: Some(e.to_string()),
                    dimension: None,
                    from_cache,
                }
            }
        }
    }

    async fn try_index_file(
        &self,
        deps: &Dependencies<'_>,
        path: &str,
        id: &str,
        from_cache: &mut bool,
    ) -> Result<usize> {
        let (content, cached) = self.read_through_cache(deps.reader, path).await?;
        *from_cache = cached;

        let embedding = deps.embeddings.generate_embedding(&content).await?;
        let dimension = embedding.len();

        let mut metadata = Metadata::new();
        metadata.insert("path".to_string(), json!(path));
        metadata.insert("size".to_string(), json!(content.len()));
        metadata.insert("indexedAt".to_string(), json!(chrono::Utc::now()));
        metadata.insert("content".to_string(), json!(content));

        deps.store.store_vector(id, embedding, metadata).await?;
        Ok(dimension)
    }

    /// Content for `path` and whether it came from the cache.
    async fn read_through_cache(&self, reader: &dyn FileReader, path: &str) -> Result<(String, bool)> {
        if let Some(hit) = self.cache.get(path).await {
            return Ok((hit.content, true));
        }

        let options = &self.config.read;
        let content = reader
            .read(path, options)
            .await
            .map_err(|e| IndexError::Read {
                path: path.to_string(),
                message: format!("{e:#}"),
            })?;

        let metadata = CacheMetadata::for_content(&content, options.encoding.clone());
        self.cache.put(path, content.clone(), metadata).await;
        Ok((content, false))
    }

    fn emit_progress(&self, progress: BatchProgress) {
        info!(
            "Batch {}/{}: {}/{} files settled, {} failed",
            progress.batch,
            progress.total_batches,
            progress.processed_so_far,
            progress.total,
            progress.failures_so_far
        );
        if let Some(tx) = &self.progress {
            if tx.send(progress).is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }

    async fn offer_report(&self, report: &IndexingReport) {
        let Some(sink) = &self.report_sink else {
            return;
        };
        let timeout = Duration::from_millis(self.config.report_timeout_ms);
        match tokio::time::timeout(timeout, sink.save_report(report)).await {
            Ok(Ok(())) => debug!("Saved indexing report for '{}'", report.pattern),
            Ok(Err(e)) => warn!("Failed to save indexing report: {e:#}"),
            Err(_) => warn!(
                "Saving indexing report timed out after {}ms",
                timeout.as_millis()
            ),
        }
    }
}

fn log_phase(pattern: &str, phase: RunPhase) {
    debug!("Indexing run '{pattern}': {phase}");
}

/// Builder for [`IndexingPipeline`].
pub struct PipelineBuilder {
    config: IndexingConfig,
    embeddings: Option<Arc<EmbeddingService>>,
    store: Option<Arc<VectorStore>>,
    resolver: Option<Arc<dyn PathResolver>>,
    reader: Option<Arc<dyn FileReader>>,
    cache: Option<Arc<ContentCache>>,
    report_sink: Option<Arc<dyn ReportSink>>,
    progress: Option<mpsc::UnboundedSender<BatchProgress>>,
}

impl PipelineBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: IndexingConfig::default(),
            embeddings: None,
            store: None,
            resolver: None,
            reader: None,
            cache: None,
            report_sink: None,
            progress: None,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: IndexingConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Wire in the embedding service.
    pub fn with_embedding_service(mut self, service: Arc<EmbeddingService>) -> Self {
        self.embeddings = Some(service);
        self
    }

    /// Wire in the vector store.
    pub fn with_vector_store(mut self, store: Arc<VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Wire in the path resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Wire in the file reader.
    pub fn with_reader(mut self, reader: Arc<dyn FileReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Share an existing content cache.
    pub fn with_cache(mut self, cache: Arc<ContentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Offer finished reports to `sink`.
    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    /// Send a [`BatchProgress`] after each batch.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<BatchProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> IndexingPipeline {
        IndexingPipeline {
            config: self.config,
            embeddings: self.embeddings,
            store: self.store,
            resolver: self.resolver,
            reader: self.reader,
            cache: self.cache.unwrap_or_default(),
            report_sink: self.report_sink,
            progress: self.progress,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
