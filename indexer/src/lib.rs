//! # Indexer
//!
//! Batched, concurrent indexing of files into a vector store.
//!
//! A run resolves a pattern to paths, then reads (through a TTL content
//! cache), embeds and stores each file. Files within a batch run
//! concurrently; batches run one after another. A failing file is recorded
//! in the [`IndexingReport`] and never aborts the run.

pub mod cache;
pub mod collaborators;
pub mod error;
pub mod pipeline;
pub mod report;

pub use cache::{CacheMetadata, CacheStats, CachedContent, ContentCache, DEFAULT_TTL};
pub use collaborators::{FileReader, PathResolver, ReadOptions, ReportSink, ResolveOptions};
pub use error::{IndexError, Result};
pub use pipeline::{IndexingConfig, IndexingPipeline, PipelineBuilder, file_id};
pub use report::{BatchProgress, FileOutcome, IndexingReport};
