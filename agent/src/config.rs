//! Agent configuration, loaded from TOML.
//!
//! ```toml
//! [embedding]
//! model = "sentence-transformers/all-MiniLM-L6-v2"
//! api_key_env = "HUGGINGFACE_API_KEY"
//!
//! [store]
//! similarity_threshold = 0.75
//!
//! [indexing]
//! base_dir = "docs"
//! batch_size = 8
//! ```
//!
//! Every section and field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sift_embeddings::EmbeddingServiceConfig;
use sift_embeddings::backend::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use sift_indexer::{IndexingConfig, ReadOptions, ResolveOptions};
use sift_vector_store::VectorStoreConfig;

use crate::error::{AgentError, Result};

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub embedding: EmbeddingSection,
    pub store: StoreSection,
    pub indexing: IndexingSection,
}

/// Embedding backend and service limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub endpoint: String,
    pub model: String,

    /// Inline API key; takes precedence over `api_key_env`.
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    pub max_text_length: usize,
    pub max_batch_size: usize,
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_key_env: "HUGGINGFACE_API_KEY".to_string(),
            max_text_length: 8192,
            max_batch_size: 32,
            request_timeout_secs: 30,
        }
    }
}

/// Vector store defaults and optional on-disk persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub similarity_threshold: f64,
    pub default_limit: usize,
    pub persist_timeout_ms: u64,

    /// JSON Lines file backing the store; in-memory only when unset.
    ///
    /// Only stores are appended. Deleted or cleared records come back on
    /// the next start.
    pub persist_path: Option<PathBuf>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            default_limit: 10,
            persist_timeout_ms: 5_000,
            persist_path: None,
        }
    }
}

/// Indexing pipeline, resolver, reader and cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingSection {
    pub batch_size: usize,
    pub base_dir: String,
    pub ignore_patterns: Vec<String>,
    pub max_results: usize,
    pub max_file_size: u64,
    pub encoding: String,
    pub cache_ttl_secs: u64,
    pub report_timeout_ms: u64,

    /// Where the last indexing report is written; not kept when unset.
    pub report_path: Option<PathBuf>,
}

impl Default for IndexingSection {
    fn default() -> Self {
        Self {
            batch_size: 10,
            base_dir: ".".to_string(),
            ignore_patterns: Vec::new(),
            max_results: 1000,
            max_file_size: sift_fs::DEFAULT_MAX_FILE_SIZE,
            encoding: "utf-8".to_string(),
            cache_ttl_secs: 30 * 60,
            report_timeout_ms: 5_000,
            report_path: None,
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the components cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.store.similarity_threshold) {
            return Err(AgentError::Config(format!(
                "similarity_threshold must be within [-1, 1], got {}",
                self.store.similarity_threshold
            )));
        }
        if self.indexing.batch_size == 0 {
            return Err(AgentError::Config("batch_size must be at least 1".to_string()));
        }
        if self.embedding.max_batch_size == 0 {
            return Err(AgentError::Config(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The API key, inline or from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.embedding
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.embedding.api_key_env).ok())
            .filter(|key| !key.is_empty())
    }

    pub fn embedding_service_config(&self) -> EmbeddingServiceConfig {
        EmbeddingServiceConfig::default()
            .with_max_text_length(self.embedding.max_text_length)
            .with_max_batch_size(self.embedding.max_batch_size)
            .with_request_timeout(Duration::from_secs(self.embedding.request_timeout_secs))
    }

    pub fn vector_store_config(&self) -> VectorStoreConfig {
        VectorStoreConfig {
            persist_timeout_ms: self.store.persist_timeout_ms,
            ..VectorStoreConfig::default()
        }
        .with_threshold(self.store.similarity_threshold)
        .with_limit(self.store.default_limit)
    }

    pub fn indexing_config(&self) -> IndexingConfig {
        IndexingConfig {
            batch_size: self.indexing.batch_size,
            resolve: self.resolve_options(),
            read: ReadOptions {
                encoding: self.indexing.encoding.clone(),
            },
            report_timeout_ms: self.indexing.report_timeout_ms,
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            base_dir: self.indexing.base_dir.clone(),
            ignore_patterns: self.indexing.ignore_patterns.clone(),
            max_results: self.indexing.max_results,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.indexing.cache_ttl_secs)
    }
}
