//! The agent facade: wires configuration into components and exposes them
//! as tools.

use std::sync::Arc;

use serde_json::{Value, json};
use sift_embeddings::{EmbeddingBackend, EmbeddingService, HttpEmbeddingBackend};
use sift_fs::{FsFileReader, GlobResolver, JsonFilePersistence, JsonReportSink};
use sift_indexer::{ContentCache, IndexingPipeline, PathResolver, ReportSink};
use sift_vector_store::{PersistenceHook, VectorStore};
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::error::Result;
use crate::registry::{ToolInfo, ToolRegistry};
use crate::tool::ToolOutput;
use crate::tools::{GlobTool, IndexFilesTool, ReadFileTool, SemanticSearchTool};

/// Indexing and semantic search behind a tool interface.
pub struct SemanticAgent {
    config: AgentConfig,
    embeddings: Arc<EmbeddingService>,
    store: Arc<VectorStore>,
    cache: Arc<ContentCache>,
    pipeline: Arc<IndexingPipeline>,
    registry: ToolRegistry,
}

impl SemanticAgent {
    /// Build an agent talking to the configured HTTP embedding endpoint.
    pub async fn new(config: AgentConfig) -> Self {
        let mut backend = HttpEmbeddingBackend::new()
            .without_api_key()
            .with_endpoint(config.embedding.endpoint.clone())
            .with_model(config.embedding.model.clone());
        if let Some(key) = config.api_key() {
            backend = backend.with_api_key(key);
        }
        Self::with_backend(config, Arc::new(backend)).await
    }

    /// Build an agent around an explicit embedding backend.
    pub async fn with_backend(config: AgentConfig, backend: Arc<dyn EmbeddingBackend>) -> Self {
        let embeddings = Arc::new(EmbeddingService::with_config(
            backend,
            config.embedding_service_config(),
        ));

        let mut store = VectorStore::with_config(config.vector_store_config());
        if let Some(path) = &config.store.persist_path {
            warn!(
                "Persisting vectors to {}; deletes are not persisted and reappear after a restart",
                path.display()
            );
            let hook: Arc<dyn PersistenceHook> = Arc::new(JsonFilePersistence::new(path));
            store = store.with_persistence(hook);
        }
        let store = Arc::new(store);

        let cache = Arc::new(ContentCache::new(config.cache_ttl()));
        let resolver: Arc<dyn PathResolver> = Arc::new(GlobResolver::new());
        let reader = FsFileReader::new().with_max_file_size(config.indexing.max_file_size);

        let mut builder = IndexingPipeline::builder()
            .with_config(config.indexing_config())
            .with_embedding_service(Arc::clone(&embeddings))
            .with_vector_store(Arc::clone(&store))
            .with_resolver(Arc::clone(&resolver))
            .with_reader(Arc::new(reader.clone()))
            .with_cache(Arc::clone(&cache));
        if let Some(path) = &config.indexing.report_path {
            let sink: Arc<dyn ReportSink> = Arc::new(JsonReportSink::new(path));
            builder = builder.with_report_sink(sink);
        }
        let pipeline = Arc::new(builder.build());

        let registry = ToolRegistry::new();
        registry
            .register(Arc::new(ReadFileTool::new(
                Arc::clone(&cache),
                reader,
                config.indexing_config().read,
            )))
            .await;
        registry
            .register(Arc::new(GlobTool::new(resolver, config.resolve_options())))
            .await;
        registry
            .register(Arc::new(IndexFilesTool::new(Arc::clone(&pipeline))))
            .await;
        registry
            .register(Arc::new(SemanticSearchTool::new(
                Arc::clone(&embeddings),
                Arc::clone(&store),
            )))
            .await;

        Self {
            config,
            embeddings,
            store,
            cache,
            pipeline,
            registry,
        }
    }

    /// Initialize the embedding service and the vector store.
    pub async fn initialize(&self) -> Result<()> {
        self.embeddings.initialize().await?;
        self.store.initialize().await?;
        info!(
            "Semantic agent ready (model: {}, dimension: {:?})",
            self.embeddings.model(),
            self.embeddings.dimension()
        );
        Ok(())
    }

    /// Run a tool by name.
    pub async fn execute(&self, tool: &str, args: Value) -> ToolOutput {
        self.registry.execute(tool, args).await
    }

    /// Index files matching `pattern`.
    pub async fn index_files(&self, pattern: &str) -> ToolOutput {
        self.execute("index_files", json!({ "pattern": pattern })).await
    }

    /// Semantic search with store defaults.
    pub async fn search(&self, query: &str) -> ToolOutput {
        self.execute("semantic_search", json!({ "query": query })).await
    }

    /// Read a file through the cache.
    pub async fn read_file(&self, path: &str) -> ToolOutput {
        self.execute("read_file", json!({ "path": path })).await
    }

    /// Registered tools, sorted by name.
    pub async fn tools(&self) -> Vec<ToolInfo> {
        self.registry.list().await
    }

    /// The registry, for adding custom tools.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    pub fn pipeline(&self) -> &Arc<IndexingPipeline> {
        &self.pipeline
    }
}
