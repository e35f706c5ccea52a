//! Built-in tools: `read_file`, `glob`, `index_files` and `semantic_search`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sift_embeddings::EmbeddingService;
use sift_fs::FsFileReader;
use sift_indexer::{
    CacheMetadata, ContentCache, IndexingPipeline, PathResolver, ReadOptions, ResolveOptions,
};
use sift_vector_store::VectorStore;

use crate::error::Result;
use crate::tool::{Tool, parse_args};

/// Characters of stored content returned with each search hit.
const SNIPPET_CHARS: usize = 200;

/// Reads a file through the shared content cache.
pub struct ReadFileTool {
    cache: Arc<ContentCache>,
    reader: FsFileReader,
    options: ReadOptions,
}

impl ReadFileTool {
    pub fn new(cache: Arc<ContentCache>, reader: FsFileReader, options: ReadOptions) -> Self {
        Self {
            cache,
            reader,
            options,
        }
    }
}

#[derive(Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file, served from cache while fresh"
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let ReadFileArgs { path } = parse_args(args)?;

        if let Some(hit) = self.cache.get(&path).await {
            return Ok(json!({
                "path": path,
                "content": hit.content,
                "size": hit.metadata.size,
                "fromCache": true,
            }));
        }

        let content = self
            .reader
            .read_to_string(&path, &self.options.encoding)
            .await?;
        let metadata = CacheMetadata::for_content(&content, self.options.encoding.clone());
        let size = metadata.size;
        self.cache.put(path.as_str(), content.clone(), metadata).await;

        Ok(json!({
            "path": path,
            "content": content,
            "size": size,
            "fromCache": false,
        }))
    }
}

/// Lists files matching a glob pattern.
pub struct GlobTool {
    resolver: Arc<dyn PathResolver>,
    options: ResolveOptions,
}

impl GlobTool {
    pub fn new(resolver: Arc<dyn PathResolver>, options: ResolveOptions) -> Self {
        Self { resolver, options }
    }
}

#[derive(Deserialize)]
struct GlobArgs {
    pattern: String,
    #[serde(default)]
    base_dir: Option<String>,
    #[serde(default)]
    max_results: Option<usize>,
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "List files matching a glob pattern"
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args: GlobArgs = parse_args(args)?;
        let mut options = self.options.clone();
        if let Some(base_dir) = args.base_dir {
            options.base_dir = base_dir;
        }
        if let Some(max_results) = args.max_results {
            options.max_results = max_results;
        }

        let files = self.resolver.resolve(&args.pattern, &options).await?;
        Ok(json!({
            "pattern": args.pattern,
            "count": files.len(),
            "files": files,
        }))
    }
}

/// Indexes files matching a pattern into the vector store.
pub struct IndexFilesTool {
    pipeline: Arc<IndexingPipeline>,
}

impl IndexFilesTool {
    pub fn new(pipeline: Arc<IndexingPipeline>) -> Self {
        Self { pipeline }
    }
}

#[derive(Deserialize)]
struct IndexFilesArgs {
    pattern: String,
}

#[async_trait]
impl Tool for IndexFilesTool {
    fn name(&self) -> &str {
        "index_files"
    }

    fn description(&self) -> &str {
        "Embed and store every file matching a glob pattern"
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let IndexFilesArgs { pattern } = parse_args(args)?;
        let report = self.pipeline.index_files(&pattern).await?;
        Ok(serde_json::to_value(report).map_err(anyhow::Error::from)?)
    }
}

/// Finds stored files most similar to a text query.
pub struct SemanticSearchTool {
    embeddings: Arc<EmbeddingService>,
    store: Arc<VectorStore>,
}

impl SemanticSearchTool {
    pub fn new(embeddings: Arc<EmbeddingService>, store: Arc<VectorStore>) -> Self {
        Self { embeddings, store }
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    threshold: Option<f64>,
}

#[async_trait]
impl Tool for SemanticSearchTool {
    fn name(&self) -> &str {
        "semantic_search"
    }

    fn description(&self) -> &str {
        "Search indexed files by meaning"
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args: SearchArgs = parse_args(args)?;
        let query = self.embeddings.generate_embedding(&args.query).await?;
        let matches = self
            .store
            .find_similar(&query, args.limit, args.threshold)
            .await?;

        let results: Vec<Value> = matches
            .into_iter()
            .map(|m| {
                let snippet: String = m
                    .metadata
                    .get("content")
                    .and_then(Value::as_str)
                    .map(|content| content.chars().take(SNIPPET_CHARS).collect())
                    .unwrap_or_default();
                json!({
                    "id": m.id,
                    "path": m.metadata.get("path").cloned().unwrap_or(Value::Null),
                    "similarity": m.similarity,
                    "snippet": snippet,
                })
            })
            .collect();

        Ok(json!({
            "query": args.query,
            "count": results.len(),
            "results": results,
        }))
    }
}
