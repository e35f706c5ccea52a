//! End-to-end indexing runs against in-memory collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sift_embeddings::{
    BackendError, Embedding, EmbeddingBackend, EmbeddingInput, EmbeddingPayload, EmbeddingService,
};
use sift_indexer::{
    FileReader, IndexError, IndexingPipeline, IndexingReport, PathResolver, ReadOptions,
    ReportSink, ResolveOptions,
};
use sift_vector_store::VectorStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct LengthBackend;

fn vector_for(text: &str) -> Embedding {
    vec![text.chars().count() as f32, f32::from(text.as_bytes()[0]), 1.0]
}

#[async_trait]
impl EmbeddingBackend for LengthBackend {
    fn name(&self) -> &str {
        "length"
    }

    fn model(&self) -> &str {
        "test-model"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingPayload, BackendError> {
        Ok(match input {
            EmbeddingInput::Single(text) => EmbeddingPayload::Single(vector_for(&text)),
            EmbeddingInput::Batch(texts) => {
                EmbeddingPayload::Batch(texts.iter().map(String::as_str).map(vector_for).collect())
            }
        })
    }
}

struct FixedResolver {
    paths: Vec<String>,
}

#[async_trait]
impl PathResolver for FixedResolver {
    async fn resolve(&self, _pattern: &str, _options: &ResolveOptions) -> anyhow::Result<Vec<String>> {
        Ok(self.paths.clone())
    }
}

struct FailingResolver;

#[async_trait]
impl PathResolver for FailingResolver {
    async fn resolve(&self, _pattern: &str, _options: &ResolveOptions) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("base directory does not exist")
    }
}

/// Serves fixed contents, records read order and tracks concurrency.
#[derive(Default)]
struct MemoryReader {
    files: HashMap<String, Result<String, String>>,
    delay: Option<Duration>,
    reads: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    events: Mutex<Vec<String>>,
}

impl MemoryReader {
    fn with_files(files: &[(&str, Result<&str, &str>)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, content)| {
                    let content = content.map(str::to_string).map_err(str::to_string);
                    ((*path).to_string(), content)
                })
                .collect(),
            ..Self::default()
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileReader for MemoryReader {
    async fn read(&self, path: &str, _options: &ReadOptions) -> anyhow::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("start {path}"));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.events.lock().unwrap().push(format!("end {path}"));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.files.get(path) {
            Some(Ok(content)) => Ok(content.clone()),
            Some(Err(message)) => anyhow::bail!("{message}"),
            None => anyhow::bail!("no such file"),
        }
    }
}

#[derive(Default)]
struct CapturingSink {
    reports: Mutex<Vec<IndexingReport>>,
}

#[async_trait]
impl ReportSink for CapturingSink {
    async fn save_report(&self, report: &IndexingReport) -> anyhow::Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

struct BrokenSink;

#[async_trait]
impl ReportSink for BrokenSink {
    async fn save_report(&self, _report: &IndexingReport) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}

async fn ready_components() -> (Arc<EmbeddingService>, Arc<VectorStore>) {
    let service = Arc::new(EmbeddingService::new(Arc::new(LengthBackend)));
    service.initialize().await.unwrap();
    let store = Arc::new(VectorStore::new());
    store.initialize().await.unwrap();
    (service, store)
}

fn paths(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

const FIVE: [&str; 5] = ["a.md", "b.md", "c.md", "d.md", "e.md"];

fn five_files_third_unreadable() -> MemoryReader {
    MemoryReader::with_files(&[
        ("a.md", Ok("alpha")),
        ("b.md", Ok("bravo")),
        ("c.md", Err("permission denied")),
        ("d.md", Ok("delta")),
        ("e.md", Ok("echo")),
    ])
}

#[tokio::test]
async fn test_one_failing_file_does_not_abort_the_run() {
    let (service, store) = ready_components().await;
    let pipeline = IndexingPipeline::builder()
        .with_embedding_service(service)
        .with_vector_store(Arc::clone(&store))
        .with_resolver(Arc::new(FixedResolver { paths: paths(&FIVE) }))
        .with_reader(Arc::new(five_files_third_unreadable()))
        .build();

    let report = pipeline.index_files("*.md").await.unwrap();

    assert_eq!(report.pattern, "*.md");
    assert_eq!(report.total_files, 5);
    assert_eq!(report.processed_files, 4);
    assert_eq!(report.failed_files, 1);
    assert!(report.is_complete());

    let order: Vec<&str> = report.details.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(order, FIVE.to_vec());

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, "c.md");
    assert!(
        failures[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("permission denied"))
    );

    assert_eq!(store.len().await.unwrap(), 4);
    assert!(store.get_vector("file:c.md").await.unwrap().is_none());
}

#[tokio::test]
async fn test_stored_record_carries_path_and_content() {
    let (service, store) = ready_components().await;
    let pipeline = IndexingPipeline::builder()
        .with_embedding_service(service)
        .with_vector_store(Arc::clone(&store))
        .with_reader(Arc::new(MemoryReader::with_files(&[(
            "notes/todo.md",
            Ok("buy   milk"),
        )])))
        .build();

    let report = pipeline
        .index_paths("manual", paths(&["notes/todo.md"]))
        .await
        .unwrap();
    assert_eq!(report.details[0].id, "file:notes/todo.md");
    assert_eq!(report.details[0].dimension, Some(3));

    let record = store.get_vector("file:notes/todo.md").await.unwrap().unwrap();
    assert_eq!(record.metadata["path"], "notes/todo.md");
    assert_eq!(record.metadata["content"], "buy   milk");
    assert_eq!(record.metadata["size"], 10);
    // Embedded text is whitespace-normalized: "buy milk".
    assert_eq!(record.vector, vec![8.0, f32::from(b'b'), 1.0]);
}

#[tokio::test(start_paused = true)]
async fn test_batches_settle_before_the_next_starts() {
    let (service, store) = ready_components().await;
    let reader = Arc::new(
        MemoryReader::with_files(&[
            ("a.md", Ok("alpha")),
            ("b.md", Ok("bravo")),
            ("c.md", Ok("charlie")),
            ("d.md", Ok("delta")),
            ("e.md", Ok("echo")),
        ])
        .with_delay(Duration::from_millis(50)),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = IndexingPipeline::builder()
        .with_batch_size(2)
        .with_embedding_service(service)
        .with_vector_store(store)
        .with_resolver(Arc::new(FixedResolver { paths: paths(&FIVE) }))
        .with_reader(Arc::clone(&reader) as Arc<dyn FileReader>)
        .with_progress(tx)
        .build();

    let report = pipeline.index_files("*.md").await.unwrap();
    assert_eq!(report.processed_files, 5);
    assert_eq!(reader.max_in_flight.load(Ordering::SeqCst), 2);

    let events = reader.events();
    let position = |event: &str| events.iter().position(|e| e == event).unwrap();
    assert!(position("end a.md") < position("start c.md"));
    assert!(position("end b.md") < position("start c.md"));
    assert!(position("end d.md") < position("start e.md"));

    let mut progress = Vec::new();
    while let Ok(p) = rx.try_recv() {
        progress.push((p.batch, p.total_batches, p.processed_so_far, p.total));
    }
    assert_eq!(progress, vec![(1, 3, 2, 5), (2, 3, 4, 5), (3, 3, 5, 5)]);
}

#[tokio::test]
async fn test_second_run_reads_through_cache() {
    let (service, store) = ready_components().await;
    let reader = Arc::new(MemoryReader::with_files(&[
        ("a.md", Ok("alpha")),
        ("b.md", Ok("bravo")),
    ]));
    let pipeline = IndexingPipeline::builder()
        .with_embedding_service(service)
        .with_vector_store(store)
        .with_resolver(Arc::new(FixedResolver {
            paths: paths(&["a.md", "b.md"]),
        }))
        .with_reader(Arc::clone(&reader) as Arc<dyn FileReader>)
        .build();

    let first = pipeline.index_files("*.md").await.unwrap();
    assert!(first.details.iter().all(|d| !d.from_cache));

    let second = pipeline.index_files("*.md").await.unwrap();
    assert!(second.details.iter().all(|d| d.from_cache));
    assert_eq!(reader.reads.load(Ordering::SeqCst), 2);
    assert_eq!(pipeline.cache().len().await, 2);
}

#[tokio::test]
async fn test_missing_store_is_reported_before_any_work() {
    let (service, _store) = ready_components().await;
    let reader = Arc::new(five_files_third_unreadable());
    let pipeline = IndexingPipeline::builder()
        .with_embedding_service(service)
        .with_resolver(Arc::new(FixedResolver { paths: paths(&FIVE) }))
        .with_reader(Arc::clone(&reader) as Arc<dyn FileReader>)
        .build();

    let err = pipeline.index_files("*.md").await.unwrap_err();
    assert!(matches!(err, IndexError::MissingDependency("vector store")));
    assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_resolver_failure_aborts_the_run() {
    let (service, store) = ready_components().await;
    let pipeline = IndexingPipeline::builder()
        .with_embedding_service(service)
        .with_vector_store(store)
        .with_resolver(Arc::new(FailingResolver))
        .with_reader(Arc::new(MemoryReader::default()))
        .build();

    let err = pipeline.index_files("src/**/*.rs").await.unwrap_err();
    match err {
        IndexError::PatternResolution { pattern, message } => {
            assert_eq!(pattern, "src/**/*.rs");
            assert!(message.contains("does not exist"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_empty_resolution_yields_empty_report() {
    let (service, store) = ready_components().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = IndexingPipeline::builder()
        .with_embedding_service(service)
        .with_vector_store(store)
        .with_resolver(Arc::new(FixedResolver { paths: Vec::new() }))
        .with_reader(Arc::new(MemoryReader::default()))
        .with_progress(tx)
        .build();

    let report = pipeline.index_files("*.none").await.unwrap();
    assert_eq!(report.total_files, 0);
    assert!(report.details.is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_cancelled_token_stops_before_first_batch() {
    let (service, store) = ready_components().await;
    let reader = Arc::new(five_files_third_unreadable());
    let pipeline = IndexingPipeline::builder()
        .with_embedding_service(service)
        .with_vector_store(store)
        .with_resolver(Arc::new(FixedResolver { paths: paths(&FIVE) }))
        .with_reader(Arc::clone(&reader) as Arc<dyn FileReader>)
        .build();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = pipeline
        .index_files_with_cancel("*.md", &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IndexError::Cancelled {
            processed: 0,
            failed: 0,
            total: 5
        }
    ));
    assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_run_stops_at_next_batch_boundary() {
    let (service, store) = ready_components().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = Arc::new(
        IndexingPipeline::builder()
            .with_batch_size(2)
            .with_embedding_service(service)
            .with_vector_store(Arc::clone(&store))
            .with_resolver(Arc::new(FixedResolver { paths: paths(&FIVE) }))
            .with_reader(Arc::new(
                five_files_third_unreadable().with_delay(Duration::from_millis(10)),
            ))
            .with_progress(tx)
            .build(),
    );

    let cancel = CancellationToken::new();
    let run = {
        let pipeline = Arc::clone(&pipeline);
        let cancel = cancel.clone();
        tokio::spawn(async move { pipeline.index_files_with_cancel("*.md", &cancel).await })
    };

    let first = rx.recv().await.unwrap();
    assert_eq!(first.batch, 1);
    cancel.cancel();

    // Batch 2 is already in flight when the token fires; it still settles.
    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        IndexError::Cancelled {
            processed: 3,
            failed: 1,
            total: 5
        }
    ));
    assert_eq!(store.len().await.unwrap(), 3);
    assert_eq!(rx.recv().await.map(|p| p.batch), Some(2));
}

#[tokio::test]
async fn test_report_is_offered_to_sink() {
    let (service, store) = ready_components().await;
    let sink = Arc::new(CapturingSink::default());
    let pipeline = IndexingPipeline::builder()
        .with_embedding_service(service)
        .with_vector_store(store)
        .with_resolver(Arc::new(FixedResolver { paths: paths(&FIVE) }))
        .with_reader(Arc::new(five_files_third_unreadable()))
        .with_report_sink(Arc::clone(&sink) as Arc<dyn ReportSink>)
        .build();

    let report = pipeline.index_files("*.md").await.unwrap();
    let saved = sink.reports.lock().unwrap().clone();
    assert_eq!(saved, vec![report]);
}

#[tokio::test]
async fn test_sink_failure_does_not_fail_the_run() {
    let (service, store) = ready_components().await;
    let pipeline = IndexingPipeline::builder()
        .with_embedding_service(service)
        .with_vector_store(store)
        .with_resolver(Arc::new(FixedResolver { paths: paths(&FIVE) }))
        .with_reader(Arc::new(five_files_third_unreadable()))
        .with_report_sink(Arc::new(BrokenSink))
        .build();

    let report = pipeline.index_files("*.md").await.unwrap();
    assert_eq!(report.processed_files, 4);
}
