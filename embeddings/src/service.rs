//! The embedding service: validation, preprocessing, chunking and timeouts
//! layered over an [`EmbeddingBackend`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::backend::{EmbeddingBackend, EmbeddingInput, EmbeddingPayload};
use crate::error::{BackendError, EmbeddingError, Result};

/// Text sent to the backend by [`EmbeddingService::initialize`].
const PROBE_TEXT: &str = "embedding service liveness probe";

/// Limits applied by the embedding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    /// Texts longer than this many characters are truncated.
    pub max_text_length: usize,

    /// Maximum number of texts sent in a single request.
    pub max_batch_size: usize,

    /// Per-request timeout.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            max_text_length: 8192,
            max_batch_size: 32,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl EmbeddingServiceConfig {
    /// Set the truncation length.
    pub fn with_max_text_length(mut self, chars: usize) -> Self {
        self.max_text_length = chars;
        self
    }

    /// Set the request chunk size.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Collapse whitespace runs into single spaces and trim both ends.
///
/// `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` down to at most `max_chars` characters.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Converts text into embedding vectors through a backend.
pub struct EmbeddingService {
    backend: Arc<dyn EmbeddingBackend>,
    config: EmbeddingServiceConfig,
    initialized: AtomicBool,
    dimension: AtomicUsize,
    init_lock: Mutex<()>,
}

impl EmbeddingService {
    /// Create a service with default limits.
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self::with_config(backend, EmbeddingServiceConfig::default())
    }

    /// Create a service with custom limits.
    pub fn with_config(backend: Arc<dyn EmbeddingBackend>, config: EmbeddingServiceConfig) -> Self {
        Self {
            backend,
            config,
            initialized: AtomicBool::new(false),
            dimension: AtomicUsize::new(0),
            init_lock: Mutex::new(()),
        }
    }

    /// The active limits.
    pub fn config(&self) -> &EmbeddingServiceConfig {
        &self.config
    }

    /// Model identifier of the underlying backend.
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Whether `initialize()` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Vector length reported by the liveness probe, once initialized.
    pub fn dimension(&self) -> Option<usize> {
        match self.dimension.load(Ordering::Acquire) {
            0 => None,
            dimension => Some(dimension),
        }
    }

    /// Probe the backend once and mark the service ready.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;

        if self.is_initialized() {
            warn!("Embedding service already initialized");
            return Ok(());
        }

        if !self.backend.is_available() {
            return Err(EmbeddingError::Configuration(format!(
                "no credential configured for embedding backend '{}'",
                self.backend.name()
            )));
        }

        let timeout = self.config.request_timeout;
        let probe = self.backend.embed(EmbeddingInput::Single(PROBE_TEXT.to_string()));
        let vectors = tokio::time::timeout(timeout, probe)
            .await
            .map_err(|_| {
                EmbeddingError::BackendUnavailable(format!(
                    "liveness probe timed out after {}ms",
                    timeout.as_millis()
                ))
            })?
            .and_then(EmbeddingPayload::into_vectors)
            .map_err(|e| EmbeddingError::BackendUnavailable(e.to_string()))?;

        let dimension = vectors.first().map(Vec::len).unwrap_or_default();
        self.dimension.store(dimension, Ordering::Release);
        self.initialized.store(true, Ordering::Release);

        info!(
            "Embedding service initialized (backend: {}, model: {}, dimension: {dimension})",
            self.backend.name(),
            self.backend.model()
        );
        Ok(())
    }

    /// Generate one embedding.
    ///
    /// The text is truncated to `max_text_length` characters before
    /// whitespace is collapsed, so a text whose first `max_text_length`
    /// characters are all whitespace is rejected as `InvalidInput` even if
    /// content follows.
    pub async fn generate_embedding(&self, text: &str) -> Result<Embedding> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "text must be a non-empty string".to_string(),
            ));
        }
        self.ensure_initialized()?;

        let prepared = self.prepare(text).ok_or_else(|| {
            EmbeddingError::InvalidInput("text contains only whitespace".to_string())
        })?;

        let timeout = self.config.request_timeout;
        let payload = tokio::time::timeout(timeout, self.backend.embed(EmbeddingInput::Single(prepared)))
            .await
            .map_err(|_| BackendError::TimedOut { after: timeout })??;

        let mut vectors = payload.into_vectors()?;
        if vectors.len() != 1 {
            return Err(BackendError::InvalidResponse(format!(
                "expected 1 vector, got {}",
                vectors.len()
            ))
            .into());
        }

        let embedding = vectors
            .pop()
            .ok_or_else(|| BackendError::InvalidResponse("response contained no vectors".to_string()))?;
        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    /// Generate one embedding per input text, preserving input order.
    ///
    /// Inputs longer than `max_batch_size` are split into ordered chunks,
    /// each sent as its own request.
    pub async fn generate_batch_embeddings<T: AsRef<str>>(&self, texts: &[T]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "texts must be a non-empty sequence".to_string(),
            ));
        }
        if let Some(index) = texts.iter().position(|t| t.as_ref().is_empty()) {
            return Err(EmbeddingError::InvalidInput(format!(
                "text at index {index} is empty"
            )));
        }
        self.ensure_initialized()?;

        let mut prepared = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let text = self.prepare(text.as_ref()).ok_or_else(|| {
                EmbeddingError::InvalidInput(format!("text at index {index} contains only whitespace"))
            })?;
            prepared.push(text);
        }

        let chunk_size = self.config.max_batch_size.max(1);
        let timeout = self.config.request_timeout;
        let mut embeddings = Vec::with_capacity(prepared.len());

        for (chunk_index, chunk) in prepared.chunks(chunk_size).enumerate() {
            debug!(
                "Sending embedding chunk {chunk_index} ({} texts)",
                chunk.len()
            );

            let request = self.backend.embed(EmbeddingInput::Batch(chunk.to_vec()));
            let payload = tokio::time::timeout(timeout, request)
                .await
                .map_err(|_| EmbeddingError::Timeout { after: timeout })??;

            let vectors = payload.into_vectors()?;
            if vectors.len() != chunk.len() {
                return Err(BackendError::InvalidResponse(format!(
                    "expected {} vectors, got {}",
                    chunk.len(),
                    vectors.len()
                ))
                .into());
            }
            embeddings.extend(vectors);
        }

        info!("Generated {} batch embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(EmbeddingError::NotInitialized)
        }
    }

    /// Truncate then normalize; `None` when nothing is left.
    fn prepare(&self, text: &str) -> Option<String> {
        let truncated = truncate(text, self.config.max_text_length);
        if truncated.len() < text.len() {
            debug!(
                "Truncated input from {} to {} characters",
                text.chars().count(),
                self.config.max_text_length
            );
        }
        let normalized = normalize(truncated);
        (!normalized.is_empty()).then_some(normalized)
    }
}
