//! Embedding backends.
//!
//! A backend turns one text or a list of texts into vectors. The service
//! layer owns validation, truncation, chunking and timeouts; backends only
//! speak the wire protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Embedding;
use crate::error::BackendError;

/// Default inference endpoint (HuggingFace feature-extraction pipeline).
pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/pipeline/feature-extraction";

/// Default sentence embedding model.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Inputs for one backend request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    /// A single text; the backend answers with one vector.
    Single(String),
    /// Several texts; the backend answers with one vector per text.
    Batch(Vec<String>),
}

impl EmbeddingInput {
    /// Number of texts in this request.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(texts) => texts.len(),
        }
    }

    /// Whether the request carries no text at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a backend sends back: one vector, or an array of vectors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingPayload {
    Single(Embedding),
    Batch(Vec<Embedding>),
}

impl EmbeddingPayload {
    /// Flatten the payload into a list of vectors, rejecting empty vectors.
    pub fn into_vectors(self) -> Result<Vec<Embedding>, BackendError> {
        let vectors = match self {
            Self::Single(vector) => vec![vector],
            Self::Batch(vectors) => vectors,
        };

        if vectors.is_empty() {
            return Err(BackendError::InvalidResponse(
                "response contained no vectors".to_string(),
            ));
        }
        if let Some(position) = vectors.iter().position(Vec::is_empty) {
            return Err(BackendError::InvalidResponse(format!(
                "vector {position} in response is empty"
            )));
        }

        Ok(vectors)
    }
}

/// Trait for embedding backends.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Check if the backend is usable (credential set, etc.).
    fn is_available(&self) -> bool;

    /// Send one request.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingPayload, BackendError>;
}

/// Bearer-token HTTP backend speaking the `{inputs, options}` protocol.
pub struct HttpEmbeddingBackend {
    /// API token.
    api_key: Option<String>,

    /// Base URL; the model id is appended as a path segment.
    endpoint: String,

    /// Model id.
    model: String,

    /// HTTP client.
    client: reqwest::Client,
}

impl HttpEmbeddingBackend {
    /// Create a backend reading its token from `HUGGINGFACE_API_KEY`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("HUGGINGFACE_API_KEY").ok(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Drop any configured API key.
    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.model)
    }
}

impl Default for HttpEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    inputs: &'a EmbeddingInput,
    options: RequestOptions,
}

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingPayload, BackendError> {
        let api_key = self.api_key.as_ref().ok_or(BackendError::NotConfigured)?;

        debug!(
            "Requesting {} embedding(s) from {} with model: {}",
            input.len(),
            self.name(),
            self.model
        );

        let body = RequestBody {
            inputs: &input,
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(self.url())
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(BackendError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::InvalidResponse(format!("not a vector or array of vectors: {e}")))
    }
}
