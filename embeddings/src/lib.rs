//! # Embeddings
//!
//! Turns text into fixed-length vectors through an external model and
//! provides the similarity metric used by the vector store.
//!
//! ## Features
//!
//! - **Embedding Service**: validation, truncation, whitespace normalization,
//!   order-preserving batch chunking and per-request timeouts
//! - **HTTP Backend**: bearer-token `{inputs, options}` protocol
//! - **Similarity**: cosine similarity with zero-norm handling
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingService ──► EmbeddingBackend ──► EmbeddingPayload    │
//! │       │                     │                                   │
//! │       ▼                     ▼                                   │
//! │  normalize/truncate   HttpEmbeddingBackend                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod service;
pub mod similarity;

pub use backend::{EmbeddingBackend, EmbeddingInput, EmbeddingPayload, HttpEmbeddingBackend};
pub use error::{BackendError, EmbeddingError, Result};
pub use service::{EmbeddingService, EmbeddingServiceConfig, normalize, truncate};
pub use similarity::cosine_similarity;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
