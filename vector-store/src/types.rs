//! Record and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sift_embeddings::Embedding;

/// Free-form metadata attached to a stored vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A vector owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Caller-chosen unique identifier.
    pub id: String,

    /// The embedding.
    pub vector: Embedding,

    /// Associated metadata.
    pub metadata: Metadata,

    /// When the record was last written.
    pub stored_at: DateTime<Utc>,
}

/// A record as returned by [`crate::VectorStore::get_all_vectors`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    pub id: String,
    pub vector: Embedding,
    pub metadata: Metadata,
}

impl From<&VectorRecord> for StoredVector {
    fn from(record: &VectorRecord) -> Self {
        Self {
            id: record.id.clone(),
            vector: record.vector.clone(),
            metadata: record.metadata.clone(),
        }
    }
}

/// One hit from a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// ID of the matched record.
    pub id: String,

    /// Cosine similarity to the query.
    pub similarity: f64,

    /// Metadata of the matched record.
    pub metadata: Metadata,
}

/// Acknowledgement of a successful store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReceipt {
    pub id: String,
    pub success: bool,
}

/// Acknowledgement of a delete. `deleted` is false when the id was unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub id: String,
    pub success: bool,
    pub deleted: bool,
}
