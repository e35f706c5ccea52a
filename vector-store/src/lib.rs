//! # Vector Store
//!
//! An in-memory associative store of id → (vector, metadata) answering
//! exact cosine-similarity top-k queries.
//!
//! - One dimension per store, fixed by the first stored vector
//! - Dimension check and insert are a single atomic step
//! - Ties in similarity resolve to insertion order
//! - Optional [`PersistenceHook`]; in-memory state is authoritative

pub mod error;
pub mod persistence;
pub mod store;
pub mod types;

pub use error::{Result, VectorStoreError};
pub use persistence::PersistenceHook;
pub use store::{VectorStore, VectorStoreConfig};
pub use types::{
    DeleteReceipt, Metadata, SimilarityMatch, StoreReceipt, StoredVector, VectorRecord,
};
