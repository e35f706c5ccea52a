//! Persistence extension point.
//!
//! The store is authoritative in memory. A hook, when present, is offered
//! every written record and asked for records once at start-up; its failures
//! are logged and never reach callers.

use async_trait::async_trait;

use crate::types::VectorRecord;

/// Durable backing for a [`crate::VectorStore`].
#[async_trait]
pub trait PersistenceHook: Send + Sync {
    /// Persist one record.
    async fn save(&self, record: &VectorRecord) -> anyhow::Result<()>;

    /// Load every persisted record, oldest first.
    async fn load(&self) -> anyhow::Result<Vec<VectorRecord>>;
}
