//! Read-through content cache keyed by file path.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default time-to-live for cached content.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Metadata recorded alongside cached content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Content length in bytes.
    pub size: usize,

    /// Encoding the content was read with.
    pub encoding: String,

    /// When the content was read.
    pub timestamp: DateTime<Utc>,
}

impl CacheMetadata {
    /// Metadata for content read just now.
    pub fn for_content(content: &str, encoding: impl Into<String>) -> Self {
        Self {
            size: content.len(),
            encoding: encoding.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A cache hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedContent {
    pub content: String,
    pub metadata: CacheMetadata,

    /// Time since the entry was written.
    pub age: Duration,
}

struct CacheEntry {
    content: String,
    metadata: CacheMetadata,
    cached_at: Instant,
}

/// TTL cache of file contents.
///
/// Expired entries are evicted lazily on lookup; there is no size bound and
/// no background sweep, so the map grows with the number of distinct paths.
pub struct ContentCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ContentCache {
    /// Create a cache with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up `path`, evicting the entry if it has expired.
    pub async fn get(&self, path: &str) -> Option<CachedContent> {
        {
            let entries = self.entries.read().await;
            let entry = entries.get(path)?;
            let age = entry.cached_at.elapsed();
            if age < self.ttl {
                debug!("Content cache hit: {path}");
                return Some(CachedContent {
                    content: entry.content.clone(),
                    metadata: entry.metadata.clone(),
                    age,
                });
            }
        }

        let mut entries = self.entries.write().await;
        // Another writer may have refreshed the entry in between.
        if let Some(entry) = entries.get(path) {
            let age = entry.cached_at.elapsed();
            if age < self.ttl {
                return Some(CachedContent {
                    content: entry.content.clone(),
                    metadata: entry.metadata.clone(),
                    age,
                });
            }
            entries.remove(path);
            debug!("Evicted expired cache entry: {path}");
        }
        None
    }

    /// Insert or overwrite the entry for `path`.
    pub async fn put(&self, path: impl Into<String>, content: impl Into<String>, metadata: CacheMetadata) {
        let path = path.into();
        let entry = CacheEntry {
            content: content.into(),
            metadata,
            cached_at: Instant::now(),
        };
        debug!("Cached content for {path}");
        self.entries.write().await.insert(path, entry);
    }

    /// Drop the entry for `path`; returns whether one existed.
    pub async fn invalidate(&self, path: &str) -> bool {
        self.entries.write().await.remove(path).is_some()
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        info!("Cleared content cache");
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let expired = entries
            .values()
            .filter(|e| e.cached_at.elapsed() >= self.ttl)
            .count();
        CacheStats {
            entries: entries.len(),
            expired,
            total_bytes: entries.values().map(|e| e.metadata.size).sum(),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Statistics about the content cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Entries past their TTL that have not been looked up since.
    pub expired: usize,

    /// Sum of cached content sizes.
    pub total_bytes: usize,

    /// Time-to-live in seconds.
    pub ttl_secs: u64,
}
