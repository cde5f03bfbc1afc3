//! TTL-aware resource cache stores
//!
//! A [`CacheStorage`] holds named stores; opening a name yields a
//! [`ResourceCache`] handle keyed by absolute request URL. Every entry
//! carries an epoch-millisecond expiry written by the caller. The store
//! never expires anything on its own: readers compare the expiry with the
//! current time and decide.
//!
//! ## Backends
//!
//! - [`MemoryCacheStorage`] - in-process maps, for tests and ephemeral hosts
//! - [`SqliteCacheStorage`] - durable SQLite file with schema migrations

use crate::Result;
use crate::types::Payload;
use async_trait::async_trait;
use std::sync::Arc;

mod memory;
mod sqlite;

pub use memory::MemoryCacheStorage;
pub use sqlite::SqliteCacheStorage;

/// One cached response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// Absolute request URL the entry is keyed by
    pub url: String,
    /// Stored body and response metadata
    pub payload: Payload,
    /// Epoch milliseconds after which the entry is stale
    pub expires_at_ms: i64,
}

impl CacheEntry {
    /// An entry is fresh up to and including its expiry instant
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }
}

/// Collection of named resource caches
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open (creating if needed) the store with the given name
    async fn open(&self, name: &str) -> Result<Arc<dyn ResourceCache>>;

    /// Whether a store with this name exists
    async fn has_store(&self, name: &str) -> Result<bool>;

    /// Drop a whole store and its entries
    ///
    /// Returns false if no such store existed.
    async fn delete_store(&self, name: &str) -> Result<bool>;

    /// Human-readable backend name for logging
    fn name(&self) -> &'static str;
}

/// One named store of URL-keyed entries
#[async_trait]
pub trait ResourceCache: Send + Sync {
    /// Look up the entry stored for `url`
    async fn get(&self, url: &str) -> Result<Option<CacheEntry>>;

    /// Store `payload` under `url`, replacing any existing entry
    async fn put_with_expiry(&self, url: &str, payload: &Payload, expires_at_ms: i64)
    -> Result<()>;

    /// Remove the entry for `url`
    ///
    /// Returns false if there was nothing to remove.
    async fn delete(&self, url: &str) -> Result<bool>;

    /// URLs currently stored, in insertion order
    async fn keys(&self) -> Result<Vec<String>>;

    /// Remove every entry whose expiry lies before `now_ms`
    ///
    /// Returns the number of entries removed.
    async fn purge_expired(&self, now_ms: i64) -> Result<u64>;
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
