//! SQLite cache backend
//!
//! Entries live in one `cache_entries` table keyed by `(store_name, url)`;
//! `cache_stores` records which named stores exist. Methods are split by
//! concern:
//! - [`migrations`] - connection setup, schema migrations
//! - [`entries`] - per-store entry CRUD

use super::{CacheStorage, ResourceCache};
use crate::Result;
use async_trait::async_trait;
use sqlx::{FromRow, sqlite::SqlitePool};
use std::sync::Arc;

mod entries;
mod migrations;

/// Durable cache storage backed by a SQLite file
pub struct SqliteCacheStorage {
    pool: SqlitePool,
}

/// Handle to one named store inside a [`SqliteCacheStorage`]
pub(crate) struct SqliteCache {
    pool: SqlitePool,
    store: String,
}

/// Cache entry row (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub(crate) struct CacheEntryRow {
    /// Request URL
    pub url: String,
    /// Response body
    pub body: Vec<u8>,
    /// Response Content-Type
    pub content_type: Option<String>,
    /// HTTP status the body arrived with
    pub status: i64,
    /// Expiry, epoch milliseconds
    pub expires_at: i64,
}

impl From<CacheEntryRow> for super::CacheEntry {
    fn from(row: CacheEntryRow) -> Self {
        super::CacheEntry {
            url: row.url,
            payload: crate::types::Payload {
                body: row.body,
                content_type: row.content_type,
                status: u16::try_from(row.status).unwrap_or(0),
            },
            expires_at_ms: row.expires_at,
        }
    }
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn ResourceCache>> {
        self.ensure_store(name).await?;
        Ok(Arc::new(SqliteCache {
            pool: self.pool.clone(),
            store: name.to_string(),
        }))
    }

    async fn has_store(&self, name: &str) -> Result<bool> {
        self.store_exists(name).await
    }

    async fn delete_store(&self, name: &str) -> Result<bool> {
        self.remove_store(name).await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
