//! Named store management and per-store entry CRUD.

use crate::error::DatabaseError;
use crate::store::{CacheEntry, ResourceCache};
use crate::types::Payload;
use crate::{Error, Result};
use async_trait::async_trait;

use super::{CacheEntryRow, SqliteCache, SqliteCacheStorage};

impl SqliteCacheStorage {
    /// Register a store name if it isn't known yet
    pub(super) async fn ensure_store(&self, name: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query(
            r#"
            INSERT INTO cache_stores (name, created_at)
            VALUES (?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to open cache store '{}': {}",
                name, e
            )))
        })?;

        Ok(())
    }

    pub(super) async fn store_exists(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM cache_stores WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to look up cache store '{}': {}",
                    name, e
                )))
            })?;

        Ok(found.is_some())
    }

    /// Delete a store; its entries go with it (ON DELETE CASCADE)
    pub(super) async fn remove_store(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cache_stores WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete cache store '{}': {}",
                    name, e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ResourceCache for SqliteCache {
    async fn get(&self, url: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query_as::<_, CacheEntryRow>(
            r#"
            SELECT url, body, content_type, status, expires_at
            FROM cache_entries
            WHERE store_name = ? AND url = ?
            "#,
        )
        .bind(&self.store)
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to read cache entry: {}",
                e
            )))
        })?;

        Ok(row.map(CacheEntry::from))
    }

    async fn put_with_expiry(
        &self,
        url: &str,
        payload: &Payload,
        expires_at_ms: i64,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        // REPLACE deletes the old row first, so the entry moves to the end of rowid order
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO cache_entries
                (store_name, url, body, content_type, status, expires_at, stored_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.store)
        .bind(url)
        .bind(&payload.body)
        .bind(payload.content_type.as_deref())
        .bind(i64::from(payload.status))
        .bind(expires_at_ms)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to store cache entry: {}",
                e
            )))
        })?;

        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE store_name = ? AND url = ?")
            .bind(&self.store)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete cache entry: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let urls: Vec<String> =
            sqlx::query_scalar("SELECT url FROM cache_entries WHERE store_name = ? ORDER BY rowid")
                .bind(&self.store)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to list cache keys: {}",
                        e
                    )))
                })?;

        Ok(urls)
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE store_name = ? AND expires_at < ?")
            .bind(&self.store)
            .bind(now_ms)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to purge expired cache entries: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
