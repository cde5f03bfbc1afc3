//! In-process cache backend

use super::{CacheEntry, CacheStorage, ResourceCache};
use crate::Result;
use crate::types::Payload;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Cache storage kept entirely in memory
///
/// Stores opened twice under the same name share their entries, as with
/// the durable backend.
#[derive(Default)]
pub struct MemoryCacheStorage {
    stores: Mutex<HashMap<String, Arc<MemoryCache>>>,
}

impl MemoryCacheStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn ResourceCache>> {
        let mut stores = self.stores.lock().await;
        let store: Arc<dyn ResourceCache> = stores
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(store = name, "creating in-memory cache store");
                Arc::new(MemoryCache::default())
            })
            .clone();
        Ok(store)
    }

    async fn has_store(&self, name: &str) -> Result<bool> {
        Ok(self.stores.lock().await.contains_key(name))
    }

    async fn delete_store(&self, name: &str) -> Result<bool> {
        Ok(self.stores.lock().await.remove(name).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Default)]
struct MemoryCache {
    // (insertion sequence, entry)
    entries: RwLock<HashMap<String, (u64, CacheEntry)>>,
    next_seq: AtomicU64,
}

#[async_trait]
impl ResourceCache for MemoryCache {
    async fn get(&self, url: &str) -> Result<Option<CacheEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .get(url)
            .map(|(_, entry)| entry.clone()))
    }

    async fn put_with_expiry(
        &self,
        url: &str,
        payload: &Payload,
        expires_at_ms: i64,
    ) -> Result<()> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry {
            url: url.to_string(),
            payload: payload.clone(),
            expires_at_ms,
        };
        self.entries
            .write()
            .await
            .insert(url.to_string(), (seq, entry));
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(url).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        let mut keyed: Vec<(u64, &String)> = entries
            .iter()
            .map(|(url, (seq, _))| (*seq, url))
            .collect();
        keyed.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(keyed.into_iter().map(|(_, url)| url.clone()).collect())
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, entry)| !entry.is_expired(now_ms));
        Ok((before - entries.len()) as u64)
    }
}
