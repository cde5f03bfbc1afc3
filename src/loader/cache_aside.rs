//! Resolution of one marked unit through dedup, cache and network.

use crate::blob::ResourceHandle;
use crate::registry::ImageUnit;
use crate::store::ResourceCache;
use crate::types::Payload;
use crate::Result;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::CacheAsideFetcher;

/// Where a resolved payload came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Already resolved earlier on this page
    Dedup,
    /// Fresh entry served from the cache store
    Cache,
    /// Expired entry the store refused to delete; served as-is
    StaleCache,
    /// Fetched from the network and written to the store
    Network,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl CacheAsideFetcher {
    pub(crate) fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed))
    }

    pub(crate) fn set_ttl(&self, ttl: Duration) {
        self.ttl_ms
            .store(ttl.as_millis() as u64, Ordering::Relaxed);
    }

    /// Resolve `url` for `unit` and assign the resulting handle
    pub(crate) async fn resolve(&self, unit: &ImageUnit, url: &str) -> Result<Resolution> {
        if let Some(handle) = self.deps.dedup.get(url) {
            unit.element.assign_source(&handle);
            return Ok(Resolution::Dedup);
        }

        let cache = self.deps.storage.open(&self.store_name).await?;

        let (payload, resolution) = match cache.get(url).await? {
            None => (self.fetch_and_put(cache.as_ref(), url).await?, Resolution::Network),
            Some(entry) if !entry.is_expired(now_ms()) => (entry.payload, Resolution::Cache),
            Some(entry) => {
                tracing::debug!(url, expired_at = entry.expires_at_ms, "cache entry expired");
                if cache.delete(url).await? {
                    (self.fetch_and_put(cache.as_ref(), url).await?, Resolution::Network)
                } else {
                    (entry.payload, Resolution::StaleCache)
                }
            }
        };

        let handle: ResourceHandle = self.deps.blobs.create_object_url(payload);
        let handle = self.deps.dedup.record(url, handle);
        unit.element.assign_source(&handle);

        Ok(resolution)
    }

    /// Miss path: fetch, stamp the expiry, store, hand back the body
    async fn fetch_and_put(&self, cache: &dyn ResourceCache, url: &str) -> Result<Payload> {
        let payload = self.deps.fetcher.fetch(url).await?;

        if !payload.is_success() {
            // Kept and cached as-is; callers decide whether error bodies should be cached
            tracing::warn!(
                url,
                status = payload.status,
                "caching image response with non-success status"
            );
        }

        // Oversized TTLs clamp to the far future
        let ttl_ms = i64::try_from(self.ttl().as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = now_ms().saturating_add(ttl_ms);

        cache.put_with_expiry(url, &payload, expires_at_ms).await?;
        tracing::debug!(url, expires_at_ms, bytes = payload.body.len(), "image cached");

        Ok(payload)
    }
}
