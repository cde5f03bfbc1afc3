//! Cache-aside image loading split into focused submodules.
//!
//! - [`cache_aside`] - Resolution of one marked unit through dedup, cache and network
//! - [`native`] - Hooking units without a marker to the host's own loading
//! - [`pipeline`] - Ordered, one-at-a-time processing of registered units
//!
//! The loader is an explicit instance built from its dependencies; two
//! loaders share nothing unless they are handed the same stores.

mod cache_aside;
mod native;
mod pipeline;


pub use pipeline::LoadSummary;

use crate::blob::BlobRegistry;
use crate::config::{CacheBackend, Config};
use crate::dedup::DedupRegistry;
use crate::fetch::{HttpFetcher, ImageFetcher};
use crate::progress::ProgressSink;
use crate::registry::ImageUnit;
use crate::store::{CacheStorage, MemoryCacheStorage, SqliteCacheStorage};
use crate::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

/// Collaborators the loader works against
#[derive(Clone)]
pub struct LoaderDeps {
    /// Named TTL-aware stores
    pub storage: Arc<dyn CacheStorage>,
    /// Network source of truth
    pub fetcher: Arc<dyn ImageFetcher>,
    /// Receiver of unit registrations and outcomes
    pub sink: Arc<dyn ProgressSink>,
    /// URL → handle map for this page
    pub dedup: Arc<DedupRegistry>,
    /// Object URL registry for this page
    pub blobs: Arc<BlobRegistry>,
}

impl LoaderDeps {
    /// Bundle the given collaborators with a fresh dedup map and blob registry
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn ImageFetcher>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            storage,
            fetcher,
            sink,
            dedup: Arc::new(DedupRegistry::new()),
            blobs: Arc::new(BlobRegistry::new()),
        }
    }

    /// Build the configured cache backend and HTTP fetcher
    ///
    /// # Errors
    /// Returns error if the cache database cannot be opened or the HTTP
    /// client cannot be created
    pub async fn from_config(config: &Config, sink: Arc<dyn ProgressSink>) -> Result<Self> {
        config.validate()?;

        let storage: Arc<dyn CacheStorage> = match config.cache.backend {
            CacheBackend::Memory => Arc::new(MemoryCacheStorage::new()),
            CacheBackend::Sqlite => {
                Arc::new(SqliteCacheStorage::new(&config.cache.database_path).await?)
            }
        };
        let fetcher = Arc::new(HttpFetcher::new(&config.http)?);

        tracing::info!(
            backend = storage.name(),
            store = %config.cache.store_name,
            ttl_ms = config.cache.ttl.as_millis() as u64,
            "image loader dependencies ready"
        );
        Ok(Self::new(storage, fetcher, sink))
    }
}

/// Settings the loader reads on every unit
#[derive(Clone, Debug)]
pub struct LoaderSettings {
    /// Name of the cache store holding image entries
    pub store_name: String,
    /// Lifetime of newly created entries
    pub ttl: Duration,
    /// Attribute selecting cache-aside loading
    pub marker_attribute: String,
    /// Label reported to the progress sink per unit
    pub progress_label: String,
}

impl From<&Config> for LoaderSettings {
    fn from(config: &Config) -> Self {
        Self {
            store_name: config.cache.store_name.clone(),
            ttl: config.cache.ttl,
            marker_attribute: config.page.marker_attribute.clone(),
            progress_label: config.page.progress_label.clone(),
        }
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Resolves one unit at a time and reports its outcome
pub(crate) struct CacheAsideFetcher {
    deps: LoaderDeps,
    store_name: String,
    progress_label: String,
    /// TTL in milliseconds, read when an entry is written
    ttl_ms: AtomicU64,
}

impl CacheAsideFetcher {
    pub(crate) fn new(deps: LoaderDeps, settings: &LoaderSettings) -> Self {
        Self {
            deps,
            store_name: settings.store_name.clone(),
            progress_label: settings.progress_label.clone(),
            ttl_ms: AtomicU64::new(settings.ttl.as_millis() as u64),
        }
    }
}

/// Handle returned by [`ImageRegistry::initialize`](crate::registry::ImageRegistry::initialize)
///
/// Holds the registered units that have not been dispatched yet. Each unit
/// leaves the queue exactly once, so every unit gets exactly one terminal
/// report no matter how `load` and `load_native` calls are interleaved.
pub struct ImageLoader {
    fetcher: Arc<CacheAsideFetcher>,
    pending: tokio::sync::Mutex<VecDeque<ImageUnit>>,
    has_cache_aside_work: bool,
    registered: usize,
}

impl ImageLoader {
    pub(crate) fn new(fetcher: CacheAsideFetcher, units: Vec<ImageUnit>) -> Self {
        let has_cache_aside_work = units.iter().any(ImageUnit::is_cache_aside);
        Self {
            fetcher: Arc::new(fetcher),
            registered: units.len(),
            pending: tokio::sync::Mutex::new(units.into()),
            has_cache_aside_work,
        }
    }

    /// Whether at least one registered element carries the marker attribute
    pub fn has_cache_aside_work(&self) -> bool {
        self.has_cache_aside_work
    }

    /// Number of units registered at initialization
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Dedup map shared by every unit of this loader
    pub fn dedup(&self) -> &Arc<DedupRegistry> {
        &self.fetcher.deps.dedup
    }

    /// Object URL registry the loader materializes payloads into
    pub fn blobs(&self) -> &Arc<BlobRegistry> {
        &self.fetcher.deps.blobs
    }
}
