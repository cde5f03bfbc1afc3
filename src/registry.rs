//! One-shot registration of a page's image elements

use crate::element::{ElementRecord, ElementSource, ImageElement};
use crate::loader::{CacheAsideFetcher, ImageLoader, LoaderDeps, LoaderSettings};
use crate::types::UnitMode;
use std::sync::Arc;

/// One image element scheduled for loading
#[derive(Clone, Debug)]
pub struct ImageUnit {
    /// The element the result is assigned to
    pub element: Arc<ImageElement>,
    /// Absolute URL from the marker attribute
    pub source_url: Option<String>,
    /// How the unit is loaded
    pub mode: UnitMode,
}

impl ImageUnit {
    /// Classify an element record: a marker URL selects cache-aside loading
    pub fn from_record(record: ElementRecord) -> Self {
        let mode = if record.source_url.is_some() {
            UnitMode::CacheAside
        } else {
            UnitMode::Native
        };
        Self {
            element: record.element,
            source_url: record.source_url,
            mode,
        }
    }

    /// Whether the unit goes through dedup, cache and network
    pub fn is_cache_aside(&self) -> bool {
        self.mode == UnitMode::CacheAside
    }
}

/// Entry point that turns a page snapshot into a loader
pub struct ImageRegistry;

impl ImageRegistry {
    /// Snapshot the page's image elements and register their progress units
    ///
    /// Elements inserted into the source afterwards are not tracked. One
    /// pending unit per element is registered with the sink before this
    /// returns, so the expected total is known before any resolution
    /// starts.
    pub fn initialize(
        source: &dyn ElementSource,
        deps: LoaderDeps,
        settings: LoaderSettings,
    ) -> ImageLoader {
        let units: Vec<ImageUnit> = source
            .snapshot(&settings.marker_attribute)
            .into_iter()
            .map(ImageUnit::from_record)
            .collect();

        for _ in &units {
            deps.sink.add_unit(&settings.progress_label);
        }

        let cache_aside = units.iter().filter(|u| u.is_cache_aside()).count();
        tracing::info!(
            units = units.len(),
            cache_aside,
            native = units.len() - cache_aside,
            "image registry initialized"
        );

        ImageLoader::new(CacheAsideFetcher::new(deps, &settings), units)
    }
}
