//! Ordered, one-at-a-time processing of registered units.

use crate::registry::ImageUnit;
use crate::types::UnitMode;
use crate::Error;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::cache_aside::Resolution;
use super::native::NativeAttach;
use super::{CacheAsideFetcher, ImageLoader};

/// Tally of one `load` pass
///
/// Reports to the progress sink are the source of truth; this is for
/// callers that want to log what a pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Units taken off the queue by this pass
    pub dispatched: usize,
    /// Units reported complete during the pass
    pub complete: usize,
    /// Units reported invalid during the pass
    pub invalid: usize,
    /// Native units left to a watcher (reported later)
    pub watching: usize,
    /// Cache-aside units served from the dedup map
    pub dedup_hits: usize,
    /// Cache-aside units served from the cache store
    pub cache_hits: usize,
    /// Cache-aside units fetched from the network
    pub network_fetches: usize,
}

impl CacheAsideFetcher {
    /// Process one unit to its terminal report (or hand it to a watcher)
    async fn process(&self, unit: &ImageUnit, summary: &mut LoadSummary) {
        summary.dispatched += 1;

        let url = match (unit.mode, unit.source_url.as_deref()) {
            (UnitMode::Native, _) => {
                match self.attach_native(unit) {
                    NativeAttach::Complete => summary.complete += 1,
                    NativeAttach::Invalid => summary.invalid += 1,
                    NativeAttach::Watching => summary.watching += 1,
                }
                return;
            }
            (UnitMode::CacheAside, Some(url)) if !url.trim().is_empty() => url,
            (UnitMode::CacheAside, _) => {
                tracing::warn!(element = %unit.element.id(), "cache-aside unit without URL");
                self.deps.sink.invalid(&self.progress_label);
                summary.invalid += 1;
                return;
            }
        };

        match self.resolve(unit, url).await {
            Ok(resolution) => {
                match resolution {
                    Resolution::Dedup => summary.dedup_hits += 1,
                    Resolution::Cache | Resolution::StaleCache => summary.cache_hits += 1,
                    Resolution::Network => summary.network_fetches += 1,
                }
                tracing::debug!(element = %unit.element.id(), url, ?resolution, "image resolved");
                self.deps.sink.complete(&self.progress_label);
                summary.complete += 1;
            }
            Err(e) => {
                log_failure(unit, url, &e);
                self.deps.sink.invalid(&self.progress_label);
                summary.invalid += 1;
            }
        }
    }
}

fn log_failure(unit: &ImageUnit, url: &str, error: &Error) {
    tracing::warn!(
        element = %unit.element.id(),
        url,
        kind = ?error.failure_kind(),
        code = error.error_code(),
        error = %error,
        "image unit failed"
    );
}

impl ImageLoader {
    /// Process every remaining unit, strictly in document order
    ///
    /// Cache-aside units are resolved one at a time: the next unit starts
    /// only after the previous one reported. A failing unit is reported
    /// invalid and the pass continues.
    pub async fn load(&self) -> LoadSummary {
        self.run(|_| true).await
    }

    /// Process only the remaining units without a marker
    ///
    /// Marked units stay queued for a later [`load`](Self::load).
    pub async fn load_native(&self) -> LoadSummary {
        self.run(|unit| unit.mode == UnitMode::Native).await
    }

    /// Run [`load`](Self::load) on a background task
    pub fn spawn_load(self: &Arc<Self>) -> tokio::task::JoinHandle<LoadSummary> {
        let loader = self.clone();
        tokio::spawn(async move { loader.load().await })
    }

    /// Set the lifetime of entries created from now on, in milliseconds
    pub fn set_ttl(&self, ms: u64) {
        self.fetcher.set_ttl(Duration::from_millis(ms));
    }

    /// Current lifetime for new entries
    pub fn ttl(&self) -> Duration {
        self.fetcher.ttl()
    }

    /// Units not yet dispatched
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }

    async fn run(&self, select: impl Fn(&ImageUnit) -> bool) -> LoadSummary {
        let mut batch = self.take(select).await;
        let mut summary = LoadSummary::default();

        while let Some(unit) = batch.pop_front() {
            self.fetcher.process(&unit, &mut summary).await;
        }

        tracing::info!(
            dispatched = summary.dispatched,
            complete = summary.complete,
            invalid = summary.invalid,
            watching = summary.watching,
            network = summary.network_fetches,
            "image load pass finished"
        );
        summary
    }

    /// Remove the selected units from the queue, keeping document order on both sides
    async fn take(&self, select: impl Fn(&ImageUnit) -> bool) -> VecDeque<ImageUnit> {
        let mut pending = self.pending.lock().await;
        let (taken, kept): (VecDeque<_>, VecDeque<_>) = pending.drain(..).partition(|u| select(u));
        *pending = kept;
        taken
    }
}
