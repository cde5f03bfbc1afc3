//! Shared test doubles: a recording progress sink, a scripted fetcher and
//! a cache storage that logs every operation.

use crate::element::{ImageElement, StaticElements};
use crate::fetch::ImageFetcher;
use crate::loader::{ImageLoader, LoaderDeps, LoaderSettings};
use crate::progress::ProgressSink;
use crate::registry::ImageRegistry;
use crate::store::{CacheEntry, CacheStorage, MemoryCacheStorage, ResourceCache};
use crate::types::Payload;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One call received by [`RecordingSink`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Report {
    Added(String),
    Complete(String),
    Invalid(String),
}

/// Progress sink that records the exact call sequence
#[derive(Default)]
pub(crate) struct RecordingSink {
    reports: Mutex<Vec<Report>>,
    changed: Notify,
}

impl RecordingSink {
    pub(crate) fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    /// Terminal reports only, in order
    pub(crate) fn terminal(&self) -> Vec<Report> {
        self.reports()
            .into_iter()
            .filter(|r| !matches!(r, Report::Added(_)))
            .collect()
    }

    pub(crate) fn complete_count(&self) -> usize {
        self.terminal()
            .iter()
            .filter(|r| matches!(r, Report::Complete(_)))
            .count()
    }

    pub(crate) fn invalid_count(&self) -> usize {
        self.terminal()
            .iter()
            .filter(|r| matches!(r, Report::Invalid(_)))
            .count()
    }

    /// Wait (bounded) until at least `n` terminal reports arrived
    pub(crate) async fn wait_for_terminal(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let notified = self.changed.notified();
                if self.terminal().len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("timed out waiting for terminal reports");
    }

    fn push(&self, report: Report) {
        self.reports.lock().unwrap().push(report);
        self.changed.notify_waiters();
    }
}

impl ProgressSink for RecordingSink {
    fn add_unit(&self, label: &str) {
        self.push(Report::Added(label.to_string()));
    }

    fn complete(&self, label: &str) {
        self.push(Report::Complete(label.to_string()));
    }

    fn invalid(&self, label: &str) {
        self.push(Report::Invalid(label.to_string()));
    }
}

#[derive(Clone)]
enum Script {
    Respond(Payload),
    Fail(String),
}

/// Fetcher answering from a per-URL script, with optional delays
///
/// Unscripted URLs answer 200 with the URL itself as body.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn respond(&self, url: &str, payload: Payload) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Respond(payload));
    }

    pub(crate) fn fail(&self, url: &str, reason: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Fail(reason.to_string()));
    }

    pub(crate) fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == url).count()
    }
}

#[async_trait]
impl ImageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Payload> {
        self.calls.lock().unwrap().push(url.to_string());

        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let script = self.scripts.lock().unwrap().get(url).cloned();
        match script {
            Some(Script::Respond(payload)) => Ok(payload),
            Some(Script::Fail(reason)) => Err(Error::Fetch {
                url: url.to_string(),
                reason,
            }),
            None => Ok(Payload::ok(url.as_bytes().to_vec(), Some("image/png"))),
        }
    }
}

/// One operation seen by [`CountingStorage`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum StoreOp {
    Open(String),
    Get(String),
    Put(String),
    Delete(String),
}

/// Memory storage that logs every operation and can be switched off
#[derive(Default)]
pub(crate) struct CountingStorage {
    inner: MemoryCacheStorage,
    ops: Arc<Mutex<Vec<StoreOp>>>,
    unavailable: AtomicBool,
    refuse_deletes: Arc<AtomicBool>,
}

impl CountingStorage {
    pub(crate) fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    pub(crate) fn ops_for(&self, url: &str) -> Vec<StoreOp> {
        self.ops()
            .into_iter()
            .filter(|op| match op {
                StoreOp::Get(u) | StoreOp::Put(u) | StoreOp::Delete(u) => u == url,
                StoreOp::Open(_) => false,
            })
            .collect()
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every entry delete report that nothing was removed
    pub(crate) fn set_refuse_deletes(&self, refuse: bool) {
        self.refuse_deletes.store(refuse, Ordering::SeqCst);
    }

    /// Direct access to the underlying store, bypassing the log
    pub(crate) async fn raw(&self, name: &str) -> Arc<dyn ResourceCache> {
        self.inner.open(name).await.unwrap()
    }
}

#[async_trait]
impl CacheStorage for CountingStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn ResourceCache>> {
        self.ops.lock().unwrap().push(StoreOp::Open(name.to_string()));
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::CacheStore("storage unavailable".into()));
        }
        let inner = self.inner.open(name).await?;
        Ok(Arc::new(CountingCache {
            inner,
            ops: self.ops.clone(),
            refuse_deletes: self.refuse_deletes.clone(),
        }))
    }

    async fn has_store(&self, name: &str) -> Result<bool> {
        self.inner.has_store(name).await
    }

    async fn delete_store(&self, name: &str) -> Result<bool> {
        self.inner.delete_store(name).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

struct CountingCache {
    inner: Arc<dyn ResourceCache>,
    ops: Arc<Mutex<Vec<StoreOp>>>,
    refuse_deletes: Arc<AtomicBool>,
}

#[async_trait]
impl ResourceCache for CountingCache {
    async fn get(&self, url: &str) -> Result<Option<CacheEntry>> {
        self.ops.lock().unwrap().push(StoreOp::Get(url.to_string()));
        self.inner.get(url).await
    }

    async fn put_with_expiry(
        &self,
        url: &str,
        payload: &Payload,
        expires_at_ms: i64,
    ) -> Result<()> {
        self.ops.lock().unwrap().push(StoreOp::Put(url.to_string()));
        self.inner.put_with_expiry(url, payload, expires_at_ms).await
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        self.ops.lock().unwrap().push(StoreOp::Delete(url.to_string()));
        if self.refuse_deletes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.delete(url).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<u64> {
        self.inner.purge_expired(now_ms).await
    }
}

/// Shared doubles for one test
pub(crate) struct TestRig {
    pub(crate) storage: Arc<CountingStorage>,
    pub(crate) fetcher: Arc<ScriptedFetcher>,
    pub(crate) sink: Arc<RecordingSink>,
}

impl TestRig {
    pub(crate) fn new() -> Self {
        Self {
            storage: Arc::new(CountingStorage::default()),
            fetcher: Arc::new(ScriptedFetcher::default()),
            sink: Arc::new(RecordingSink::default()),
        }
    }

    /// Dependencies with a fresh dedup map and blob registry
    pub(crate) fn deps(&self) -> LoaderDeps {
        LoaderDeps::new(self.storage.clone(), self.fetcher.clone(), self.sink.clone())
    }

    /// Register `elements` with default settings
    pub(crate) fn loader(&self, elements: Vec<Arc<ImageElement>>) -> ImageLoader {
        ImageRegistry::initialize(
            &StaticElements::new(elements),
            self.deps(),
            LoaderSettings::default(),
        )
    }
}

pub(crate) fn cache_aside_element(id: &str, url: &str) -> Arc<ImageElement> {
    Arc::new(ImageElement::new(id).attr("data-src", url))
}

pub(crate) fn native_element(id: &str) -> Arc<ImageElement> {
    Arc::new(ImageElement::new(id).attr("src", &format!("/static/{id}.png")))
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
