//! URL deduplication for one page lifetime

use crate::blob::ResourceHandle;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    handles: HashMap<String, ResourceHandle>,
    order: Vec<String>,
}

/// Maps request URLs to the handle they already resolved to
///
/// Entries are written once per URL and never invalidated; later units
/// asking for the same URL reuse the first handle without touching the
/// cache store or the network.
#[derive(Default)]
pub struct DedupRegistry {
    inner: Mutex<Inner>,
}

impl DedupRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Handle already resolved for `url`, if any
    pub fn get(&self, url: &str) -> Option<ResourceHandle> {
        self.lock().handles.get(url).cloned()
    }

    /// Record the handle `url` resolved to
    ///
    /// First occurrence wins: if the URL is already present the existing
    /// handle is kept and returned.
    pub fn record(&self, url: &str, handle: ResourceHandle) -> ResourceHandle {
        let mut inner = self.lock();
        if let Some(existing) = inner.handles.get(url) {
            return existing.clone();
        }
        inner.order.push(url.to_string());
        inner.handles.insert(url.to_string(), handle.clone());
        handle
    }

    /// Whether `url` has been resolved
    pub fn contains(&self, url: &str) -> bool {
        self.lock().handles.contains_key(url)
    }

    /// URLs in the order their entries were created
    pub fn urls(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    /// Number of distinct URLs resolved
    pub fn len(&self) -> usize {
        self.lock().handles.len()
    }

    /// Whether nothing has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
