//! Page-local resource handles
//!
//! Fetched or cached payloads are materialized into `blob:` object URLs
//! that elements can point at. Handles are not revoked: they stay
//! resolvable for as long as the [`BlobRegistry`] lives, which is the
//! page's lifetime.

use crate::types::Payload;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Scheme prefix of every object URL handed out
pub const OBJECT_URL_PREFIX: &str = "blob:pageimg/";

/// A materialized payload and the object URL that names it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceHandle {
    object_url: String,
    payload: Arc<Payload>,
}

impl ResourceHandle {
    /// Object URL assigned to elements
    pub fn object_url(&self) -> &str {
        &self.object_url
    }

    /// The bytes behind the handle
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// Registry of object URLs for one page
#[derive(Default)]
pub struct BlobRegistry {
    handles: RwLock<HashMap<String, ResourceHandle>>,
    next_id: AtomicU64,
}

impl BlobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize `payload` under a fresh object URL
    ///
    /// Every call yields a distinct URL, even for identical payloads.
    pub fn create_object_url(&self, payload: Payload) -> ResourceHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = ResourceHandle {
            object_url: format!("{OBJECT_URL_PREFIX}{id}"),
            payload: Arc::new(payload),
        };
        self.handles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(handle.object_url.clone(), handle.clone());
        handle
    }

    /// Look up a handle by its object URL
    pub fn resolve(&self, object_url: &str) -> Option<ResourceHandle> {
        self.handles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(object_url)
            .cloned()
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.handles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether no handle has been created
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
