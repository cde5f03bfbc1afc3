//! # pageimg
//!
//! Cache-aside image loading for pages that gate readiness on their images.
//!
//! ## Design Philosophy
//!
//! pageimg is designed to be:
//! - **Ordered** - Marked images resolve one at a time, in document order
//! - **Cache-first** - A TTL-aware store sits in front of the network
//! - **Deduplicated** - A URL is resolved at most once per page
//! - **Event-driven** - Progress is pushed to a sink, readiness is broadcast
//!
//! ## Quick Start
//!
//! ```no_run
//! use pageimg::{Config, HtmlDocument, ImageRegistry, LoaderDeps, LoaderSettings, ProgressBarrier};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let barrier = Arc::new(ProgressBarrier::new());
//!
//!     let page = HtmlDocument::parse(
//!         r#"<img data-src="/img/cover.jpg"><img src="/img/logo.svg">"#,
//!         Some("https://example.com/".parse()?),
//!     );
//!
//!     let deps = LoaderDeps::from_config(&config, barrier.clone()).await?;
//!     let loader = ImageRegistry::initialize(&page, deps, LoaderSettings::from(&config));
//!     loader.load().await;
//!
//!     let counts = barrier.wait_ready().await;
//!     println!("{} complete, {} invalid", counts.completed, counts.invalid);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Page-local object URLs
pub mod blob;
/// Configuration types
pub mod config;
/// URL deduplication
pub mod dedup;
/// Image elements and element sources
pub mod element;
/// Error types
pub mod error;
/// Network fetching
pub mod fetch;
/// Cache-aside loading pipeline
pub mod loader;
/// Immediate and gated page loading
pub mod orchestrator;
/// Progress reporting and the readiness barrier
pub mod progress;
/// Image element registration
pub mod registry;
/// TTL-aware cache stores
pub mod store;
/// Core types and events
pub mod types;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use blob::{BlobRegistry, ResourceHandle};
pub use config::{CacheBackend, CacheConfig, Config, HttpConfig, PageConfig};
pub use dedup::DedupRegistry;
pub use element::{ElementSource, HtmlDocument, ImageElement, NativeState, StaticElements};
pub use error::{DatabaseError, Error, FailureKind, Result};
pub use fetch::{HttpFetcher, ImageFetcher};
pub use loader::{ImageLoader, LoadSummary, LoaderDeps, LoaderSettings};
pub use orchestrator::{Access, GuestSession, LoadMode, Orchestrator, PageLoad};
pub use progress::{ProgressBarrier, ProgressCounts, ProgressSink};
pub use registry::{ImageRegistry, ImageUnit};
pub use store::{
    CacheEntry, CacheStorage, MemoryCacheStorage, ResourceCache, SqliteCacheStorage,
};
pub use types::{ElementId, Event, Payload, UnitMode};
