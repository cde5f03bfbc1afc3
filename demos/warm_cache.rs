//! Cache warming example
//!
//! Scans an HTML page for marked images, loads them through the cache and
//! prints progress events as they arrive. Running it twice against the
//! same page serves the second run from the sqlite cache.
//!
//! ```text
//! cargo run --example warm_cache -- page.html https://example.com/ [config.json]
//! ```

use pageimg::{
    CacheStorage, Config, Event, HtmlDocument, ImageRegistry, LoaderDeps, LoaderSettings,
    ProgressBarrier, ResourceCache,
};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(html_path), Some(base)) = (args.next(), args.next()) else {
        eprintln!("usage: warm_cache <page.html> <base-url> [config.json]");
        std::process::exit(2);
    };

    let config = match args.next() {
        Some(path) => Config::from_json_file(Path::new(&path)).await?,
        None => Config::default(),
    };

    let html = tokio::fs::read_to_string(&html_path).await?;
    let page = HtmlDocument::parse(&html, Some(base.parse()?));

    // Plain images have no host to load them here; count them as loaded
    for element in page.elements() {
        if !element.has_attribute(&config.page.marker_attribute) {
            element.finish_native(1, 1);
        }
    }

    let barrier = Arc::new(ProgressBarrier::new());
    let mut events = barrier.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::UnitComplete { completed, total, .. } => {
                    println!("[progress] {}/{} loaded", completed, total);
                }
                Event::UnitInvalid { invalid, total, .. } => {
                    println!("[progress] {} of {} failed", invalid, total);
                }
                Event::Ready { completed, invalid } => {
                    println!("[ready] {} loaded, {} failed", completed, invalid);
                }
                _ => {}
            }
        }
    });

    let deps = LoaderDeps::from_config(&config, barrier.clone()).await?;
    let storage = deps.storage.clone();
    let loader = ImageRegistry::initialize(&page, deps, LoaderSettings::from(&config));
    let summary = loader.load().await;

    if loader.registered() > 0 {
        barrier.wait_ready().await;
    }

    println!(
        "network: {}, cache: {}, dedup: {}",
        summary.network_fetches, summary.cache_hits, summary.dedup_hits
    );

    let cache = storage.open(&config.cache.store_name).await?;
    let purged = cache.purge_expired(chrono::Utc::now().timestamp_millis()).await?;
    println!(
        "{} entries cached in '{}' ({} expired entries purged)",
        cache.keys().await?.len(),
        config.cache.store_name,
        purged
    );

    Ok(())
}
