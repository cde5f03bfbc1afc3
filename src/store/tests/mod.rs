mod sqlite;

use crate::store::{CacheStorage, ResourceCache};
use crate::types::Payload;

/// Behaviour every backend must share; run against each one.
pub(super) async fn check_entry_lifecycle(storage: &dyn CacheStorage) {
    let cache = storage.open("images").await.unwrap();
    let url = "https://cdn.example.com/cover.jpg";

    assert!(cache.get(url).await.unwrap().is_none());

    let payload = Payload::ok(b"jpeg-bytes".to_vec(), Some("image/jpeg"));
    cache.put_with_expiry(url, &payload, 5_000).await.unwrap();

    let entry = cache.get(url).await.unwrap().expect("entry stored");
    assert_eq!(entry.url, url);
    assert_eq!(entry.payload, payload);
    assert_eq!(entry.expires_at_ms, 5_000);
    assert!(!entry.is_expired(5_000), "expiry instant itself is still fresh");
    assert!(entry.is_expired(5_001));

    assert!(cache.delete(url).await.unwrap());
    assert!(!cache.delete(url).await.unwrap(), "second delete finds nothing");
    assert!(cache.get(url).await.unwrap().is_none());
}

pub(super) async fn check_replacement_and_order(storage: &dyn CacheStorage) {
    let cache = storage.open("images").await.unwrap();
    let a = "https://cdn.example.com/a.png";
    let b = "https://cdn.example.com/b.png";

    cache
        .put_with_expiry(a, &Payload::ok(b"old".to_vec(), None), 10)
        .await
        .unwrap();
    cache
        .put_with_expiry(b, &Payload::ok(b"b".to_vec(), None), 10)
        .await
        .unwrap();
    cache
        .put_with_expiry(a, &Payload::ok(b"new".to_vec(), None), 20)
        .await
        .unwrap();

    let entry = cache.get(a).await.unwrap().unwrap();
    assert_eq!(entry.payload.body, b"new");
    assert_eq!(entry.expires_at_ms, 20);

    // Replacement re-inserts, so `a` now sorts after `b`
    assert_eq!(cache.keys().await.unwrap(), vec![b.to_string(), a.to_string()]);
}

pub(super) async fn check_named_stores_are_isolated(storage: &dyn CacheStorage) {
    let images = storage.open("images").await.unwrap();
    let other = storage.open("fonts").await.unwrap();
    let url = "https://cdn.example.com/shared";

    images
        .put_with_expiry(url, &Payload::ok(b"img".to_vec(), None), 1)
        .await
        .unwrap();

    assert!(other.get(url).await.unwrap().is_none());
    assert!(storage.has_store("fonts").await.unwrap());

    // Reopening the same name sees the same entries
    let again = storage.open("images").await.unwrap();
    assert!(again.get(url).await.unwrap().is_some());

    assert!(storage.delete_store("images").await.unwrap());
    assert!(!storage.has_store("images").await.unwrap());
    assert!(!storage.delete_store("images").await.unwrap());

    let reopened = storage.open("images").await.unwrap();
    assert!(reopened.get(url).await.unwrap().is_none());
}

pub(super) async fn check_purge_expired(storage: &dyn CacheStorage) {
    let cache = storage.open("images").await.unwrap();
    for (url, expiry) in [("https://x/1", 100), ("https://x/2", 200), ("https://x/3", 300)] {
        cache
            .put_with_expiry(url, &Payload::ok(b"x".to_vec(), None), expiry)
            .await
            .unwrap();
    }

    let removed = cache.purge_expired(200).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(
        cache.keys().await.unwrap(),
        vec!["https://x/2".to_string(), "https://x/3".to_string()]
    );
}

pub(super) fn assert_object_safe(_: &dyn ResourceCache) {}
