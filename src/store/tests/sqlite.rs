use super::*;
use crate::store::SqliteCacheStorage;
use tempfile::NamedTempFile;

async fn open_temp() -> (SqliteCacheStorage, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let storage = SqliteCacheStorage::new(temp_file.path()).await.unwrap();
    (storage, temp_file)
}

#[tokio::test]
async fn test_sqlite_entry_lifecycle() {
    let (storage, _file) = open_temp().await;
    check_entry_lifecycle(&storage).await;
    storage.close().await;
}

#[tokio::test]
async fn test_sqlite_replacement_and_order() {
    let (storage, _file) = open_temp().await;
    check_replacement_and_order(&storage).await;
    storage.close().await;
}

#[tokio::test]
async fn test_sqlite_named_stores_are_isolated() {
    let (storage, _file) = open_temp().await;
    check_named_stores_are_isolated(&storage).await;
    storage.close().await;
}

#[tokio::test]
async fn test_sqlite_purge_expired() {
    let (storage, _file) = open_temp().await;
    check_purge_expired(&storage).await;
    storage.close().await;
}

#[tokio::test]
async fn test_sqlite_entries_survive_reopen() {
    let temp_file = NamedTempFile::new().unwrap();
    let url = "https://cdn.example.com/persist.webp";

    {
        let storage = SqliteCacheStorage::new(temp_file.path()).await.unwrap();
        let cache = storage.open("images").await.unwrap();
        cache
            .put_with_expiry(url, &Payload::ok(b"webp".to_vec(), Some("image/webp")), 42)
            .await
            .unwrap();
        drop(cache);
        storage.close().await;
    }

    // Second session: migrations are not re-applied and the entry is still there
    let storage = SqliteCacheStorage::new(temp_file.path()).await.unwrap();
    let cache = storage.open("images").await.unwrap();
    let entry = cache.get(url).await.unwrap().expect("entry persisted");
    assert_eq!(entry.payload.content_type.as_deref(), Some("image/webp"));
    assert_eq!(entry.expires_at_ms, 42);

    let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert_eq!(versions, 1);
    drop(cache);
    storage.close().await;
}

#[tokio::test]
async fn test_sqlite_non_success_status_round_trips() {
    let (storage, _file) = open_temp().await;
    let cache = storage.open("images").await.unwrap();
    let payload = Payload {
        body: b"not found".to_vec(),
        content_type: Some("text/plain".into()),
        status: 404,
    };
    cache
        .put_with_expiry("https://x/missing", &payload, 1)
        .await
        .unwrap();

    let entry = cache.get("https://x/missing").await.unwrap().unwrap();
    assert_eq!(entry.payload.status, 404);
    assert!(!entry.payload.is_success());
    drop(cache);
    storage.close().await;
}

/// Operations after the pool is closed surface as errors, not hangs or panics.
#[tokio::test]
async fn test_sqlite_closed_pool_returns_error() {
    let (storage, _file) = open_temp().await;
    let cache = storage.open("images").await.unwrap();

    storage.pool().close().await;

    let result = cache.get("https://x/a").await;
    assert!(
        matches!(result, Err(crate::Error::Database(_))),
        "get after close should fail with a database error, got: {:?}",
        result
    );
    assert!(storage.open("images").await.is_err());
}
