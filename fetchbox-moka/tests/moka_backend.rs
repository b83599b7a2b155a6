//! Expiration, eviction and size limits of the moka backend.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use fetchbox_backend::{Backend, BackendError, CacheBackend, DeleteStatus};
use fetchbox_core::{CacheEntry, CacheKey, CachedResponse, KeyPart};
use fetchbox_moka::{MokaBackend, MokaBackendBuilder};

fn make_key(id: u32) -> CacheKey {
    CacheKey::new("test", 1, vec![KeyPart::new("id", Some(id.to_string()))])
}

fn make_value(size: usize) -> CacheEntry<Bytes> {
    CacheEntry::with_ttl(
        Bytes::from(vec![0u8; size]),
        Utc::now(),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    )
}

#[tokio::test]
async fn max_bytes_evicts_beyond_budget() {
    // Each entry weighs its 1000 data bytes plus well under 300 bytes of overhead.
    let backend = MokaBackendBuilder::default().max_bytes(3 * 1300).build();

    for i in 1..=3 {
        backend.write(&make_key(i), make_value(1000), None).await.unwrap();
    }
    backend.cache().run_pending_tasks().await;
    for i in 1..=3 {
        assert!(backend.read(&make_key(i)).await.unwrap().is_some(), "entry {i} fits");
    }

    backend.write(&make_key(4), make_value(1000), None).await.unwrap();
    backend.cache().run_pending_tasks().await;

    let mut count = 0;
    for i in 1..=4 {
        if backend.read(&make_key(i)).await.unwrap().is_some() {
            count += 1;
        }
    }
    assert_eq!(count, 3, "one entry is evicted to stay within budget");
}

#[tokio::test]
async fn entries_expire_after_write_ttl() {
    let backend = MokaBackend::builder().max_entries(100).build();
    let key = make_key(1);

    backend
        .write(&key, make_value(10), Some(Duration::from_millis(100)))
        .await
        .unwrap();
    assert!(backend.read(&key).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(backend.read(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn overwrite_restarts_ttl() {
    let backend = MokaBackend::builder().max_entries(100).build();
    let key = make_key(1);

    backend
        .write(&key, make_value(10), Some(Duration::from_millis(150)))
        .await
        .unwrap();
    backend
        .write(&key, make_value(20), Some(Duration::from_secs(60)))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    let entry = backend.read(&key).await.unwrap().expect("new TTL applies");
    assert_eq!(entry.data().len(), 20);
}

#[tokio::test]
async fn oversized_values_are_rejected() {
    let backend = MokaBackend::builder()
        .max_entries(100)
        .max_entry_bytes(64)
        .build();

    let err = backend
        .write(&make_key(1), make_value(65), None)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::ValueTooLarge { size: 65, limit: 64 }));
    assert!(backend.read(&make_key(1)).await.unwrap().is_none());

    backend.write(&make_key(2), make_value(64), None).await.unwrap();
    assert!(backend.read(&make_key(2)).await.unwrap().is_some());
}

#[tokio::test]
async fn typed_roundtrip_and_delete() {
    let backend = MokaBackend::builder()
        .max_entries(100)
        .value_format(fetchbox_backend::BincodeFormat)
        .label("users")
        .build();
    let key = make_key(7);
    let snapshot = CachedResponse {
        status: 200,
        headers: Vec::new(),
        body: Bytes::from_static(b"{}"),
    };
    let entry = CacheEntry::with_ttl(
        snapshot,
        Utc::now(),
        Duration::from_secs(10),
        Duration::from_secs(20),
    );

    backend.set(&key, &entry, entry.ttl(Utc::now())).await.unwrap();
    assert_eq!(backend.get(&key).await.unwrap(), Some(entry));
    assert_eq!(backend.name(), "users");

    assert_eq!(backend.delete(&key).await.unwrap(), DeleteStatus::Deleted(1));
    assert_eq!(backend.delete(&key).await.unwrap(), DeleteStatus::Missing);
}
