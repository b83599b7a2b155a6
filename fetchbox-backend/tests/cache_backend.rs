//! Typed operations over a simple in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use fetchbox_backend::format::{BincodeFormat, Format, FormatTypeId};
use fetchbox_backend::{Backend, BackendError, BackendResult, CacheBackend, DeleteStatus};
use fetchbox_core::{CacheEntry, CacheKey, CachedResponse, Raw};

/// In-memory backend parameterised by value format.
#[derive(Clone)]
struct TestBackend {
    store: Arc<DashMap<CacheKey, (CacheEntry<Raw>, Option<Duration>)>>,
    format: Arc<dyn Format>,
}

impl TestBackend {
    fn new(format: impl Format + 'static) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            format: Arc::new(format),
        }
    }
}

#[async_trait]
impl Backend for TestBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry<Raw>>> {
        Ok(self.store.get(key).map(|v| v.0.clone()))
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: CacheEntry<Raw>,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        self.store.insert(key.clone(), (value, ttl));
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Ok(match self.store.remove(key) {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    fn name(&self) -> &str {
        "test"
    }

    fn value_format(&self) -> &dyn Format {
        self.format.as_ref()
    }
}

impl CacheBackend for TestBackend {}

fn entry() -> CacheEntry<CachedResponse> {
    let snapshot = CachedResponse {
        status: 200,
        headers: vec![("x-id".to_owned(), Bytes::from_static(b"7"))],
        body: Bytes::from_static(b"payload"),
    };
    CacheEntry::with_ttl(
        snapshot,
        Utc::now(),
        Duration::from_secs(60),
        Duration::from_secs(300),
    )
}

#[tokio::test]
async fn set_then_get_keeps_timestamps() {
    let backend = TestBackend::new(BincodeFormat);
    let key = CacheKey::from("users");
    let stored = entry();

    backend
        .set(&key, &stored, Some(Duration::from_secs(300)))
        .await
        .expect("set");
    let loaded = backend.get(&key).await.expect("get").expect("present");

    assert_eq!(loaded, stored);
    assert_eq!(backend.value_format().format_type_id(), FormatTypeId::Bincode);
    let ttl = backend.store.get(&key).map(|v| v.1);
    assert_eq!(ttl, Some(Some(Duration::from_secs(300))));
}

#[tokio::test]
async fn absent_key_is_none() {
    let backend = TestBackend::new(fetchbox_backend::JsonFormat);
    assert!(backend.get(&CacheKey::from("nope")).await.expect("get").is_none());
}

#[tokio::test]
async fn delete_reports_status() {
    let backend = TestBackend::new(fetchbox_backend::JsonFormat);
    let key = CacheKey::from("users");
    backend.set(&key, &entry(), None).await.expect("set");

    assert_eq!(backend.delete(&key).await.expect("delete"), DeleteStatus::Deleted(1));
    assert_eq!(backend.delete(&key).await.expect("delete"), DeleteStatus::Missing);
}

#[tokio::test]
async fn undecodable_value_is_a_format_error() {
    let backend = TestBackend::new(fetchbox_backend::JsonFormat);
    let key = CacheKey::from("corrupt");
    let garbage = CacheEntry::with_ttl(
        Bytes::from_static(b"\x00\x01"),
        Utc::now(),
        Duration::from_secs(1),
        Duration::from_secs(1),
    );
    backend.write(&key, garbage, None).await.expect("write");

    let err = backend.get(&key).await.unwrap_err();
    assert!(matches!(err, BackendError::FormatError(_)));
}

#[tokio::test]
async fn trait_objects_are_backends() {
    let backend: Arc<dyn Backend + Send + 'static> = Arc::new(TestBackend::new(BincodeFormat));
    let key = CacheKey::from("dyn");
    backend.set(&key, &entry(), None).await.expect("set");
    assert!(backend.get(&key).await.expect("get").is_some());
    assert_eq!(backend.name(), "test");
}
