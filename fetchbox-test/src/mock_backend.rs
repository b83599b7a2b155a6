use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use fetchbox_backend::{Backend, BackendError, BackendResult, CacheBackend, DeleteStatus};
use fetchbox_core::{CacheEntry, CacheKey, Raw};

/// Operation counts of a [`MockBackend`]. Failed operations are counted too.
#[derive(Debug, Default)]
pub struct BackendCounters {
    reads: AtomicUsize,
    writes: AtomicUsize,
    removes: AtomicUsize,
    injected_failures: AtomicUsize,
}

impl BackendCounters {
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    /// Operations that returned an injected error.
    pub fn failure_count(&self) -> usize {
        self.injected_failures.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory backend that counts operations and can be told to fail.
///
/// Clones share storage, counters and failure switches.
#[derive(Clone, Debug, Default)]
pub struct MockBackend {
    pub entries: Arc<DashMap<CacheKey, CacheEntry<Raw>>>,
    pub ttls: Arc<DashMap<CacheKey, Option<Duration>>>,
    pub counters: Arc<BackendCounters>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail with a connection error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail with a connection error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn cache_entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns the stored entry for `key`, bypassing counters.
    pub fn raw_entry(&self, key: &CacheKey) -> Option<CacheEntry<Raw>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the TTL of the last write to `key`.
    pub fn last_ttl(&self, key: &CacheKey) -> Option<Option<Duration>> {
        self.ttls.get(key).map(|ttl| *ttl.value())
    }

    fn injected(&self, op: &'static str) -> BackendError {
        BackendCounters::bump(&self.counters.injected_failures);
        BackendError::ConnectionError(Box::new(std::io::Error::other(format!(
            "injected {op} failure"
        ))))
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry<Raw>>> {
        BackendCounters::bump(&self.counters.reads);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(self.injected("read"));
        }
        Ok(self.raw_entry(key))
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: CacheEntry<Raw>,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        BackendCounters::bump(&self.counters.writes);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(self.injected("write"));
        }
        self.entries.insert(key.clone(), value);
        self.ttls.insert(key.clone(), ttl);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        BackendCounters::bump(&self.counters.removes);
        self.ttls.remove(key);
        Ok(match self.entries.remove(key) {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl CacheBackend for MockBackend {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn injected_failures_are_counted() {
        let backend = MockBackend::new();
        let key = CacheKey::raw("k");
        let entry = CacheEntry::with_ttl(
            Raw::from_static(b"v"),
            Utc::now(),
            Duration::from_secs(1),
            Duration::from_secs(2),
        );

        backend.fail_writes(true);
        assert!(backend.write(&key, entry.clone(), None).await.is_err());
        backend.fail_writes(false);
        backend.write(&key, entry, None).await.unwrap();

        assert_eq!(backend.counters.write_count(), 2);
        assert_eq!(backend.counters.failure_count(), 1);
        assert_eq!(backend.cache_entry_count(), 1);
    }
}
