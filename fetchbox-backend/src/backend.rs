use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use fetchbox_core::{CacheEntry, CacheKey, CachedResponse, Raw};

use crate::{
    BackendError, DeleteStatus,
    format::{Format, JsonFormat},
};

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Raw storage of serialized cache entries.
///
/// `write` stores a whole entry, so readers never observe a partially
/// written value. Concurrent writes to one key are last-writer-wins.
#[async_trait]
pub trait Backend: Sync + Send {
    /// Reads the entry stored under `key`.
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry<Raw>>>;

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// `ttl` is the time until the entry's `stale_until`; backends that can
    /// expire entries on their own should drop it after that.
    async fn write(
        &self,
        key: &CacheKey,
        value: CacheEntry<Raw>,
        ttl: Option<Duration>,
    ) -> BackendResult<()>;

    /// Removes the entry stored under `key`.
    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus>;

    /// Returns the name of this backend for logs and metrics labels.
    fn name(&self) -> &str {
        "backend"
    }

    /// Returns the format used to encode response snapshots.
    fn value_format(&self) -> &dyn Format {
        &JsonFormat
    }
}

#[async_trait]
impl Backend for &dyn Backend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry<Raw>>> {
        (*self).read(key).await
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: CacheEntry<Raw>,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        (*self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (*self).remove(key).await
    }

    fn name(&self) -> &str {
        (*self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (*self).value_format()
    }
}

#[async_trait]
impl Backend for Box<dyn Backend> {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry<Raw>>> {
        (**self).read(key).await
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: CacheEntry<Raw>,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

#[async_trait]
impl Backend for Arc<dyn Backend + Send + 'static> {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry<Raw>>> {
        (**self).read(key).await
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: CacheEntry<Raw>,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

/// High-level cache backend trait with typed operations.
///
/// This trait provides typed `get`, `set`, and `delete` operations that
/// encode and decode [`CachedResponse`] snapshots with the backend's
/// [`value_format`](Backend::value_format). The timestamps of the entry are
/// stored alongside the encoded bytes untouched.
pub trait CacheBackend: Backend {
    /// Reads and decodes the entry stored under `key`.
    fn get(
        &self,
        key: &CacheKey,
    ) -> impl Future<Output = BackendResult<Option<CacheEntry<CachedResponse>>>> + Send {
        async move {
            let Some(entry) = self.read(key).await? else {
                return Ok(None);
            };
            let (meta, raw) = entry.into_parts();
            tracing::trace!(backend = self.name(), bytes = raw.len(), "backend read");
            let data = self.value_format().deserialize(&raw)?;
            Ok(Some(CacheEntry::from_parts(meta, data)))
        }
    }

    /// Encodes and stores `value` under `key`.
    fn set(
        &self,
        key: &CacheKey,
        value: &CacheEntry<CachedResponse>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = BackendResult<()>> + Send {
        async move {
            let raw = self.value_format().serialize(value.data())?;
            tracing::trace!(backend = self.name(), bytes = raw.len(), "backend write");
            let entry = CacheEntry::from_parts(value.meta(), raw);
            self.write(key, entry, ttl).await
        }
    }

    /// Removes the entry stored under `key`.
    fn delete(&self, key: &CacheKey) -> impl Future<Output = BackendResult<DeleteStatus>> + Send {
        async move { self.remove(key).await }
    }
}

// Explicit CacheBackend implementations for trait objects
impl CacheBackend for &dyn Backend {}

impl CacheBackend for Box<dyn Backend> {}

impl CacheBackend for Arc<dyn Backend + Send + 'static> {}
