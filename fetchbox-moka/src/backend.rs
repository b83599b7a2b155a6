//! Moka backend implementation.

use std::time::Duration;

use async_trait::async_trait;
use fetchbox_backend::format::{Format, JsonFormat};
use fetchbox_backend::{Backend, BackendError, BackendResult, CacheBackend, DeleteStatus};
use fetchbox_core::{CacheEntry, CacheKey, Raw};
use moka::future::Cache;

/// An entry as held by moka, together with the TTL it was written with.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The serialized entry.
    pub entry: CacheEntry<Raw>,
    /// Time to live requested by the writer.
    pub ttl: Option<Duration>,
}

/// In-memory cache backend powered by Moka.
///
/// `MokaBackend` provides a concurrent in-memory cache with automatic entry
/// expiration. Each entry lives for the TTL passed to
/// [`write`](Backend::write), which the orchestrator sets to the time left
/// until the entry's `stale_until`.
///
/// # Type Parameters
///
/// * `S` - Serialization format for cache values. Implements [`Format`].
///   Default: [`JsonFormat`].
///
/// # Examples
///
/// ```
/// use fetchbox_moka::MokaBackend;
/// use fetchbox_backend::format::BincodeFormat;
///
/// let backend = MokaBackend::builder()
///     .max_entries(10_000)
///     .value_format(BincodeFormat)
///     .build();
/// ```
///
/// # Caveats
///
/// - Data is **not persisted**; the cache is lost on process restart
/// - Data is **not shared** across processes
/// - Expiration is **best-effort**; the orchestrator still checks
///   `stale_until` on every read
#[derive(Clone)]
pub struct MokaBackend<S = JsonFormat>
where
    S: Format,
{
    pub(crate) cache: Cache<CacheKey, StoredEntry>,
    pub(crate) serializer: S,
    pub(crate) label: String,
    pub(crate) max_entry_bytes: Option<usize>,
}

impl<S> std::fmt::Debug for MokaBackend<S>
where
    S: Format,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("label", &self.label)
            .field("cache", &self.cache)
            .field("serializer", &std::any::type_name::<S>())
            .field("max_entry_bytes", &self.max_entry_bytes)
            .finish()
    }
}

impl MokaBackend<JsonFormat> {
    /// Creates a new builder for `MokaBackend`.
    ///
    /// Call [`max_entries`](crate::MokaBackendBuilder::max_entries) or
    /// [`max_bytes`](crate::MokaBackendBuilder::max_bytes) before `build()`.
    pub fn builder() -> crate::builder::MokaBackendBuilder<crate::builder::NoCapacity> {
        crate::builder::MokaBackendBuilder::new()
    }
}

impl<S: Format> MokaBackend<S> {
    /// Returns the underlying moka cache.
    pub fn cache(&self) -> &Cache<CacheKey, StoredEntry> {
        &self.cache
    }

    /// Approximate number of entries currently held.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl<S> Backend for MokaBackend<S>
where
    S: Format + Send + Sync,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheEntry<Raw>>> {
        Ok(self.cache.get(key).await.map(|stored| stored.entry))
    }

    async fn write(
        &self,
        key: &CacheKey,
        value: CacheEntry<Raw>,
        ttl: Option<Duration>,
    ) -> BackendResult<()> {
        if let Some(limit) = self.max_entry_bytes {
            let size = value.data().len();
            if size > limit {
                tracing::debug!(backend = %self.label, key = %key, size, limit, "entry rejected");
                return Err(BackendError::ValueTooLarge { size, limit });
            }
        }
        self.cache
            .insert(key.clone(), StoredEntry { entry: value, ttl })
            .await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        match self.cache.remove(key).await {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn value_format(&self) -> &dyn Format {
        &self.serializer
    }
}

impl<S> CacheBackend for MokaBackend<S> where S: Format + Send + Sync {}
