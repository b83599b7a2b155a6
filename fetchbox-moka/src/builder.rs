//! Builder for configuring [`MokaBackend`].

use std::mem::size_of;
use std::time::{Duration, Instant};

use fetchbox_backend::format::{Format, JsonFormat};
use fetchbox_core::CacheKey;
use moka::Expiry;
use moka::future::{Cache, CacheBuilder};
use moka::policy::EvictionPolicy;

use crate::backend::{MokaBackend, StoredEntry};

/// Expiration policy that applies the TTL each entry was written with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Expiration;

impl Expiry<CacheKey, StoredEntry> for Expiration {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // Moka's default keeps the old deadline; an overwrite must restart it.
        value.ttl
    }
}

/// Builder state before a size limit is chosen. `build()` does not exist
/// here.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Size limit counted in entries.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Size limit counted in approximate bytes.
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Configures a [`MokaBackend`]. Obtained from [`MokaBackend::builder`].
///
/// Pick one size limit, either [`max_entries`](Self::max_entries) or
/// [`max_bytes`](Self::max_bytes), before `build()` becomes callable.
///
/// ```
/// use fetchbox_moka::MokaBackend;
///
/// let backend = MokaBackend::builder()
///     .label("users")
///     .max_bytes(50_000_000)
///     .max_entry_bytes(1_000_000)
///     .build();
/// ```
pub struct MokaBackendBuilder<Cap, S = JsonFormat>
where
    S: Format,
{
    capacity: Cap,
    serializer: S,
    label: String,
    eviction_policy: Option<EvictionPolicy>,
    max_entry_bytes: Option<usize>,
}

impl MokaBackendBuilder<NoCapacity, JsonFormat> {
    /// Starts with JSON values, the `"moka"` label and no size limit.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            serializer: JsonFormat,
            label: "moka".to_owned(),
            eviction_policy: None,
            max_entry_bytes: None,
        }
    }
}

impl Default for MokaBackendBuilder<NoCapacity, JsonFormat> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MokaBackendBuilder<NoCapacity, S>
where
    S: Format,
{
    /// Caps the cache at `capacity` entries.
    pub fn max_entries(self, capacity: u64) -> MokaBackendBuilder<EntryCapacity, S> {
        MokaBackendBuilder {
            capacity: EntryCapacity(capacity),
            serializer: self.serializer,
            label: self.label,
            eviction_policy: self.eviction_policy,
            max_entry_bytes: self.max_entry_bytes,
        }
    }

    /// Caps the cache at roughly `bytes` of keys and serialized bodies.
    /// Each entry weighs its key and body lengths plus a fixed overhead.
    pub fn max_bytes(self, bytes: u64) -> MokaBackendBuilder<ByteCapacity, S> {
        MokaBackendBuilder {
            capacity: ByteCapacity(bytes),
            serializer: self.serializer,
            label: self.label,
            eviction_policy: self.eviction_policy,
            max_entry_bytes: self.max_entry_bytes,
        }
    }
}

impl<Cap, S> MokaBackendBuilder<Cap, S>
where
    S: Format,
{
    /// Name reported by [`Backend::name`](fetchbox_backend::Backend::name).
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Overrides the eviction policy.
    ///
    /// Entry limits default to TinyLFU. Byte limits default to LRU, since
    /// TinyLFU admission may refuse a heavy entry that eviction could fit.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Rejects serialized values larger than `bytes` with
    /// [`BackendError::ValueTooLarge`](fetchbox_backend::BackendError::ValueTooLarge).
    pub fn max_entry_bytes(mut self, bytes: usize) -> Self {
        self.max_entry_bytes = Some(bytes);
        self
    }

    /// Switches how stored responses are encoded, e.g. to
    /// [`BincodeFormat`](fetchbox_backend::format::BincodeFormat).
    pub fn value_format<NewS>(self, serializer: NewS) -> MokaBackendBuilder<Cap, NewS>
    where
        NewS: Format,
    {
        MokaBackendBuilder {
            capacity: self.capacity,
            serializer,
            label: self.label,
            eviction_policy: self.eviction_policy,
            max_entry_bytes: self.max_entry_bytes,
        }
    }
}

impl<S> MokaBackendBuilder<EntryCapacity, S>
where
    S: Format,
{
    /// Builds a backend that holds at most the configured number of entries.
    pub fn build(self) -> MokaBackend<S> {
        let policy = self
            .eviction_policy
            .unwrap_or_else(EvictionPolicy::tiny_lfu);
        let cache: Cache<CacheKey, StoredEntry> = CacheBuilder::new(self.capacity.0)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();

        MokaBackend {
            cache,
            serializer: self.serializer,
            label: self.label,
            max_entry_bytes: self.max_entry_bytes,
        }
    }
}

impl<S> MokaBackendBuilder<ByteCapacity, S>
where
    S: Format,
{
    /// Builds a backend whose entries are weighed against the byte budget.
    pub fn build(self) -> MokaBackend<S> {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let cache: Cache<CacheKey, StoredEntry> = CacheBuilder::new(self.capacity.0)
            .weigher(byte_weigher)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();

        MokaBackend {
            cache,
            serializer: self.serializer,
            label: self.label,
            max_entry_bytes: self.max_entry_bytes,
        }
    }
}

/// Key bytes plus body bytes plus the fixed struct sizes, saturated to `u32`.
pub(crate) fn byte_weigher(key: &CacheKey, value: &StoredEntry) -> u32 {
    let size = size_of::<CacheKey>() + key.len() + size_of::<StoredEntry>() + value.entry.data().len();
    size.min(u32::MAX as usize) as u32
}
