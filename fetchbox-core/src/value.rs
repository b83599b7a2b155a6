//! Cached value types with freshness metadata.
//!
//! This module provides types for wrapping cached data with the timestamps
//! that decide whether it can be served:
//!
//! - [`CacheEntry`] - Cached data with `stored_at`, `fresh_until` and `stale_until`
//! - [`CacheMeta`] - Just the metadata without the data
//!
//! ## Cache States
//!
//! The [`CacheEntry::cache_state`] method evaluates timestamps against `now`:
//!
//! - [`CacheState::Fresh`] - `now < fresh_until`; served without a network call
//! - [`CacheState::Stale`] - `fresh_until <= now < stale_until`; served only
//!   when the live call fails
//! - [`CacheState::Expired`] - `now >= stale_until`; never served
//!
//! ```
//! use std::time::Duration;
//! use chrono::Utc;
//! use fetchbox_core::{CacheEntry, CacheState};
//!
//! let now = Utc::now();
//! let entry = CacheEntry::with_ttl("data", now, Duration::from_secs(600), Duration::from_secs(1800));
//!
//! assert!(matches!(entry.clone().cache_state(now), CacheState::Fresh(_)));
//! let later = now + chrono::Duration::seconds(700);
//! assert!(matches!(entry.clone().cache_state(later), CacheState::Stale(_)));
//! let much_later = now + chrono::Duration::seconds(2000);
//! assert!(matches!(entry.cache_state(much_later), CacheState::Expired(_)));
//! ```

use std::mem::size_of;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Raw;

/// Freshness of a cache entry at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState<T> {
    /// Within the fresh window.
    Fresh(T),
    /// Past the fresh window, still usable as a fallback.
    Stale(T),
    /// Past the stale window.
    Expired(T),
}

/// A cached value with freshness metadata.
///
/// The constructors keep `fresh_until <= stale_until`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    data: T,
    stored_at: DateTime<Utc>,
    fresh_until: DateTime<Utc>,
    stale_until: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Creates an entry from explicit timestamps.
    ///
    /// A `stale_until` earlier than `fresh_until` is raised to `fresh_until`.
    pub fn new(
        data: T,
        stored_at: DateTime<Utc>,
        fresh_until: DateTime<Utc>,
        stale_until: DateTime<Utc>,
    ) -> Self {
        CacheEntry {
            data,
            stored_at,
            fresh_until,
            stale_until: stale_until.max(fresh_until),
        }
    }

    /// Creates an entry stored at `now` with the given windows.
    ///
    /// Both windows are counted from `now`; a stale window shorter than the
    /// fresh window is raised to it.
    pub fn with_ttl(data: T, now: DateTime<Utc>, fresh_ttl: Duration, stale_ttl: Duration) -> Self {
        Self::new(
            data,
            now,
            offset(now, fresh_ttl),
            offset(now, stale_ttl),
        )
    }

    /// Returns a reference to the cached data.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Returns when the entry was stored.
    #[inline]
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// Returns the end of the fresh window.
    #[inline]
    pub fn fresh_until(&self) -> DateTime<Utc> {
        self.fresh_until
    }

    /// Returns the end of the stale window.
    #[inline]
    pub fn stale_until(&self) -> DateTime<Utc> {
        self.stale_until
    }

    /// Returns the timestamps without the data.
    pub fn meta(&self) -> CacheMeta {
        CacheMeta {
            stored_at: self.stored_at,
            fresh_until: self.fresh_until,
            stale_until: self.stale_until,
        }
    }

    /// Consumes the entry and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Consumes the entry and returns metadata and data separately.
    pub fn into_parts(self) -> (CacheMeta, T) {
        (self.meta(), self.data)
    }

    /// Reassembles an entry from metadata and data.
    pub fn from_parts(meta: CacheMeta, data: T) -> Self {
        Self::new(data, meta.stored_at, meta.fresh_until, meta.stale_until)
    }

    /// Replaces the data, keeping the timestamps.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            data: f(self.data),
            stored_at: self.stored_at,
            fresh_until: self.fresh_until,
            stale_until: self.stale_until,
        }
    }

    /// `true` while the entry may be served as a fallback (`now < stale_until`).
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now < self.stale_until
    }

    /// Time left until `stale_until`, or `None` once the entry is expired.
    ///
    /// This is the TTL a backend should apply to the stored entry.
    pub fn ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.stale_until - now).to_std().ok().filter(|ttl| !ttl.is_zero())
    }

    /// Classifies the entry at `now`.
    pub fn cache_state(self, now: DateTime<Utc>) -> CacheState<Self> {
        if now >= self.stale_until {
            CacheState::Expired(self)
        } else if now >= self.fresh_until {
            CacheState::Stale(self)
        } else {
            CacheState::Fresh(self)
        }
    }
}

impl CacheEntry<Raw> {
    /// Returns the estimated memory usage of this entry in bytes.
    pub fn memory_size(&self) -> usize {
        size_of::<Self>() + self.data.len()
    }
}

/// Entry timestamps without the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    /// When the entry was stored.
    pub stored_at: DateTime<Utc>,
    /// End of the fresh window.
    pub fresh_until: DateTime<Utc>,
    /// End of the stale window.
    pub stale_until: DateTime<Utc>,
}

fn offset(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
