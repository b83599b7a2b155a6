//! Cache status attached to every response.

/// Whether the response came from a fresh entry, the network, or the stale
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    /// Served from a fresh cache entry without a network call.
    Hit,
    /// Fetched live from upstream.
    #[default]
    Miss,
    /// Served from a stale entry because the live call failed.
    Stale,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Stale => "stale",
        }
    }
}

/// Context information about how a response was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheContext {
    /// Whether the request resulted in a cache hit, miss, or stale data.
    pub status: CacheStatus,
    /// `true` when this caller awaited another caller's in-flight call.
    pub shared: bool,
}
