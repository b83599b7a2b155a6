use std::time::Duration;

use fetchbox_core::CacheDirectives;

use crate::config::CacheDefaults;

/// Cache lifetimes in force for one request.
///
/// Built from the request's [`CacheDirectives`] over the client's
/// [`CacheDefaults`]:
///
/// - `fresh` is the request's fresh TTL, else the default TTL
/// - `stale` is the request's stale TTL, else the default stale TTL, else
///   `fresh`; never shorter than `fresh`
///
/// ```
/// use std::time::Duration;
/// use fetchbox::config::CacheDefaults;
/// use fetchbox::policy::ResolvedPolicy;
/// use fetchbox_core::CacheDirectives;
///
/// let defaults = CacheDefaults { ttl: Duration::from_secs(60), stale: None };
/// let directives = CacheDirectives { fresh_ttl: Some(Duration::from_secs(600)), stale_ttl: None };
/// let policy = ResolvedPolicy::resolve(directives, &defaults);
/// assert_eq!(policy.stale, Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    /// Fresh window.
    pub fresh: Duration,
    /// Stale window, counted from when the entry is stored.
    pub stale: Duration,
}

impl ResolvedPolicy {
    /// Resolves per-request directives against client defaults.
    pub fn resolve(directives: CacheDirectives, defaults: &CacheDefaults) -> Self {
        let fresh = directives.fresh_ttl.unwrap_or(defaults.ttl);
        let stale = directives
            .stale_ttl
            .or(defaults.stale)
            .unwrap_or(fresh)
            .max(fresh);
        ResolvedPolicy { fresh, stale }
    }

    /// Whether a fresh entry may answer the request without a network call.
    pub fn lookup_enabled(&self) -> bool {
        !self.fresh.is_zero()
    }

    /// Whether a successful response is written to the backend.
    ///
    /// A zero fresh window turns caching off for the request, whatever the
    /// stale window. Deduplication still applies.
    pub fn stores(&self) -> bool {
        !self.fresh.is_zero()
    }

    /// Whether a failed call may be answered from a stale entry.
    ///
    /// Only entries already in the backend are used, so with a zero fresh
    /// window this serves what earlier cached requests stored under the key.
    pub fn stale_fallback(&self) -> bool {
        !self.stale.is_zero()
    }
}
