//! Client configuration.
//!
//! Every field has a default, so an empty document is a valid configuration.
//! Durations use humantime notation (`"500ms"`, `"30s"`, `"10m"`):
//!
//! ```yaml
//! in_flight:
//!   capacity: 4096
//! cache:
//!   ttl: 10m
//!   stale: 30m
//! key:
//!   prefix: users-api
//!   version: 2
//! transport:
//!   base_url: https://users.internal
//!   timeout: 5s
//! ```
//!
//! Loading the document (files, environment) is left to the application.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Request deduplication.
    pub in_flight: InFlightConfig,
    /// Default cache lifetimes.
    pub cache: CacheDefaults,
    /// Cache key rendering.
    pub key: KeyConfig,
    /// Transport settings, read by transport adapters.
    pub transport: TransportConfig,
}

/// Request deduplication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InFlightConfig {
    /// When `false`, every caller makes its own network call.
    pub enabled: bool,
    /// Maximum number of distinct keys tracked in flight at once.
    pub capacity: NonZeroUsize,
}

impl Default for InFlightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Cache lifetimes used when a request does not set its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheDefaults {
    /// How long a stored response is served without a network call.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// How long a stored response stays usable as a fallback, counted from
    /// when it was stored. Defaults to `ttl`.
    #[serde(with = "humantime_serde")]
    pub stale: Option<Duration>,
}

impl Default for CacheDefaults {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            stale: None,
        }
    }
}

/// Cache key rendering settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Namespace prepended to every computed key.
    pub prefix: String,
    /// Bump to orphan every previously stored entry.
    pub version: u32,
}

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Total deadline for one call.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Deadline for establishing a connection.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Base URL that request paths are joined onto.
    pub base_url: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            base_url: None,
        }
    }
}
