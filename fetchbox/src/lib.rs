#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # fetchbox
//!
//! A caching HTTP client layer. Concurrent identical requests share a single
//! network call, successful responses are stored with a fresh and a stale
//! window, and a failed call is answered from a stale entry when one is still
//! usable.
//!
//! ```ignore
//! use std::time::Duration;
//! use fetchbox::{FetchClient, Request};
//! use fetchbox_moka::MokaBackend;
//! use fetchbox_reqwest::ReqwestTransport;
//!
//! let config: fetchbox::config::ClientConfig = serde_saphyr::from_str(&yaml)?;
//! let client = FetchClient::builder()
//!     .backend(MokaBackend::builder().max_entries(10_000).build())
//!     .transport(ReqwestTransport::from_config(&config.transport)?)
//!     .config(config)
//!     .build();
//!
//! let request = Request::get("/users/42")
//!     .fresh_ttl(Duration::from_secs(600))
//!     .stale_ttl(Duration::from_secs(1800));
//! let response = client.fetch(request).await?;
//! if response.is_stale() {
//!     tracing::warn!("upstream is down, serving stale user");
//! }
//! ```
//!
//! ## Crates
//!
//! - `fetchbox-core`: requests, responses, keys, entries and the transport seam
//! - `fetchbox-backend`: storage traits and value formats
//! - `fetchbox-moka`: in-memory backend
//! - `fetchbox-reqwest`: transport over `reqwest`

/// Backend-related re-exports.
///
/// Gives access to the [`Backend`](fetchbox_backend::Backend) trait for
/// implementing custom storage.
pub mod backend;

/// The client and its builder.
pub mod client;

/// Request deduplication.
///
/// While a call for a key is in flight, later callers for the same key wait
/// for its outcome instead of issuing their own. See
/// [`InFlightRegistry`](concurrency::InFlightRegistry).
pub mod concurrency;

pub mod config;

/// Finite state machine for one cached fetch.
pub mod fsm;

/// Caller extension points around the network call.
pub mod hooks;

/// Metrics collection.
///
/// When the `metrics` feature is enabled, this module records counters for
/// hits, misses, stale fallbacks, shared outcomes and failures, plus a
/// request latency histogram.
pub mod metrics;

/// Per-request cache lifetimes.
pub mod policy;

pub use client::{FetchClient, FetchClientBuilder, NotSet};
pub use fsm::CacheFuture;
pub use hooks::{Hooks, NoopHooks};

pub use fetchbox_core::{
    CacheContext, CacheDirectives, CacheKey, CacheStatus, CancellationToken, Clock,
    DefaultExtractor, Extractor, FetchError, HookError, KeyPart, KeyParts, Request, RequestError,
    Response, SystemClock, Transport, TransportError,
};

/// Extractors for cache key generation.
///
/// Re-exports the extractor chain from `fetchbox-core`.
pub mod extractor {
    pub use fetchbox_core::extractor::*;
}
