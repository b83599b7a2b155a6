#![warn(missing_docs)]
//! # fetchbox-core
//!
//! Core traits and types for the fetchbox deduplicating HTTP cache.
//!
//! This crate defines the vocabulary shared by the orchestrator (`fetchbox`),
//! storage backends (`fetchbox-backend`, `fetchbox-moka`) and transports
//! (`fetchbox-reqwest`):
//!
//! - **Requests and responses** ([`Request`], [`Response`], [`CachedResponse`])
//! - **Cache keys** ([`CacheKey`], [`KeyPart`], [`KeyParts`]) and the
//!   [`Extractor`] chain that builds them
//! - **Cache entries** ([`CacheEntry`]) with fresh and stale deadlines
//! - **The transport seam** ([`Transport`])
//! - **The error taxonomy** ([`FetchError`] and its three kinds)
//!
//! ## Freshness
//!
//! Every stored entry carries two deadlines. Until `fresh_until` it is served
//! without touching the network. Between `fresh_until` and `stale_until` it is
//! only served when a live call fails. After `stale_until` it is never used.

pub mod clock;
pub mod context;
pub mod error;
pub mod extractor;
pub mod key;
pub mod request;
pub mod response;
pub mod transport;
pub mod value;

pub use clock::{Clock, SystemClock};
pub use context::{CacheContext, CacheStatus};
pub use error::{FetchError, HookError, RequestError, SharedError, TransportError};
pub use extractor::{DefaultExtractor, Extractor};
pub use key::{CacheKey, KeyPart, KeyParts};
pub use request::{CacheDirectives, Request};
pub use response::{CachedResponse, Response};
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use tokio_util::sync::CancellationToken;
pub use transport::Transport;
pub use value::{CacheEntry, CacheMeta, CacheState};

/// Raw byte data type used for serialized cache values.
/// Using `Bytes` provides efficient zero-copy cloning via reference counting.
pub type Raw = bytes::Bytes;
