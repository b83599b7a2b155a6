//! The caching, deduplicating client.
//!
//! [`FetchClient`] wires a storage backend, a transport, a key extractor and
//! optional hooks together. Every [`fetch`](FetchClient::fetch) returns a
//! [`CacheFuture`] that drives the request through the state machine in
//! [`fsm`](crate::fsm).
//!
//! ```ignore
//! let client = FetchClient::builder()
//!     .backend(MokaBackend::builder().max_entries(10_000).build())
//!     .transport(ReqwestTransport::from_config(&config.transport)?)
//!     .config(config)
//!     .build();
//!
//! let response = client
//!     .fetch(Request::get("/users/42").fresh_ttl(Duration::from_secs(600)))
//!     .await?;
//! ```

use std::fmt;
use std::sync::Arc;

use fetchbox_backend::{BackendResult, CacheBackend, DeleteStatus};
use fetchbox_core::{
    CacheKey, Clock, DefaultExtractor, Extractor, Request, SystemClock, Transport,
};
use tracing::debug;

use crate::{
    concurrency::{ConcurrencyManager, InFlightRegistry, NoopConcurrencyManager},
    config::ClientConfig,
    fsm::CacheFuture,
    hooks::{HookDispatcher, Hooks},
};

/// Caching HTTP client with request deduplication and stale-on-error
/// fallback.
///
/// Cheap to clone when the transport is: every clone shares the same backend,
/// in-flight registry and configuration.
pub struct FetchClient<B, T, E = DefaultExtractor> {
    backend: Arc<B>,
    transport: T,
    extractor: Arc<E>,
    hooks: HookDispatcher,
    concurrency: Arc<dyn ConcurrencyManager>,
    clock: Arc<dyn Clock>,
    config: Arc<ClientConfig>,
}

impl<B, T, E> Clone for FetchClient<B, T, E>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            transport: self.transport.clone(),
            extractor: Arc::clone(&self.extractor),
            hooks: self.hooks.clone(),
            concurrency: Arc::clone(&self.concurrency),
            clock: Arc::clone(&self.clock),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B, T, E> fmt::Debug for FetchClient<B, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchClient")
            .field("hooks", &self.hooks)
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FetchClient<NotSet, NotSet, DefaultExtractor> {
    /// Creates a new client builder.
    pub fn builder() -> FetchClientBuilder<NotSet, NotSet, DefaultExtractor> {
        FetchClientBuilder::new()
    }
}

impl<B, T, E> FetchClient<B, T, E>
where
    B: CacheBackend + Send + Sync + 'static,
    T: Transport + Clone,
    E: Extractor,
{
    /// Starts a cached fetch.
    ///
    /// Nothing happens until the returned future is polled. Dropping it
    /// before completion cancels the network call.
    pub fn fetch(&self, request: Request) -> CacheFuture<B, T, E> {
        CacheFuture::new(
            Arc::clone(&self.backend),
            self.transport.clone(),
            Arc::clone(&self.extractor),
            self.hooks.clone(),
            Arc::clone(&self.concurrency),
            Arc::clone(&self.clock),
            Arc::clone(&self.config),
            request,
        )
    }

    /// Computes the key the extractor assigns to `request`.
    ///
    /// Ignores [`Hooks::cache_key`]; use
    /// [`resolve_cache_key`](Self::resolve_cache_key) to include it.
    pub fn cache_key(&self, request: &Request) -> CacheKey {
        self.extractor
            .get(request)
            .into_cache_key(&self.config.key.prefix, self.config.key.version)
    }

    /// Computes the key `fetch` would use for `request`, honoring the key
    /// override hook.
    pub async fn resolve_cache_key(&self, request: &Request) -> CacheKey {
        match self.hooks.cache_key(request).await {
            Some(key) => key,
            None => self.cache_key(request),
        }
    }

    /// Removes the stored entry for `request`.
    pub async fn invalidate(&self, request: &Request) -> BackendResult<DeleteStatus> {
        let key = self.resolve_cache_key(request).await;
        self.invalidate_key(&key).await
    }

    /// Removes the stored entry under `key`.
    pub async fn invalidate_key(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        let status = self.backend.delete(key).await?;
        debug!(key = key.as_str(), ?status, "cache entry invalidated");
        Ok(status)
    }
}

impl<B, T, E> FetchClient<B, T, E> {
    /// Configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Storage backend shared by every clone of this client.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

/// Marker type for unset builder fields.
///
/// When you see `NotSet` in a compiler error, it means you haven't called
/// [`FetchClientBuilder::backend`] or [`FetchClientBuilder::transport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSet;

/// Builder for [`FetchClient`].
///
/// The backend and the transport are required and tracked in the type; the
/// rest falls back to defaults.
pub struct FetchClientBuilder<B, T, E> {
    backend: B,
    transport: T,
    extractor: E,
    hooks: HookDispatcher,
    concurrency: Option<Arc<dyn ConcurrencyManager>>,
    clock: Arc<dyn Clock>,
    config: ClientConfig,
}

impl FetchClientBuilder<NotSet, NotSet, DefaultExtractor> {
    /// Creates a builder with the default extractor, no hooks and default
    /// configuration.
    pub fn new() -> Self {
        Self {
            backend: NotSet,
            transport: NotSet,
            extractor: DefaultExtractor::new(),
            hooks: HookDispatcher::default(),
            concurrency: None,
            clock: Arc::new(SystemClock),
            config: ClientConfig::default(),
        }
    }
}

impl Default for FetchClientBuilder<NotSet, NotSet, DefaultExtractor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, T, E> FetchClientBuilder<B, T, E> {
    /// Sets the storage backend.
    pub fn backend<NB: CacheBackend>(self, backend: NB) -> FetchClientBuilder<NB, T, E> {
        FetchClientBuilder {
            backend,
            transport: self.transport,
            extractor: self.extractor,
            hooks: self.hooks,
            concurrency: self.concurrency,
            clock: self.clock,
            config: self.config,
        }
    }

    /// Sets the transport that performs network calls.
    pub fn transport<NT: Transport>(self, transport: NT) -> FetchClientBuilder<B, NT, E> {
        FetchClientBuilder {
            backend: self.backend,
            transport,
            extractor: self.extractor,
            hooks: self.hooks,
            concurrency: self.concurrency,
            clock: self.clock,
            config: self.config,
        }
    }

    /// Replaces the key extractor.
    pub fn extractor<NE: Extractor>(self, extractor: NE) -> FetchClientBuilder<B, T, NE> {
        FetchClientBuilder {
            backend: self.backend,
            transport: self.transport,
            extractor,
            hooks: self.hooks,
            concurrency: self.concurrency,
            clock: self.clock,
            config: self.config,
        }
    }

    /// Installs request lifecycle hooks.
    pub fn hooks(mut self, hooks: impl Hooks + 'static) -> Self {
        self.hooks = HookDispatcher::new(Arc::new(hooks));
        self
    }

    /// Replaces the clock used for freshness decisions.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the concurrency manager built from
    /// [`InFlightConfig`](crate::config::InFlightConfig).
    pub fn concurrency_manager(mut self, manager: impl ConcurrencyManager + 'static) -> Self {
        self.concurrency = Some(Arc::new(manager));
        self
    }
}

impl<B, T, E> FetchClientBuilder<B, T, E>
where
    B: CacheBackend,
    T: Transport,
    E: Extractor,
{
    /// Builds the client.
    pub fn build(self) -> FetchClient<B, T, E> {
        let concurrency: Arc<dyn ConcurrencyManager> = match self.concurrency {
            Some(manager) => manager,
            None if self.config.in_flight.enabled => {
                Arc::new(InFlightRegistry::new(self.config.in_flight.capacity))
            }
            None => Arc::new(NoopConcurrencyManager),
        };
        FetchClient {
            backend: Arc::new(self.backend),
            transport: self.transport,
            extractor: Arc::new(self.extractor),
            hooks: self.hooks,
            concurrency,
            clock: self.clock,
            config: Arc::new(self.config),
        }
    }
}
