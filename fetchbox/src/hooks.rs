//! Caller extension points.
//!
//! Implement [`Hooks`] to adjust keys, requests and responses. Every method
//! has a default, so implementations override only what they need:
//!
//! ```
//! use async_trait::async_trait;
//! use fetchbox::hooks::Hooks;
//! use fetchbox_core::{HookError, Request};
//! use http::{HeaderValue, header::AUTHORIZATION};
//!
//! struct Auth(HeaderValue);
//!
//! #[async_trait]
//! impl Hooks for Auth {
//!     async fn on_request(&self, request: &mut Request) -> Result<(), HookError> {
//!         request.headers_mut().insert(AUTHORIZATION, self.0.clone());
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Hooks run in this order: [`cache_key`](Hooks::cache_key), then (for the
//! caller that owns the network call) [`on_request`](Hooks::on_request),
//! [`on_response`](Hooks::on_response) and, on failure,
//! [`on_error`](Hooks::on_error). A failing `on_request` or `on_response`
//! ends the call with [`FetchError::Hook`] for the owner and all waiters,
//! without stale fallback and without `on_error`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use fetchbox_core::{CacheKey, FetchError, HookError, Request, Response};
use tracing::{Instrument, debug_span};

/// Caller-supplied hooks around a cached fetch.
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Overrides the computed cache key. The returned string is used verbatim.
    async fn cache_key(&self, _request: &Request) -> Option<String> {
        None
    }

    /// Runs before the transport call. Only headers and the cancellation
    /// signal are meant to be changed here.
    async fn on_request(&self, _request: &mut Request) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs on every response the transport produced, before its status is
    /// classified.
    async fn on_response(
        &self,
        _request: &Request,
        response: Response,
    ) -> Result<Response, HookError> {
        Ok(response)
    }

    /// Observes a failed call before stale fallback is attempted.
    async fn on_error(&self, _request: &Request, _error: &FetchError) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl Hooks for NoopHooks {}

/// Runs [`Hooks`] inside tracing spans and maps their results.
#[derive(Clone)]
pub struct HookDispatcher {
    hooks: Arc<dyn Hooks>,
}

impl fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDispatcher").finish_non_exhaustive()
    }
}

impl Default for HookDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(NoopHooks))
    }
}

impl HookDispatcher {
    /// Wraps `hooks`.
    pub fn new(hooks: Arc<dyn Hooks>) -> Self {
        HookDispatcher { hooks }
    }

    /// Returns the key override, if any.
    pub async fn cache_key(&self, request: &Request) -> Option<CacheKey> {
        self.hooks
            .cache_key(request)
            .instrument(debug_span!("fetchbox.hook", hook = "cache_key"))
            .await
            .map(CacheKey::raw)
    }

    /// Runs the pre-request hook.
    pub async fn on_request(&self, request: &mut Request) -> Result<(), FetchError> {
        self.hooks
            .on_request(request)
            .instrument(debug_span!("fetchbox.hook", hook = "on_request"))
            .await
            .map_err(FetchError::from)
    }

    /// Runs the post-response hook.
    pub async fn on_response(
        &self,
        request: &Request,
        response: Response,
    ) -> Result<Response, FetchError> {
        self.hooks
            .on_response(request, response)
            .instrument(debug_span!("fetchbox.hook", hook = "on_response"))
            .await
            .map_err(FetchError::from)
    }

    /// Runs the error hook.
    pub async fn on_error(&self, request: &Request, error: &FetchError) {
        self.hooks
            .on_error(request, error)
            .instrument(debug_span!("fetchbox.hook", hook = "on_error", error = error.kind()))
            .await
    }
}
