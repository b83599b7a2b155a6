//! Response model and its storable snapshot.
//!
//! [`Response`] is what callers receive. [`CachedResponse`] is the
//! serializable snapshot written to backends; it drops the per-caller
//! [`CacheContext`] and keeps headers as raw name/value pairs so any serde
//! format can carry it.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

use crate::context::{CacheContext, CacheStatus};

/// A response returned through the cache.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    cache: CacheContext,
}

impl Response {
    /// Creates a live (uncached, unshared) response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Response {
            status,
            headers,
            body: body.into(),
            cache: CacheContext::default(),
        }
    }

    /// Creates a response with no headers.
    pub fn with_status(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, HeaderMap::new(), body)
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns mutable access to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consumes the response and returns the body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Returns how this response was produced.
    pub fn cache_context(&self) -> CacheContext {
        self.cache
    }

    /// `true` when served from a stored entry, fresh or stale.
    pub fn from_cache(&self) -> bool {
        self.cache.status != CacheStatus::Miss
    }

    /// `true` when served by the stale-on-error fallback.
    pub fn is_stale(&self) -> bool {
        self.cache.status == CacheStatus::Stale
    }

    /// `true` when this caller awaited another caller's in-flight call.
    pub fn is_shared(&self) -> bool {
        self.cache.shared
    }

    /// `true` for status codes the orchestrator treats as failures: every
    /// status from 400 up, including the nonstandard 6xx-9xx range.
    pub fn is_failure(&self) -> bool {
        self.status.as_u16() >= 400
    }

    /// Returns this response tagged with `status`.
    pub fn with_cache_status(mut self, status: CacheStatus) -> Self {
        self.cache.status = status;
        self
    }

    /// Returns this response tagged as delivered through a shared call.
    pub fn into_shared(mut self) -> Self {
        self.cache.shared = true;
        self
    }

    /// Takes a storable snapshot of status, headers and body.
    pub fn to_cached(&self) -> CachedResponse {
        CachedResponse {
            status: self.status.as_u16(),
            headers: self
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_owned(),
                        Bytes::copy_from_slice(value.as_bytes()),
                    )
                })
                .collect(),
            body: self.body.clone(),
        }
    }
}

/// Serializable snapshot of a [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Numeric status code.
    pub status: u16,
    /// Header names and raw values, in map iteration order.
    pub headers: Vec<(String, Bytes)>,
    /// Response body.
    pub body: Bytes,
}

impl CachedResponse {
    /// Rebuilds a [`Response`] tagged with `status`.
    ///
    /// Fails when the snapshot holds an invalid status code or header.
    pub fn into_response(self, status: CacheStatus) -> Result<Response, http::Error> {
        let code = StatusCode::from_u16(self.status)?;
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            let value = HeaderValue::from_bytes(&value)?;
            headers.append(name, value);
        }
        Ok(Response::new(code, headers, self.body).with_cache_status(status))
    }
}
