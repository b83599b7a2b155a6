//! Outgoing request model.
//!
//! A [`Request`] describes one logical call: what to send upstream, how long
//! the result may be cached ([`CacheDirectives`]), opaque caller labels and an
//! optional cancellation signal.
//!
//! ```
//! use std::time::Duration;
//! use fetchbox_core::Request;
//!
//! let request = Request::get("/users")
//!     .query("page", "2")
//!     .fresh_ttl(Duration::from_secs(600))
//!     .stale_ttl(Duration::from_secs(1800))
//!     .label("caller", "billing");
//!
//! assert_eq!(request.path(), "/users");
//! assert_eq!(request.directives().fresh_ttl, Some(Duration::from_secs(600)));
//! ```

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;

/// Per-call cache directives.
///
/// Unset fields fall back to the client's configured defaults. A stale TTL
/// shorter than the fresh TTL is raised to the fresh TTL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDirectives {
    /// How long a stored response is served without a network call.
    #[serde(default)]
    pub fresh_ttl: Option<Duration>,
    /// How long a stored response stays usable as a fallback when the live
    /// call fails, counted from the moment it was stored.
    #[serde(default)]
    pub stale_ttl: Option<Duration>,
}

/// A request issued through the cache.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
    directives: CacheDirectives,
    labels: Vec<(SmolStr, SmolStr)>,
    cancellation: Option<CancellationToken>,
}

impl Request {
    /// Creates a request with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            directives: CacheDirectives::default(),
            labels: Vec::new(),
            cancellation: None,
        }
    }

    /// Creates a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Appends a query parameter. Order of insertion is kept on the wire.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends a header value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Overrides the fresh TTL for this call.
    pub fn fresh_ttl(mut self, ttl: Duration) -> Self {
        self.directives.fresh_ttl = Some(ttl);
        self
    }

    /// Overrides the stale TTL for this call.
    pub fn stale_ttl(mut self, ttl: Duration) -> Self {
        self.directives.stale_ttl = Some(ttl);
        self
    }

    /// Returns the per-call cache directives.
    pub fn directives(&self) -> CacheDirectives {
        self.directives
    }

    /// Sets all cache directives at once.
    pub fn with_directives(mut self, directives: CacheDirectives) -> Self {
        self.directives = directives;
        self
    }

    /// Attaches an opaque caller label (recorded on the request span).
    pub fn label(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.labels.push((SmolStr::new(name), SmolStr::new(value)));
        self
    }

    /// Attaches a cancellation signal.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path, as given.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns query parameters in insertion order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the request body, if any.
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns the caller labels.
    pub fn labels(&self) -> &[(SmolStr, SmolStr)] {
        &self.labels
    }

    /// Returns the cancellation signal, if any.
    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Replaces the cancellation signal.
    pub fn set_cancellation(&mut self, token: Option<CancellationToken>) {
        self.cancellation = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_query_order() {
        let request = Request::get("/search").query("q", "rust").query("a", "1");
        assert_eq!(
            request.query_pairs(),
            &[
                ("q".to_string(), "rust".to_string()),
                ("a".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn directives_default_to_unset() {
        let request = Request::post("/items").body("payload");
        assert_eq!(request.directives(), CacheDirectives::default());
        assert_eq!(request.body_bytes().map(|b| b.as_ref()), Some(&b"payload"[..]));
    }
}
