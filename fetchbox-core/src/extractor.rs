//! Cache key extraction from requests.
//!
//! Extractors pull components from a [`Request`] and produce [`KeyParts`].
//! They are chained with the builder pattern, each link appending its parts
//! after those of the link it wraps:
//!
//! ```
//! use fetchbox_core::extractor::{Method, PathExtractor, QueryExtractor, BodyExtractor};
//! use fetchbox_core::{Extractor, Request};
//!
//! let extractor = Method::new().path().query().body();
//! let key = extractor
//!     .get(&Request::get("/users//42/").query("b", "2").query("a", "1"))
//!     .into_cache_key("", 0);
//!
//! assert_eq!(key.as_str(), "method=GET&path=/users/42&query.a=1&query.b=2");
//! ```
//!
//! | Extractor | Part |
//! |-----------|------|
//! | [`Method`] | `method=GET` |
//! | [`Path`] | `path=/normalized/path` |
//! | [`Query`] | `query.{name}={value}`, sorted by name then value |
//! | [`Body`] | `body={sha256 hex}`, only when a body is present |
//!
//! [`DefaultExtractor`] is exactly that chain. Extraction is synchronous and
//! side-effect free: it runs on every request, cache hits included.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::{KeyPart, KeyParts, Request};

/// Trait for extracting cache key components from a request.
///
/// # Blanket Implementations
///
/// This trait is implemented for:
/// - `&T` where `T: Extractor`
/// - `Box<T>` where `T: Extractor`
/// - `Arc<T>` where `T: Extractor`
pub trait Extractor: Send + Sync {
    /// Extract cache key components from `request`.
    fn get(&self, request: &Request) -> KeyParts;
}

impl<T> Extractor for &T
where
    T: Extractor + ?Sized,
{
    fn get(&self, request: &Request) -> KeyParts {
        (**self).get(request)
    }
}

impl<T> Extractor for Box<T>
where
    T: Extractor + ?Sized,
{
    fn get(&self, request: &Request) -> KeyParts {
        self.as_ref().get(request)
    }
}

impl<T> Extractor for Arc<T>
where
    T: Extractor + ?Sized,
{
    fn get(&self, request: &Request) -> KeyParts {
        self.as_ref().get(request)
    }
}

/// Base extractor that produces no parts.
///
/// Appears as the innermost type in extractor chains started with
/// [`Method::new`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralExtractor;

impl Extractor for NeutralExtractor {
    fn get(&self, _request: &Request) -> KeyParts {
        KeyParts::new()
    }
}

/// Extracts the HTTP method as `method={METHOD}`.
#[derive(Debug, Clone, Copy)]
pub struct Method<E> {
    inner: E,
}

impl Method<NeutralExtractor> {
    /// Starts an extractor chain with the method.
    pub fn new() -> Self {
        Method {
            inner: NeutralExtractor,
        }
    }
}

impl Default for Method<NeutralExtractor> {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for adding method extraction to an extractor chain.
pub trait MethodExtractor: Sized {
    /// Adds the HTTP method to the chain.
    fn method(self) -> Method<Self>;
}

impl<E: Extractor> MethodExtractor for E {
    fn method(self) -> Method<Self> {
        Method { inner: self }
    }
}

impl<E: Extractor> Extractor for Method<E> {
    fn get(&self, request: &Request) -> KeyParts {
        let mut parts = self.inner.get(request);
        parts.push(KeyPart::new("method", Some(request.method().as_str())));
        parts
    }
}

/// Extracts the normalized path as `path=/a/b`.
///
/// Repeated slashes collapse, a leading slash is added and a trailing slash
/// is dropped (except for the root path).
#[derive(Debug, Clone, Copy)]
pub struct Path<E> {
    inner: E,
}

/// Extension trait for adding path extraction to an extractor chain.
pub trait PathExtractor: Sized {
    /// Adds the normalized path to the chain.
    fn path(self) -> Path<Self>;
}

impl<E: Extractor> PathExtractor for E {
    fn path(self) -> Path<Self> {
        Path { inner: self }
    }
}

impl<E: Extractor> Extractor for Path<E> {
    fn get(&self, request: &Request) -> KeyParts {
        let mut parts = self.inner.get(request);
        parts.push(KeyPart::new("path", Some(normalize_path(request.path()))));
        parts
    }
}

/// Normalizes a request path for key purposes.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Extracts query parameters as `query.{name}={value}` parts.
///
/// Parameters are sorted by name and then value, so insertion order never
/// changes the key. Repeated names are all kept.
#[derive(Debug, Clone)]
pub struct Query<E> {
    inner: E,
    only: Option<Vec<String>>,
}

/// Extension trait for adding query extraction to an extractor chain.
pub trait QueryExtractor: Sized {
    /// Adds all query parameters to the chain.
    fn query(self) -> Query<Self>;

    /// Adds only the named query parameters to the chain.
    fn query_params<I, S>(self, names: I) -> Query<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;
}

impl<E: Extractor> QueryExtractor for E {
    fn query(self) -> Query<Self> {
        Query {
            inner: self,
            only: None,
        }
    }

    fn query_params<I, S>(self, names: I) -> Query<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query {
            inner: self,
            only: Some(names.into_iter().map(Into::into).collect()),
        }
    }
}

impl<E: Extractor> Extractor for Query<E> {
    fn get(&self, request: &Request) -> KeyParts {
        let mut parts = self.inner.get(request);
        let mut pairs: Vec<&(String, String)> = request
            .query_pairs()
            .iter()
            .filter(|(name, _)| {
                self.only
                    .as_ref()
                    .is_none_or(|only| only.iter().any(|wanted| wanted == name))
            })
            .collect();
        pairs.sort();
        parts.append(
            pairs
                .into_iter()
                .map(|(name, value)| KeyPart::new(format!("query.{name}"), Some(value))),
        );
        parts
    }
}

/// Extracts a SHA-256 digest of the body as `body={hex}`.
///
/// Adds nothing when the request has no body, so bodiless requests share
/// keys with their method/path/query alone.
#[derive(Debug, Clone, Copy)]
pub struct Body<E> {
    inner: E,
}

/// Extension trait for adding body hashing to an extractor chain.
pub trait BodyExtractor: Sized {
    /// Adds the body digest to the chain.
    fn body(self) -> Body<Self>;
}

impl<E: Extractor> BodyExtractor for E {
    fn body(self) -> Body<Self> {
        Body { inner: self }
    }
}

impl<E: Extractor> Extractor for Body<E> {
    fn get(&self, request: &Request) -> KeyParts {
        let mut parts = self.inner.get(request);
        if let Some(body) = request.body_bytes() {
            let digest = Sha256::digest(body);
            parts.push(KeyPart::new("body", Some(hex::encode(digest))));
        }
        parts
    }
}

/// Method, normalized path, sorted query and body digest.
#[derive(Debug, Clone)]
pub struct DefaultExtractor {
    chain: Body<Query<Path<Method<NeutralExtractor>>>>,
}

impl DefaultExtractor {
    /// Creates the default extractor chain.
    pub fn new() -> Self {
        DefaultExtractor {
            chain: Method::new().path().query().body(),
        }
    }
}

impl Default for DefaultExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for DefaultExtractor {
    fn get(&self, request: &Request) -> KeyParts {
        self.chain.get(request)
    }
}
