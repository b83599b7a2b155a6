//! Cache key types and construction.
//!
//! This module provides types for building and representing cache keys:
//!
//! - [`CacheKey`] - The rendered key used for deduplication and storage
//! - [`KeyPart`] - A single name/value component of a cache key
//! - [`KeyParts`] - Accumulator for key parts during extraction
//!
//! ## Format
//!
//! Keys built from parts follow this format:
//! `{prefix}:v{version}:name1=value1&name2=value2`
//!
//! - Prefix is omitted if empty
//! - Version is omitted if zero
//! - `%`, `&`, `=` and `:` inside names and values are percent-escaped, so two
//!   different part lists never render to the same key
//!
//! ```
//! use fetchbox_core::{CacheKey, KeyPart};
//!
//! let key = CacheKey::new("api", 1, vec![KeyPart::new("id", Some("42"))]);
//! assert_eq!(key.as_str(), "api:v1:id=42");
//!
//! let key = CacheKey::new("", 0, vec![
//!     KeyPart::new("method", Some("GET")),
//!     KeyPart::new("cached", None::<&str>),
//! ]);
//! assert_eq!(key.as_str(), "method=GET&cached");
//! ```
//!
//! The rendering contains no process-dependent data, so the same request maps
//! to the same key across restarts and across processes sharing a backend.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A cache key identifying both an in-flight call and a stored entry.
///
/// `CacheKey` wraps a [`SmolStr`], so cloning never copies the key text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(SmolStr);

impl CacheKey {
    /// Renders a key from a prefix, a version and ordered parts.
    pub fn new(prefix: impl AsRef<str>, version: u32, parts: Vec<KeyPart>) -> Self {
        let prefix = prefix.as_ref();
        let mut rendered = String::new();
        if !prefix.is_empty() {
            escape_into(&mut rendered, prefix);
            rendered.push(':');
        }
        if version > 0 {
            // Writing to a String cannot fail.
            let _ = write!(rendered, "v{version}:");
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                rendered.push('&');
            }
            escape_into(&mut rendered, part.key());
            if let Some(value) = part.value() {
                rendered.push('=');
                escape_into(&mut rendered, value);
            }
        }
        CacheKey(SmolStr::new(rendered))
    }

    /// Uses `key` verbatim.
    ///
    /// This is how caller-supplied overrides become keys; the caller is
    /// responsible for keeping distinct requests on distinct keys.
    pub fn raw(key: impl AsRef<str>) -> Self {
        CacheKey(SmolStr::new(key))
    }

    /// Returns the rendered key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the length of the rendered key in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        CacheKey::raw(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        CacheKey::raw(key)
    }
}

fn escape_into(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            ':' => out.push_str("%3A"),
            other => out.push(other),
        }
    }
}

/// A single component of a cache key.
///
/// A part has a name and an optional value. Parts without a value render as
/// the bare name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyPart {
    key: SmolStr,
    value: Option<SmolStr>,
}

impl KeyPart {
    /// Creates a key part.
    pub fn new<K: AsRef<str>, V: AsRef<str>>(key: K, value: Option<V>) -> Self {
        KeyPart {
            key: SmolStr::new(key),
            value: value.map(SmolStr::new),
        }
    }

    /// Returns the part name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the part value, if any.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.key, value),
            None => f.write_str(&self.key),
        }
    }
}

/// Ordered key parts accumulated by an [`Extractor`](crate::Extractor) chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyParts {
    parts: Vec<KeyPart>,
}

impl KeyParts {
    /// Creates an empty set of parts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single part.
    pub fn push(&mut self, part: KeyPart) {
        self.parts.push(part);
    }

    /// Appends several parts, keeping their order.
    pub fn append(&mut self, parts: impl IntoIterator<Item = KeyPart>) {
        self.parts.extend(parts);
    }

    /// Returns an iterator over the accumulated parts.
    pub fn iter(&self) -> impl Iterator<Item = &KeyPart> {
        self.parts.iter()
    }

    /// Renders the accumulated parts into a [`CacheKey`].
    pub fn into_cache_key(self, prefix: impl AsRef<str>, version: u32) -> CacheKey {
        CacheKey::new(prefix, version, self.parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_prefix_and_version() {
        let parts = vec![KeyPart::new("path", Some("/users"))];
        assert_eq!(CacheKey::new("api", 2, parts.clone()).as_str(), "api:v2:path=/users");
        assert_eq!(CacheKey::new("", 2, parts.clone()).as_str(), "v2:path=/users");
        assert_eq!(CacheKey::new("api", 0, parts).as_str(), "api:path=/users");
    }

    #[test]
    fn escaping_prevents_collisions() {
        let joined = CacheKey::new("", 0, vec![KeyPart::new("a", Some("1&b=2"))]);
        let split = CacheKey::new(
            "",
            0,
            vec![KeyPart::new("a", Some("1")), KeyPart::new("b", Some("2"))],
        );
        assert_ne!(joined, split);
        assert_eq!(joined.as_str(), "a=1%26b%3D2");
    }

    #[test]
    fn raw_key_is_verbatim() {
        let key = CacheKey::raw("users:42&x=y");
        assert_eq!(key.as_str(), "users:42&x=y");
        assert_eq!(key, CacheKey::from("users:42&x=y"));
    }
}
