//! Backend traits and utilities for cache storage.
//!
//! This module re-exports types from `fetchbox-backend` for implementing
//! custom cache storage backends:
//!
//! - `Backend` - Core trait for raw byte storage
//! - `CacheBackend` - Extended trait with typed response operations
//! - `BackendError` - Error type for backend operations
//! - `DeleteStatus` - Result of cache entry deletion
//!
//! ## Built-in Backends
//!
//! | Backend | Crate | Use Case |
//! |---------|-------|----------|
//! | Moka | [`fetchbox-moka`] | In-memory, single instance |
//!
//! [`fetchbox-moka`]: https://docs.rs/fetchbox-moka

pub use fetchbox_backend::{
    Backend, BackendError, BackendResult, CacheBackend, DeleteStatus, format,
};
