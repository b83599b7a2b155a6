#![warn(missing_docs)]
//! In-memory [`Backend`](fetchbox_backend::Backend) for fetchbox, built on
//! [moka](https://docs.rs/moka)'s async cache.
//!
//! Entries expire on their own once their stale window closes, and the cache
//! is bounded either by entry count or by an approximate byte budget:
//!
//! ```
//! use fetchbox_moka::MokaBackend;
//!
//! let by_count = MokaBackend::builder().max_entries(10_000).build();
//! let by_size = MokaBackend::builder().max_bytes(64 * 1024 * 1024).build();
//! ```

mod backend;
mod builder;

pub use backend::{MokaBackend, StoredEntry};
pub use builder::{ByteCapacity, EntryCapacity, MokaBackendBuilder, NoCapacity};
pub use moka::policy::EvictionPolicy;
