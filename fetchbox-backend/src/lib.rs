#![warn(missing_docs)]
//! Traits and structs for fetchbox backend interaction.
//!
//! If you want to implement your own storage, you are in the right place:
//! implement the raw [`Backend`] trait, then opt into the typed
//! [`CacheBackend`] operations with an empty `impl CacheBackend for ... {}`.
//!
//! Backends store [`CacheEntry<Raw>`](fetchbox_core::CacheEntry) values, whole
//! entries at a time. Serialization of the response snapshot happens in
//! [`CacheBackend`] through the backend's [`Format`](format::Format).
mod backend;
mod error;
pub mod format;

pub use backend::{Backend, BackendResult, CacheBackend};
pub use error::BackendError;
pub use format::{BincodeFormat, Format, FormatError, JsonFormat};

/// Status of deleting result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
