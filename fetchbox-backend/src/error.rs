//! Error types for backend operations.

use thiserror::Error;

use crate::format::FormatError;

/// Error type for backend operations.
///
/// This enum categorizes errors that can occur during cache backend interactions
/// into distinct groups for appropriate handling. None of them ever reach a
/// fetch caller: the orchestrator logs them and carries on without the cache.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Internal backend error, state or computation error.
    ///
    /// Any error not related to network interaction.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send + Sync>),

    /// Network interaction error.
    ///
    /// Errors occurring during communication with remote stores.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),

    /// Serialization or deserialization error.
    #[error(transparent)]
    FormatError(#[from] FormatError),

    /// The serialized entry exceeds the backend's per-entry limit.
    #[error("value of {size} bytes exceeds the {limit} byte entry limit")]
    ValueTooLarge {
        /// Size of the rejected entry.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
}
