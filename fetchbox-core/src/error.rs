//! Error taxonomy for cached fetches.
//!
//! Callers only ever see a [`FetchError`], which is one of:
//!
//! - [`RequestError`] - upstream answered with a status `>= 400`
//! - [`TransportError`] - no response: connection failure, timeout, cancellation
//! - [`HookError`] - caller-supplied hook code failed
//!
//! Every error is `Clone` because one outcome is broadcast to all callers
//! sharing an in-flight call. Library errors are kept as [`SharedError`]
//! sources rather than exposed as their own types.

use std::sync::Arc;

use thiserror::Error;

use crate::{Request, Response};

/// Reference-counted error source, clonable across waiters.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Top-level error returned by a cached fetch.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Upstream responded with a failure status.
    #[error(transparent)]
    Request(Box<RequestError>),
    /// The call did not produce a response.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A hook failed.
    #[error(transparent)]
    Hook(#[from] HookError),
}

impl FetchError {
    /// `true` for errors that may be answered from a stale entry.
    ///
    /// Hook failures are caller bugs, not upstream trouble, and always
    /// propagate.
    pub fn allows_stale_fallback(&self) -> bool {
        !matches!(self, FetchError::Hook(_))
    }

    /// Returns the upstream response carried by a [`RequestError`].
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchError::Request(err) => Some(&err.response),
            _ => None,
        }
    }

    /// Returns a short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Request(_) => "request",
            FetchError::Transport(_) => "transport",
            FetchError::Hook(_) => "hook",
        }
    }
}

impl From<RequestError> for FetchError {
    fn from(err: RequestError) -> Self {
        FetchError::Request(Box::new(err))
    }
}

/// Upstream completed the call with a failure status.
#[derive(Debug, Clone, Error)]
#[error("upstream responded with status {}", .response.status())]
pub struct RequestError {
    /// The request as sent, after the pre-request hook.
    pub request: Request,
    /// The failed response, after the post-response hook.
    pub response: Response,
}

impl RequestError {
    /// Creates a request error.
    pub fn new(request: Request, response: Response) -> Self {
        RequestError { request, response }
    }
}

/// The call failed before a response was available.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not connect to upstream.
    #[error("connection failed: {0}")]
    Connect(SharedError),
    /// The call exceeded its deadline.
    #[error("request timed out")]
    Timeout,
    /// The call was cancelled by its cancellation signal or torn down.
    #[error("request cancelled")]
    Cancelled,
    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Other(SharedError),
}

impl TransportError {
    /// Wraps a connection failure.
    pub fn connect<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TransportError::Connect(Arc::new(err))
    }

    /// Wraps any other transport failure.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TransportError::Other(Arc::new(err))
    }

    /// `true` for [`TransportError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

/// Caller-supplied hook code failed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
    #[source]
    source: Option<SharedError>,
}

impl HookError {
    /// Creates a hook error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        HookError {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a hook error wrapping an underlying error.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HookError {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
