use std::fmt::Debug;

use fetchbox_backend::BackendResult;
use fetchbox_core::{CacheEntry, CacheKey, CachedResponse, FetchError, Request, Response};
use futures::future::BoxFuture;
use pin_project::pin_project;

use crate::concurrency::SharedOutcome;

/// Future that resolves the key override hook and hands the request back.
pub type ComputeKeyFuture = BoxFuture<'static, (Request, Option<CacheKey>)>;
/// Future that reads the backend.
pub type PollCacheFuture = BoxFuture<'static, BackendResult<Option<CacheEntry<CachedResponse>>>>;
/// Future that runs the pre-request hook and hands the request back.
pub type PrepareRequestFuture = BoxFuture<'static, (Request, Result<(), FetchError>)>;
/// Future that runs the post-response hook and hands the request back.
pub type HandleResponseFuture = BoxFuture<'static, (Request, Result<Response, FetchError>)>;
/// Future that writes the backend.
pub type UpdateCacheFuture = BoxFuture<'static, BackendResult<()>>;
/// Future that runs the error hook and hands the request back.
pub type HandleFailureFuture = BoxFuture<'static, Request>;
/// Future that awaits a shared outcome (or this caller's cancellation).
pub type AwaitSharedFuture = BoxFuture<'static, SharedOutcome>;

#[allow(missing_docs)]
#[pin_project(project = StateProj)]
pub enum State<F> {
    /// Nothing has happened yet.
    Initial,
    /// Running the key override hook.
    ComputeKey {
        #[pin]
        key_future: ComputeKeyFuture,
    },
    /// Key known; consulting the in-flight registry.
    CheckInFlight,
    /// Another caller owns the call; waiting for its outcome.
    AwaitShared {
        #[pin]
        shared: AwaitSharedFuture,
    },
    /// Owner looking up a fresh entry.
    PollCache {
        #[pin]
        poll_cache: PollCacheFuture,
    },
    /// Running the pre-request hook.
    PrepareRequest {
        #[pin]
        prepare: PrepareRequestFuture,
    },
    /// Network call in progress.
    PollTransport {
        #[pin]
        transport_future: F,
        cancelled: Option<BoxFuture<'static, ()>>,
    },
    /// Running the post-response hook.
    HandleResponse {
        #[pin]
        post: HandleResponseFuture,
    },
    /// Writing a successful response to the backend.
    UpdateCache {
        #[pin]
        update_cache: UpdateCacheFuture,
        response: Option<Response>,
    },
    /// Running the error hook.
    HandleFailure {
        #[pin]
        on_error: HandleFailureFuture,
        error: Option<FetchError>,
    },
    /// Looking for a stale entry to answer a failed call.
    PollStale {
        #[pin]
        poll_stale: PollCacheFuture,
        error: Option<FetchError>,
    },
    /// Final state with the outcome.
    Response { outcome: Option<SharedOutcome> },
}

impl<F> Debug for State<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Initial => f.write_str("State::Initial"),
            State::ComputeKey { .. } => f.write_str("State::ComputeKey"),
            State::CheckInFlight => f.write_str("State::CheckInFlight"),
            State::AwaitShared { .. } => f.write_str("State::AwaitShared"),
            State::PollCache { .. } => f.write_str("State::PollCache"),
            State::PrepareRequest { .. } => f.write_str("State::PrepareRequest"),
            State::PollTransport { .. } => f.write_str("State::PollTransport"),
            State::HandleResponse { .. } => f.write_str("State::HandleResponse"),
            State::UpdateCache { .. } => f.write_str("State::UpdateCache"),
            State::HandleFailure { .. } => f.write_str("State::HandleFailure"),
            State::PollStale { .. } => f.write_str("State::PollStale"),
            State::Response { .. } => f.write_str("State::Response"),
        }
    }
}
