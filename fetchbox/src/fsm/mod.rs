//! Finite state machine driving one cached fetch.
//!
//! Resolves the key, joins or owns the in-flight call, consults the cache,
//! runs the hooks around the transport, writes successful responses and falls
//! back to stale entries when the call fails.

mod future;
mod states;

pub use future::CacheFuture;
pub use states::{
    AwaitSharedFuture, ComputeKeyFuture, HandleFailureFuture, HandleResponseFuture,
    PollCacheFuture, PrepareRequestFuture, State, UpdateCacheFuture,
};
