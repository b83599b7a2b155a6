use std::future::Future;

use crate::{Request, Response, TransportError};

/// Trait for performing the actual network call.
/// This trait is client-agnostic and can be implemented for any async HTTP stack.
///
/// A transport returns `Ok` whenever upstream produced a response, whatever
/// its status; classifying `>= 400` as a failure is the orchestrator's job.
/// It returns `Err` only when no response exists.
///
/// # Examples
///
/// ```rust
/// use std::future::Ready;
/// use fetchbox_core::{Request, Response, Transport, TransportError};
/// use http::StatusCode;
///
/// #[derive(Clone)]
/// struct Echo;
///
/// impl Transport for Echo {
///     type Future = Ready<Result<Response, TransportError>>;
///
///     fn call(&mut self, request: Request) -> Self::Future {
///         std::future::ready(Ok(Response::with_status(StatusCode::OK, request.path().to_owned())))
///     }
/// }
/// ```
pub trait Transport {
    /// The future that resolves to the response
    type Future: Future<Output = Result<Response, TransportError>> + Send;

    /// Send `request` upstream.
    fn call(&mut self, request: Request) -> Self::Future;
}
