use std::{
    future::Future,
    pin::{Pin, pin},
    sync::Arc,
    task::{self, Poll},
    time::Instant,
};

use fetchbox_backend::CacheBackend;
use fetchbox_core::{
    CacheEntry, CacheKey, CacheState, CacheStatus, CancellationToken, Clock, Extractor,
    FetchError, Request, RequestError, Response, Transport, TransportError,
};
use futures::{
    FutureExt, ready,
    future::{Either, select},
};
use pin_project::pin_project;
use tracing::{Span, debug, field, warn};

use crate::{
    concurrency::{ConcurrencyDecision, ConcurrencyManager, InFlightPermit, PendingResult},
    config::ClientConfig,
    fsm::{
        State,
        states::{AwaitSharedFuture, StateProj},
    },
    hooks::HookDispatcher,
    metrics,
    policy::ResolvedPolicy,
};

const POLL_AFTER_READY_ERROR: &str = "CacheFuture can't be polled after finishing";
const REQUEST_TAKEN_ERROR: &str = "Request already taken from CacheFuture";
const CACHE_KEY_ERROR: &str = "CacheKey used before it was computed";

/// Future driving one cached fetch to completion.
///
/// Created by [`FetchClient::fetch`](crate::FetchClient::fetch). Dropping it
/// before completion cancels the network call and wakes any callers sharing
/// it with [`TransportError::Cancelled`].
#[pin_project(project = CacheFutureProj)]
pub struct CacheFuture<B, T, E>
where
    T: Transport,
{
    transport: T,
    backend: Arc<B>,
    extractor: Arc<E>,
    hooks: HookDispatcher,
    concurrency: Arc<dyn ConcurrencyManager>,
    clock: Arc<dyn Clock>,
    config: Arc<ClientConfig>,
    request: Option<Request>,
    cache_key: Option<CacheKey>,
    policy: ResolvedPolicy,
    permit: Option<InFlightPermit>,
    span: Span,
    started: Instant,
    #[pin]
    state: State<T::Future>,
}

impl<B, T, E> CacheFuture<B, T, E>
where
    T: Transport,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        backend: Arc<B>,
        transport: T,
        extractor: Arc<E>,
        hooks: HookDispatcher,
        concurrency: Arc<dyn ConcurrencyManager>,
        clock: Arc<dyn Clock>,
        config: Arc<ClientConfig>,
        request: Request,
    ) -> Self {
        let policy = ResolvedPolicy::resolve(request.directives(), &config.cache);
        let span = tracing::info_span!(
            "fetchbox.request",
            method = %request.method(),
            path = %request.path(),
            key = field::Empty,
        );
        CacheFuture {
            transport,
            backend,
            extractor,
            hooks,
            concurrency,
            clock,
            config,
            request: Some(request),
            cache_key: None,
            policy,
            permit: None,
            span,
            started: Instant::now(),
            state: State::Initial,
        }
    }
}

impl<B, T, E> Future for CacheFuture<B, T, E>
where
    B: CacheBackend + Send + Sync + 'static,
    T: Transport,
    E: Extractor,
{
    type Output = Result<Response, FetchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        let span = this.span.clone();
        let _entered = span.enter();

        loop {
            let state = match this.state.as_mut().project() {
                StateProj::Initial => {
                    let request = this.request.take().expect(REQUEST_TAKEN_ERROR);
                    debug!(
                        labels = ?request.labels(),
                        fresh = ?this.policy.fresh,
                        stale = ?this.policy.stale,
                        "fetch started"
                    );
                    let hooks = this.hooks.clone();
                    let key_future = Box::pin(async move {
                        let key = hooks.cache_key(&request).await;
                        (request, key)
                    });
                    State::ComputeKey { key_future }
                }
                StateProj::ComputeKey { key_future } => {
                    let (request, key_override) = ready!(key_future.poll(cx));
                    let key = key_override.unwrap_or_else(|| {
                        this.extractor
                            .get(&request)
                            .into_cache_key(&this.config.key.prefix, this.config.key.version)
                    });
                    span.record("key", key.as_str());
                    *this.request = Some(request);
                    *this.cache_key = Some(key);
                    State::CheckInFlight
                }
                StateProj::CheckInFlight => {
                    let key = this.cache_key.as_ref().expect(CACHE_KEY_ERROR);
                    match this.concurrency.check(key) {
                        ConcurrencyDecision::Await(pending) => {
                            debug!("joining in-flight call");
                            let cancellation = this
                                .request
                                .as_ref()
                                .and_then(|request| request.cancellation_token().cloned());
                            State::AwaitShared {
                                shared: await_shared(pending, cancellation),
                            }
                        }
                        ConcurrencyDecision::Proceed(permit) => {
                            *this.permit = Some(permit);
                            if this.policy.lookup_enabled() {
                                let backend = this.backend.clone();
                                let key = key.clone();
                                State::PollCache {
                                    poll_cache: Box::pin(async move { backend.get(&key).await }),
                                }
                            } else {
                                prepare_request(this.hooks, this.request)
                            }
                        }
                    }
                }
                StateProj::AwaitShared { shared } => {
                    let outcome = ready!(shared.poll(cx));
                    State::Response {
                        outcome: Some(outcome.map(Response::into_shared)),
                    }
                }
                StateProj::PollCache { poll_cache } => {
                    let cached = match ready!(poll_cache.poll(cx)) {
                        Ok(cached) => cached,
                        Err(err) => {
                            warn!(backend = this.backend.name(), error = %err, "cache read failed, treating as miss");
                            metrics::record_backend_read_error(this.backend.name());
                            None
                        }
                    };
                    match cached.map(|entry| entry.cache_state(this.clock.now())) {
                        Some(CacheState::Fresh(entry)) => {
                            match entry.into_inner().into_response(CacheStatus::Hit) {
                                Ok(response) => {
                                    debug!("fresh cache hit");
                                    State::Response {
                                        outcome: Some(Ok(response)),
                                    }
                                }
                                Err(err) => {
                                    warn!(error = %err, "cached response is invalid, treating as miss");
                                    prepare_request(this.hooks, this.request)
                                }
                            }
                        }
                        Some(CacheState::Stale(_) | CacheState::Expired(_)) => {
                            debug!("cached entry is no longer fresh");
                            prepare_request(this.hooks, this.request)
                        }
                        None => {
                            debug!("cache miss");
                            prepare_request(this.hooks, this.request)
                        }
                    }
                }
                StateProj::PrepareRequest { prepare } => {
                    let (request, prepared) = ready!(prepare.poll(cx));
                    match prepared {
                        Ok(()) => {
                            let cancelled = request
                                .cancellation_token()
                                .cloned()
                                .map(|token| token.cancelled_owned().boxed());
                            let transport_future = this.transport.call(request.clone());
                            *this.request = Some(request);
                            State::PollTransport {
                                transport_future,
                                cancelled,
                            }
                        }
                        Err(err) => {
                            debug!(error = %err, "pre-request hook failed");
                            *this.request = Some(request);
                            State::Response {
                                outcome: Some(Err(err)),
                            }
                        }
                    }
                }
                StateProj::PollTransport {
                    transport_future,
                    cancelled,
                } => {
                    let result = match transport_future.poll(cx) {
                        Poll::Ready(result) => result,
                        Poll::Pending => match cancelled.as_mut().map(|c| c.as_mut().poll(cx)) {
                            Some(Poll::Ready(())) => {
                                debug!("request cancelled while in flight");
                                Err(TransportError::Cancelled)
                            }
                            _ => return Poll::Pending,
                        },
                    };
                    match result {
                        Ok(response) => {
                            let request = this.request.take().expect(REQUEST_TAKEN_ERROR);
                            let hooks = this.hooks.clone();
                            State::HandleResponse {
                                post: Box::pin(async move {
                                    let response = hooks.on_response(&request, response).await;
                                    (request, response)
                                }),
                            }
                        }
                        Err(err) => {
                            debug!(error = %err, "transport failed");
                            metrics::record_transport_failure();
                            handle_failure(this.hooks, this.request, err.into())
                        }
                    }
                }
                StateProj::HandleResponse { post } => {
                    let (request, result) = ready!(post.poll(cx));
                    match result {
                        Err(err) => {
                            debug!(error = %err, "post-response hook failed");
                            *this.request = Some(request);
                            State::Response {
                                outcome: Some(Err(err)),
                            }
                        }
                        Ok(response) if response.is_failure() => {
                            debug!(status = %response.status(), "upstream responded with failure status");
                            let error = RequestError::new(request.clone(), response);
                            *this.request = Some(request);
                            handle_failure(this.hooks, this.request, error.into())
                        }
                        Ok(response) => {
                            *this.request = Some(request);
                            let response = response.with_cache_status(CacheStatus::Miss);
                            if this.policy.stores() {
                                let entry = CacheEntry::with_ttl(
                                    response.to_cached(),
                                    this.clock.now(),
                                    this.policy.fresh,
                                    this.policy.stale,
                                );
                                let ttl = Some(this.policy.stale);
                                let backend = this.backend.clone();
                                let key = this.cache_key.clone().expect(CACHE_KEY_ERROR);
                                State::UpdateCache {
                                    update_cache: Box::pin(async move {
                                        backend.set(&key, &entry, ttl).await
                                    }),
                                    response: Some(response),
                                }
                            } else {
                                State::Response {
                                    outcome: Some(Ok(response)),
                                }
                            }
                        }
                    }
                }
                StateProj::UpdateCache {
                    update_cache,
                    response,
                } => {
                    if let Err(err) = ready!(update_cache.poll(cx)) {
                        warn!(backend = this.backend.name(), error = %err, "cache write failed");
                        metrics::record_backend_write_error(this.backend.name());
                    }
                    State::Response {
                        outcome: Some(Ok(response.take().expect(POLL_AFTER_READY_ERROR))),
                    }
                }
                StateProj::HandleFailure { on_error, error } => {
                    let request = ready!(on_error.poll(cx));
                    *this.request = Some(request);
                    let error = error.take().expect(POLL_AFTER_READY_ERROR);
                    if this.policy.stale_fallback() && error.allows_stale_fallback() {
                        let backend = this.backend.clone();
                        let key = this.cache_key.clone().expect(CACHE_KEY_ERROR);
                        State::PollStale {
                            poll_stale: Box::pin(async move { backend.get(&key).await }),
                            error: Some(error),
                        }
                    } else {
                        State::Response {
                            outcome: Some(Err(error)),
                        }
                    }
                }
                StateProj::PollStale { poll_stale, error } => {
                    let result = ready!(poll_stale.poll(cx));
                    let error = error.take().expect(POLL_AFTER_READY_ERROR);
                    let now = this.clock.now();
                    let outcome = match result {
                        Ok(Some(entry)) if entry.is_usable(now) => {
                            match entry.into_inner().into_response(CacheStatus::Stale) {
                                Ok(response) => {
                                    debug!(error = %error, "serving stale entry after failure");
                                    Ok(response)
                                }
                                Err(err) => {
                                    warn!(error = %err, "stale entry is invalid");
                                    Err(error)
                                }
                            }
                        }
                        Ok(_) => Err(error),
                        Err(err) => {
                            warn!(backend = this.backend.name(), error = %err, "stale lookup failed");
                            metrics::record_backend_read_error(this.backend.name());
                            Err(error)
                        }
                    };
                    State::Response {
                        outcome: Some(outcome),
                    }
                }
                StateProj::Response { outcome } => {
                    let mut outcome = outcome.take().expect(POLL_AFTER_READY_ERROR);
                    if let Some(permit) = this.permit.take() {
                        outcome = permit.complete(outcome);
                    }
                    metrics::record_outcome(&outcome, this.started.elapsed());
                    match &outcome {
                        Ok(response) => debug!(
                            status = response.cache_context().status.as_str(),
                            shared = response.is_shared(),
                            "fetch finished"
                        ),
                        Err(err) => debug!(error = %err, kind = err.kind(), "fetch failed"),
                    }
                    return Poll::Ready(outcome);
                }
            };
            debug!("{:?}", &state);
            this.state.set(state);
        }
    }
}

fn prepare_request<F>(hooks: &HookDispatcher, request: &mut Option<Request>) -> State<F> {
    let mut request = request.take().expect(REQUEST_TAKEN_ERROR);
    let hooks = hooks.clone();
    State::PrepareRequest {
        prepare: Box::pin(async move {
            let prepared = hooks.on_request(&mut request).await;
            (request, prepared)
        }),
    }
}

fn handle_failure<F>(
    hooks: &HookDispatcher,
    request: &mut Option<Request>,
    error: FetchError,
) -> State<F> {
    let request = request.take().expect(REQUEST_TAKEN_ERROR);
    let hooks = hooks.clone();
    let observed = error.clone();
    State::HandleFailure {
        on_error: Box::pin(async move {
            hooks.on_error(&request, &observed).await;
            request
        }),
        error: Some(error),
    }
}

fn await_shared(
    pending: PendingResult,
    cancellation: Option<CancellationToken>,
) -> AwaitSharedFuture {
    match cancellation {
        None => pending.boxed(),
        Some(token) => async move {
            let cancelled = pin!(token.cancelled_owned());
            match select(pending, cancelled).await {
                Either::Left((outcome, _)) => outcome,
                Either::Right(((), _)) => Err(TransportError::Cancelled.into()),
            }
        }
        .boxed(),
    }
}
