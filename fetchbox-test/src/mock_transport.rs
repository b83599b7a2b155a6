use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use fetchbox_core::{Request, Response, Transport, TransportError};
use futures::FutureExt;
use futures::future::BoxFuture;
use http::StatusCode;

/// What a [`MockTransport`] call resolves to.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Upstream answers with this response.
    Respond(Response),
    /// The call fails without a response.
    Fail(TransportError),
}

impl Reply {
    /// A response with `status` and `body`.
    pub fn status(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Reply::Respond(Response::with_status(status, body))
    }

    /// A `200 OK` response with `body`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::status(StatusCode::OK, body)
    }
}

#[derive(Debug)]
struct Inner {
    script: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Reply>,
    latency: Mutex<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Request>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Scripted transport.
///
/// Each call pops the next scripted [`Reply`]; once the script is exhausted
/// the fallback reply (`200 ok` unless changed) is used. Every call is counted
/// and the request it received is recorded. Clones share all state.
#[derive(Debug, Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(Reply::ok("ok")),
                latency: Mutex::new(Duration::ZERO),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Answers every unscripted call with `reply`.
    pub fn always(self, reply: Reply) -> Self {
        *lock(&self.inner.fallback) = reply;
        self
    }

    /// Queues `reply` for the next unanswered call.
    pub fn then(self, reply: Reply) -> Self {
        self.push(reply);
        self
    }

    /// Queues `reply` without consuming the transport.
    pub fn push(&self, reply: Reply) {
        lock(&self.inner.script).push_back(reply);
    }

    /// Delays every reply by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.inner.latency) = latency;
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.inner.requests).clone()
    }
}

impl Transport for MockTransport {
    type Future = BoxFuture<'static, Result<Response, TransportError>>;

    fn call(&mut self, request: Request) -> Self::Future {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.requests).push(request);
        let reply = lock(&self.inner.script)
            .pop_front()
            .unwrap_or_else(|| lock(&self.inner.fallback).clone());
        let latency = *lock(&self.inner.latency);

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            match reply {
                Reply::Respond(response) => Ok(response),
                Reply::Fail(err) => Err(err),
            }
        }
        .boxed()
    }
}
