mod common;

use std::pin::pin;
use std::time::Duration;

use common::{Harness, secs};
use fetchbox::{CacheStatus, CancellationToken, FetchError, Request, TransportError};
use fetchbox_test::{MockTransport, Reply};
use futures::{future::join, poll};

fn is_cancelled<T: std::fmt::Debug>(result: &Result<T, FetchError>) -> bool {
    matches!(result, Err(FetchError::Transport(TransportError::Cancelled)))
}

#[tokio::test]
async fn owner_cancellation_reaches_waiters() {
    let harness = Harness::new(MockTransport::new().with_latency(Duration::from_secs(30)));
    let client = harness.client();
    let token = CancellationToken::new();

    let owner = client.fetch(Request::get("/slow").cancellation(token.clone()));
    let waiter = client.fetch(Request::get("/slow"));
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    };

    let ((owner, waiter), ()) = join(join(owner, waiter), cancel).await;

    assert!(is_cancelled(&owner));
    assert!(is_cancelled(&waiter));
    assert_eq!(harness.transport.call_count(), 1);
}

#[tokio::test]
async fn waiter_cancellation_leaves_owner_running() {
    let harness = Harness::new(MockTransport::new().with_latency(Duration::from_millis(50)));
    let client = harness.client();
    let token = CancellationToken::new();

    let owner = client.fetch(Request::get("/slow"));
    let waiter = client.fetch(Request::get("/slow").cancellation(token.clone()));
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    };

    let ((owner, waiter), ()) = join(join(owner, waiter), cancel).await;

    let owner = owner.unwrap();
    assert_eq!(owner.body().as_ref(), b"ok");
    assert!(!owner.is_shared());
    assert!(is_cancelled(&waiter));
    assert_eq!(harness.transport.call_count(), 1);
    assert_eq!(harness.backend.counters.write_count(), 1);
}

#[tokio::test]
async fn dropping_owner_cancels_waiters() {
    let harness = Harness::new(MockTransport::new().with_latency(Duration::from_secs(30)));
    let client = harness.client();

    let mut owner = Box::pin(client.fetch(Request::get("/slow")));
    assert!(poll!(owner.as_mut()).is_pending());

    let mut waiter = pin!(client.fetch(Request::get("/slow")));
    assert!(poll!(waiter.as_mut()).is_pending());

    drop(owner);
    let result = waiter.await;

    assert!(is_cancelled(&result));
    assert_eq!(harness.transport.call_count(), 1);
}

#[tokio::test]
async fn cancelled_owner_falls_back_to_stale_entry() {
    let harness = Harness::new(MockTransport::new().then(Reply::ok("v1")));
    let client = harness.client();
    let request = || Request::get("/slow").fresh_ttl(secs(60)).stale_ttl(secs(600));

    client.fetch(request()).await.unwrap();
    harness.clock.advance(secs(120));
    harness.transport.set_latency(Duration::from_secs(30));

    let token = CancellationToken::new();
    token.cancel();
    let response = client
        .fetch(request().cancellation(token))
        .await
        .unwrap();

    assert_eq!(response.cache_context().status, CacheStatus::Stale);
    assert_eq!(response.body().as_ref(), b"v1");
}

#[tokio::test]
async fn registry_is_free_after_cancellation() {
    let harness = Harness::new(MockTransport::new().with_latency(Duration::from_millis(10)));
    let client = harness.client();
    let token = CancellationToken::new();
    token.cancel();

    let cancelled = client
        .fetch(Request::get("/slow").cancellation(token))
        .await;
    assert!(is_cancelled(&cancelled));

    let response = client.fetch(Request::get("/slow")).await.unwrap();
    assert!(!response.is_shared());
    assert_eq!(harness.transport.call_count(), 2);
}
