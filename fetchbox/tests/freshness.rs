mod common;

use chrono::TimeDelta;
use common::{Harness, epoch, secs};
use fetchbox::config::ClientConfig;
use fetchbox::{CacheStatus, FetchError, Request, TransportError};
use fetchbox_test::{MockTransport, Reply};
use http::StatusCode;

fn user_request() -> Request {
    Request::get("/users/42")
        .fresh_ttl(secs(600))
        .stale_ttl(secs(1800))
}

#[tokio::test]
async fn fresh_entry_is_served_without_transport() {
    let harness = Harness::new(MockTransport::new().always(Reply::ok("alice")));
    let client = harness.client();

    let first = client.fetch(user_request()).await.unwrap();
    assert_eq!(first.cache_context().status, CacheStatus::Miss);

    harness.clock.advance(secs(599));
    let second = client.fetch(user_request()).await.unwrap();

    assert_eq!(second.cache_context().status, CacheStatus::Hit);
    assert!(second.from_cache());
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.body().as_ref(), b"alice");
    assert_eq!(harness.transport.call_count(), 1);
}

#[tokio::test]
async fn stored_entry_deadlines_are_monotonic() {
    let harness = Harness::new(MockTransport::new());
    let client = harness.client();
    let request = user_request();
    let key = client.cache_key(&request);

    client.fetch(request).await.unwrap();

    let meta = harness.backend.raw_entry(&key).unwrap().meta();
    assert_eq!(meta.stored_at, epoch());
    assert_eq!(meta.fresh_until, epoch() + TimeDelta::seconds(600));
    assert_eq!(meta.stale_until, epoch() + TimeDelta::seconds(1800));
    assert!(meta.stored_at <= meta.fresh_until && meta.fresh_until <= meta.stale_until);
    assert_eq!(harness.backend.last_ttl(&key), Some(Some(secs(1800))));
}

#[tokio::test]
async fn rewritten_entry_moves_deadlines_forward() {
    let harness = Harness::new(
        MockTransport::new()
            .then(Reply::ok("v1"))
            .then(Reply::ok("v2")),
    );
    let client = harness.client();
    let key = client.cache_key(&user_request());

    client.fetch(user_request()).await.unwrap();
    let before = harness.backend.raw_entry(&key).unwrap().meta();

    // Past the fresh window, so the second fetch goes to the network and rewrites.
    harness.clock.advance(secs(700));
    let second = client.fetch(user_request()).await.unwrap();
    assert_eq!(second.cache_context().status, CacheStatus::Miss);
    assert_eq!(second.body().as_ref(), b"v2");

    let after = harness.backend.raw_entry(&key).unwrap().meta();
    assert_eq!(harness.backend.counters.write_count(), 2);
    assert!(after.stored_at > before.stored_at);
    assert!(after.fresh_until > before.fresh_until);
    assert!(after.stale_until > before.stale_until);
    assert_eq!(after.fresh_until, epoch() + TimeDelta::seconds(700 + 600));
    assert_eq!(after.stale_until, epoch() + TimeDelta::seconds(700 + 1800));
}

#[tokio::test]
async fn stale_window_shorter_than_fresh_is_raised() {
    let harness = Harness::new(MockTransport::new());
    let client = harness.client();
    let request = Request::get("/short").fresh_ttl(secs(600)).stale_ttl(secs(60));
    let key = client.cache_key(&request);

    client.fetch(request).await.unwrap();

    let meta = harness.backend.raw_entry(&key).unwrap().meta();
    assert_eq!(meta.stale_until, meta.fresh_until);
    assert_eq!(harness.backend.last_ttl(&key), Some(Some(secs(600))));
}

#[tokio::test]
async fn stale_entry_answers_failed_call_until_it_expires() {
    let harness = Harness::new(
        MockTransport::new()
            .then(Reply::ok("alice"))
            .always(Reply::Fail(TransportError::Timeout)),
    );
    let client = harness.client();

    client.fetch(user_request()).await.unwrap();

    harness.clock.advance(secs(700));
    let stale = client.fetch(user_request()).await.unwrap();
    assert_eq!(stale.cache_context().status, CacheStatus::Stale);
    assert!(stale.is_stale());
    assert_eq!(stale.body().as_ref(), b"alice");

    harness.clock.advance(secs(1300));
    let expired = client.fetch(user_request()).await;
    assert!(matches!(
        expired,
        Err(FetchError::Transport(TransportError::Timeout))
    ));
    assert_eq!(harness.transport.call_count(), 3);
}

#[tokio::test]
async fn stale_entry_is_not_served_when_call_succeeds() {
    let harness = Harness::new(
        MockTransport::new()
            .then(Reply::ok("v1"))
            .always(Reply::ok("v2")),
    );
    let client = harness.client();

    client.fetch(user_request()).await.unwrap();
    harness.clock.advance(secs(700));

    let refreshed = client.fetch(user_request()).await.unwrap();
    assert_eq!(refreshed.cache_context().status, CacheStatus::Miss);
    assert_eq!(refreshed.body().as_ref(), b"v2");

    let hit = client.fetch(user_request()).await.unwrap();
    assert_eq!(hit.cache_context().status, CacheStatus::Hit);
    assert_eq!(hit.body().as_ref(), b"v2");
    assert_eq!(harness.transport.call_count(), 2);
}

#[tokio::test]
async fn failure_status_falls_back_to_stale_entry() {
    let harness = Harness::new(
        MockTransport::new()
            .then(Reply::ok("alice"))
            .always(Reply::status(StatusCode::SERVICE_UNAVAILABLE, "maintenance")),
    );
    let client = harness.client();

    client.fetch(user_request()).await.unwrap();
    harness.clock.advance(secs(900));

    let stale = client.fetch(user_request()).await.unwrap();
    assert_eq!(stale.cache_context().status, CacheStatus::Stale);
    assert_eq!(stale.status(), StatusCode::OK);
}

#[tokio::test]
async fn failure_status_without_entry_carries_the_response() {
    let harness = Harness::new(
        MockTransport::new().always(Reply::status(StatusCode::NOT_FOUND, "no such user")),
    );
    let client = harness.client();

    let err = client.fetch(user_request()).await.unwrap_err();

    assert_eq!(err.kind(), "request");
    let response = err.response().unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body().as_ref(), b"no such user");
    assert_eq!(harness.backend.counters.write_count(), 0);
}

#[tokio::test]
async fn nonstandard_status_above_599_is_an_error() {
    let odd = StatusCode::from_u16(600).unwrap();
    let harness = Harness::new(MockTransport::new().always(Reply::status(odd, "??")));
    let client = harness.client();

    let err = client.fetch(user_request()).await.unwrap_err();

    assert!(matches!(err, FetchError::Request(_)));
    assert_eq!(err.response().unwrap().status(), odd);
    assert_eq!(harness.backend.counters.write_count(), 0);
}

#[tokio::test]
async fn zero_fresh_window_never_writes() {
    let harness = Harness::new(
        MockTransport::new()
            .then(Reply::ok("v1"))
            .then(Reply::ok("v2"))
            .always(Reply::Fail(TransportError::Timeout)),
    );
    let mut config = ClientConfig::default();
    config.cache.stale = Some(secs(1800));
    let client = harness.client_with(config);
    let request = || Request::get("/prices").fresh_ttl(secs(0));

    let first = client.fetch(request()).await.unwrap();
    let second = client.fetch(request()).await.unwrap();
    assert_eq!(first.body().as_ref(), b"v1");
    assert_eq!(second.body().as_ref(), b"v2");
    assert_eq!(second.cache_context().status, CacheStatus::Miss);
    assert_eq!(harness.backend.counters.write_count(), 0);
    assert_eq!(harness.backend.cache_entry_count(), 0);

    let failed = client.fetch(request()).await;
    assert!(matches!(
        failed,
        Err(FetchError::Transport(TransportError::Timeout))
    ));
    assert_eq!(harness.transport.call_count(), 3);
}

#[tokio::test]
async fn zero_fresh_window_falls_back_to_entry_stored_by_cached_request() {
    let harness = Harness::new(
        MockTransport::new()
            .then(Reply::ok("cached"))
            .always(Reply::Fail(TransportError::Timeout)),
    );
    let client = harness.client();

    client.fetch(user_request()).await.unwrap();
    harness.clock.advance(secs(10));

    let uncached = user_request().fresh_ttl(secs(0));
    let fallback = client.fetch(uncached).await.unwrap();

    assert_eq!(fallback.cache_context().status, CacheStatus::Stale);
    assert_eq!(fallback.body().as_ref(), b"cached");
    assert_eq!(harness.backend.counters.write_count(), 1);
    assert_eq!(harness.transport.call_count(), 2);
}

#[tokio::test]
async fn client_defaults_apply_without_directives() {
    let harness = Harness::new(MockTransport::new());
    let mut config = ClientConfig::default();
    config.cache.ttl = secs(10);
    config.cache.stale = Some(secs(100));
    let client = harness.client_with(config);
    let key = client.cache_key(&Request::get("/defaults"));

    client.fetch(Request::get("/defaults")).await.unwrap();

    let meta = harness.backend.raw_entry(&key).unwrap().meta();
    assert_eq!(meta.fresh_until, epoch() + TimeDelta::seconds(10));
    assert_eq!(meta.stale_until, epoch() + TimeDelta::seconds(100));
}

#[tokio::test]
async fn backend_read_failure_is_treated_as_miss() {
    let harness = Harness::new(MockTransport::new().always(Reply::ok("live")));
    let client = harness.client();
    harness.backend.fail_reads(true);

    let response = client.fetch(user_request()).await.unwrap();

    assert_eq!(response.cache_context().status, CacheStatus::Miss);
    assert_eq!(response.body().as_ref(), b"live");
    assert_eq!(harness.transport.call_count(), 1);
}

#[tokio::test]
async fn backend_write_failure_still_returns_response() {
    let harness = Harness::new(MockTransport::new().always(Reply::ok("live")));
    let client = harness.client();
    harness.backend.fail_writes(true);

    let response = client.fetch(user_request()).await.unwrap();

    assert_eq!(response.body().as_ref(), b"live");
    assert_eq!(harness.backend.counters.write_count(), 1);
    assert_eq!(harness.backend.cache_entry_count(), 0);
}

#[tokio::test]
async fn backend_read_failure_during_fallback_returns_original_error() {
    let harness = Harness::new(
        MockTransport::new()
            .then(Reply::ok("alice"))
            .always(Reply::Fail(TransportError::Timeout)),
    );
    let client = harness.client();

    client.fetch(user_request()).await.unwrap();
    harness.clock.advance(secs(700));
    harness.backend.fail_reads(true);

    let result = client.fetch(user_request()).await;
    assert!(matches!(
        result,
        Err(FetchError::Transport(TransportError::Timeout))
    ));
}
