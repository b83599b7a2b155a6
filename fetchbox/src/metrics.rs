//! Metrics declaration and recording.
//!
//! With the `metrics` feature off every function here is an empty inline
//! no-op.

use std::time::Duration;

use crate::concurrency::SharedOutcome;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of fresh cache hits.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_cache_hit_total",
            "Total number of requests served from a fresh cache entry."
        );
        "fetchbox_cache_hit_total"
    };
    /// Track number of cache misses.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_cache_miss_total",
            "Total number of requests answered by a live call."
        );
        "fetchbox_cache_miss_total"
    };
    /// Track number of stale fallbacks.
    pub static ref CACHE_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_cache_stale_total",
            "Total number of failed calls answered from a stale entry."
        );
        "fetchbox_cache_stale_total"
    };
    /// Track number of requests that joined another caller's call.
    pub static ref SHARED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_shared_total",
            "Total number of requests deduplicated onto an in-flight call."
        );
        "fetchbox_shared_total"
    };
    /// Track number of failed requests by error kind.
    pub static ref FAILURE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_failure_total",
            "Total number of requests that resolved with an error."
        );
        "fetchbox_failure_total"
    };
    /// Track number of transport failures.
    pub static ref TRANSPORT_FAILURE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fetchbox_transport_failure_total",
            "Total number of transport calls that produced no response."
        );
        "fetchbox_transport_failure_total"
    };
    /// Track read errors per backend.
    pub static ref BACKEND_READ_ERRORS: &'static str = {
        metrics::describe_counter!(
            "fetchbox_backend_read_errors_total",
            "Total number of cache read errors per backend."
        );
        "fetchbox_backend_read_errors_total"
    };
    /// Track write errors per backend.
    pub static ref BACKEND_WRITE_ERRORS: &'static str = {
        metrics::describe_counter!(
            "fetchbox_backend_write_errors_total",
            "Total number of cache write errors per backend."
        );
        "fetchbox_backend_write_errors_total"
    };
    /// Histogram of request duration.
    pub static ref REQUEST_DURATION: &'static str = {
        metrics::describe_histogram!(
            "fetchbox_request_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of cached fetches in seconds."
        );
        "fetchbox_request_duration_seconds"
    };
}

/// Records the outcome of one fetch.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_outcome(outcome: &SharedOutcome, duration: Duration) {
    let status = match outcome {
        Ok(response) => {
            let counter = match response.cache_context().status {
                fetchbox_core::CacheStatus::Hit => *CACHE_HIT_COUNTER,
                fetchbox_core::CacheStatus::Miss => *CACHE_MISS_COUNTER,
                fetchbox_core::CacheStatus::Stale => *CACHE_STALE_COUNTER,
            };
            metrics::counter!(counter).increment(1);
            if response.is_shared() {
                metrics::counter!(*SHARED_COUNTER).increment(1);
            }
            response.cache_context().status.as_str()
        }
        Err(err) => {
            metrics::counter!(*FAILURE_COUNTER, "kind" => err.kind()).increment(1);
            "error"
        }
    };
    metrics::histogram!(*REQUEST_DURATION, "status" => status).record(duration.as_secs_f64());
}

/// Records a transport call that produced no response.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_transport_failure() {
    metrics::counter!(*TRANSPORT_FAILURE_COUNTER).increment(1);
}

/// Records a swallowed backend read error.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_backend_read_error(backend: &str) {
    metrics::counter!(*BACKEND_READ_ERRORS, "backend" => backend.to_owned()).increment(1);
}

/// Records a swallowed backend write error.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_backend_write_error(backend: &str) {
    metrics::counter!(*BACKEND_WRITE_ERRORS, "backend" => backend.to_owned()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_outcome(_outcome: &SharedOutcome, _duration: Duration) {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_transport_failure() {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_backend_read_error(_backend: &str) {}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_backend_write_error(_backend: &str) {}
