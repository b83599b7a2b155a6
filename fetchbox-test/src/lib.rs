//! Test doubles for fetchbox.
//!
//! - [`MockBackend`] - in-memory backend with counters and failure injection
//! - [`MockTransport`] - scripted transport with latency and call recording
//! - [`ManualClock`] - a clock that only moves when told to

pub mod clock;
pub mod mock_backend;
pub mod mock_transport;

pub use clock::ManualClock;
pub use mock_backend::{BackendCounters, MockBackend};
pub use mock_transport::{MockTransport, Reply};
