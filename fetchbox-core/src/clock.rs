//! Wall-clock source for entry timestamps.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

/// Source of "now" for freshness decisions.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
