#![allow(dead_code)]

use std::time::Duration;

use chrono::{DateTime, Utc};
use fetchbox::config::ClientConfig;
use fetchbox::{FetchClient, FetchClientBuilder, NotSet};
use fetchbox_core::DefaultExtractor;
use fetchbox_test::{ManualClock, MockBackend, MockTransport};

pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

pub struct Harness {
    pub backend: MockBackend,
    pub transport: MockTransport,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            backend: MockBackend::new(),
            transport,
            clock: ManualClock::new(epoch()),
        }
    }

    pub fn builder(
        &self,
    ) -> FetchClientBuilder<MockBackend, MockTransport, DefaultExtractor> {
        FetchClientBuilder::<NotSet, NotSet, DefaultExtractor>::new()
            .backend(self.backend.clone())
            .transport(self.transport.clone())
            .clock(self.clock.clone())
    }

    pub fn client(&self) -> FetchClient<MockBackend, MockTransport> {
        self.builder().build()
    }

    pub fn client_with(&self, config: ClientConfig) -> FetchClient<MockBackend, MockTransport> {
        self.builder().config(config).build()
    }
}
