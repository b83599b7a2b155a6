//! # fetchbox-reqwest
//!
//! [`reqwest`] transport for the `fetchbox` caching client.
//!
//! ```no_run
//! use fetchbox::config::TransportConfig;
//! use fetchbox_reqwest::ReqwestTransport;
//!
//! let config = TransportConfig {
//!     base_url: Some("https://users.internal".to_owned()),
//!     ..TransportConfig::default()
//! };
//! let transport = ReqwestTransport::from_config(&config).expect("valid client");
//! ```
//!
//! Errors are classified without leaking reqwest types: timeouts become
//! [`TransportError::Timeout`](fetchbox_core::TransportError::Timeout),
//! connection failures become
//! [`TransportError::Connect`](fetchbox_core::TransportError::Connect) and
//! everything else becomes
//! [`TransportError::Other`](fetchbox_core::TransportError::Other).

mod transport;

pub use transport::{ReqwestTransport, classify};

/// Re-export of the reqwest client for convenience in type annotations.
pub use reqwest::Client as ReqwestClient;
