//! [`Transport`] over a [`reqwest::Client`].

use std::future::Future;
use std::pin::Pin;

use fetchbox::config::TransportConfig;
use fetchbox_core::{Request, Response, Transport, TransportError};
use reqwest::Url;
use tracing::debug;

/// Transport that sends requests with a shared [`reqwest::Client`].
///
/// Request paths are appended to the base URL when one is set; otherwise the
/// path must be an absolute URL. Any status code upstream answers with is
/// returned as `Ok`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestTransport {
    /// Wraps an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Builds a client with the timeouts and base URL from `config`.
    pub fn from_config(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        let transport = Self::new(client);
        Ok(match &config.base_url {
            Some(base_url) => transport.with_base_url(base_url.clone()),
            None => transport,
        })
    }

    /// Sets the base URL request paths are appended to.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The wrapped client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    fn url_for(&self, request: &Request) -> Result<Url, TransportError> {
        let raw = match &self.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = request.path();
                if path.starts_with('/') {
                    format!("{base}{path}")
                } else {
                    format!("{base}/{path}")
                }
            }
            None => request.path().to_owned(),
        };
        let mut url = Url::parse(&raw).map_err(TransportError::other)?;
        if !request.query_pairs().is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in request.query_pairs() {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

impl Transport for ReqwestTransport {
    type Future = Pin<Box<dyn Future<Output = Result<Response, TransportError>> + Send>>;

    fn call(&mut self, request: Request) -> Self::Future {
        let client = self.client.clone();
        let url = self.url_for(&request);

        Box::pin(async move {
            let url = url?;
            debug!(method = %request.method(), %url, "sending request");

            let mut builder = client
                .request(request.method().clone(), url)
                .headers(request.headers().clone());
            if let Some(body) = request.body_bytes() {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await.map_err(classify)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(classify)?;
            debug!(%status, bytes = body.len(), "response received");

            Ok(Response::new(status, headers, body))
        })
    }
}

/// Maps a reqwest error onto the transport error taxonomy.
pub fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::connect(err)
    } else {
        TransportError::other(err)
    }
}
