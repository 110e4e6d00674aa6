//! Outbound HTTP transports.
//!
//! [`ApiClient`](crate::client::ApiClient) sends every request through a
//! [`Transport`]. The real network transport is wrapped by
//! [`TracingTransport`], which opens one span per request. In test mode
//! [`FailingTransport`] replaces the network and answers every request with
//! HTTP 400, which exercises the error paths of every resource without a
//! live server.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, field, info_span, warn, Instrument, Span};

use crate::error::ProviderError;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("authentik-provider/", env!("CARGO_PKG_VERSION"));

/// Body of the canned response returned by [`FailingTransport`].
pub const FAILING_BODY: &str = r#"{"detail":"request rejected by failing test transport"}"#;

/// Sends a fully built HTTP request.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send the request and return the raw response.
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        (**self).send(request).await
    }
}

/// Transport backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport, optionally skipping TLS certificate verification.
    pub fn new(insecure: bool) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The underlying client, used to build requests.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        self.client.execute(request).await
    }
}

/// Decorator that traces every request passing through the inner transport.
#[derive(Debug, Clone)]
pub struct TracingTransport<T> {
    inner: T,
}

impl<T: Transport> TracingTransport<T> {
    /// Wrap a transport.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for TracingTransport<T> {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        let span = info_span!(
            "http.client",
            http.method = %request.method(),
            http.url = %request.url(),
            http.status_code = field::Empty,
        );
        async move {
            let result = self.inner.send(request).await;
            match &result {
                Ok(response) => {
                    Span::current().record("http.status_code", response.status().as_u16());
                    debug!(status = response.status().as_u16(), "HTTP request finished");
                },
                Err(e) => warn!(error = %e, "HTTP request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Test-mode transport that rejects every request with HTTP 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        debug!(method = %request.method(), url = %request.url(), "Failing request in test mode");
        let mut response = http::Response::new(FAILING_BODY.to_string());
        *response.status_mut() = http::StatusCode::BAD_REQUEST;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Ok(reqwest::Response::from(response))
    }
}

/// Build the traced transport for a provider run.
pub fn build_transport(insecure: bool, fail_requests: bool) -> Result<Arc<dyn Transport>, ProviderError> {
    if fail_requests {
        warn!("Test mode enabled, every API request will fail with HTTP 400");
        return Ok(Arc::new(TracingTransport::new(FailingTransport)));
    }
    Ok(Arc::new(TracingTransport::new(HttpTransport::new(insecure)?)))
}
