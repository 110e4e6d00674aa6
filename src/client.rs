//! Typed client for the authentik REST API.
//!
//! One [`ApiClient`] is built per provider run and shared by every resource
//! operation. It holds no mutable state; each call is an independent
//! request/response round trip through the configured [`Transport`].

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{ApiError, ProviderError};
use crate::models::Paginated;
use crate::transport::{build_transport, Transport, USER_AGENT};

/// Path of the API below the configured URL.
pub const API_PREFIX: &str = "api/v3/";

/// Shared handle to the authentik API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    headers: HeaderMap,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build the client for a resolved provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let transport = build_transport(config.insecure, config.fail_requests)?;
        Self::with_transport(config, transport)
    }

    /// Build a client that sends requests through `transport`.
    pub fn with_transport(
        config: &ProviderConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ProviderError> {
        let mut root = config.url.clone();
        if !root.ends_with('/') {
            root.push('/');
        }
        let base_url = Url::parse(&root)
            .and_then(|u| u.join(API_PREFIX))
            .map_err(|e| ProviderError::Configuration(format!("invalid url '{}': {}", config.url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(reqwest::header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| ProviderError::Configuration("token contains invalid characters".to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                ProviderError::Configuration(format!("invalid header name '{}'", name))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                ProviderError::Configuration(format!("invalid value for header '{}'", name))
            })?;
            headers.insert(name, value);
        }

        Ok(Self {
            base_url,
            headers,
            transport,
        })
    }

    /// Root URL all paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch one object.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let body = self.call(Method::GET, path, &[], None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch every object of a list endpoint, following pagination.
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ProviderError> {
        let mut results = Vec::new();
        let mut page = 1u64;
        loop {
            let mut params = query.to_vec();
            params.push(("page", page.to_string()));
            let body = self.call(Method::GET, path, &params, None).await?;
            let parsed: Paginated<T> = serde_json::from_str(&body)?;
            results.extend(parsed.results);
            if parsed.pagination.next == 0 || parsed.pagination.next <= page {
                break;
            }
            page = parsed.pagination.next;
        }
        Ok(results)
    }

    /// Create an object.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let payload = serde_json::to_vec(body)?;
        let body = self.call(Method::POST, path, &[], Some(payload)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Call an action endpoint whose response body is ignored.
    pub async fn post_action<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ProviderError> {
        let payload = serde_json::to_vec(body)?;
        self.call(Method::POST, path, &[], Some(payload)).await?;
        Ok(())
    }

    /// Replace an object.
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let payload = serde_json::to_vec(body)?;
        let body = self.call(Method::PUT, path, &[], Some(payload)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Delete an object.
    pub async fn delete(&self, path: &str) -> Result<(), ProviderError> {
        self.call(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<String, ProviderError> {
        let mut url = self.base_url.join(path.trim_start_matches('/')).map_err(|e| {
            ProviderError::Sdk(format!("invalid request path '{}': {}", path, e))
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let mut request = reqwest::Request::new(method.clone(), url);
        *request.headers_mut() = self.headers.clone();
        if let Some(body) = body {
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *request.body_mut() = Some(body.into());
        }

        debug!(method = %method, path = %path, "Calling authentik API");
        let response = self.transport.send(request).await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::new(method.as_str(), path, status.as_u16(), text).into());
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FailingTransport;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Answers requests from a queue and records what it was sent.
    #[derive(Debug, Default)]
    struct StubTransport {
        responses: Mutex<Vec<(u16, String)>>,
        seen: Mutex<Vec<(String, String, Option<String>)>>,
    }

    impl StubTransport {
        fn new(responses: Vec<(u16, Value)>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .rev()
                        .map(|(s, v)| (s, v.to_string()))
                        .collect(),
                ),
                seen: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
            let auth = request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            self.seen.lock().unwrap().push((
                request.method().to_string(),
                request.url().to_string(),
                auth,
            ));
            let (status, body) = self.responses.lock().unwrap().pop().unwrap();
            let mut response = http::Response::new(body);
            *response.status_mut() = http::StatusCode::from_u16(status).unwrap();
            Ok(reqwest::Response::from(response))
        }
    }

    fn config() -> ProviderConfig {
        ProviderConfig::new("https://authentik.company", "tok").with_header("X-Tenant", "blue")
    }

    #[test]
    fn test_base_url() {
        let client = ApiClient::with_transport(&config(), Arc::new(FailingTransport)).unwrap();
        assert_eq!(client.base_url().as_str(), "https://authentik.company/api/v3/");

        let sub = ProviderConfig::new("https://example.com/auth", "tok");
        let client = ApiClient::with_transport(&sub, Arc::new(FailingTransport)).unwrap();
        assert_eq!(client.base_url().as_str(), "https://example.com/auth/api/v3/");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let bad = config().with_header("bad header", "x");
        let err = ApiClient::with_transport(&bad, Arc::new(FailingTransport)).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_get_sends_bearer_token() {
        let stub = StubTransport::new(vec![(200, json!({"pk": 1}))]);
        let client = ApiClient::with_transport(&config(), stub.clone()).unwrap();

        let value: Value = client.get("core/users/1/").await.unwrap();
        assert_eq!(value["pk"], 1);

        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen[0].0, "GET");
        assert_eq!(seen[0].1, "https://authentik.company/api/v3/core/users/1/");
        assert_eq!(seen[0].2.as_deref(), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_non_success_becomes_api_error() {
        let stub = StubTransport::new(vec![(404, json!({"detail": "Not found."}))]);
        let client = ApiClient::with_transport(&config(), stub).unwrap();

        let err = client.get::<Value>("core/groups/x/").await.unwrap_err();
        let api = err.as_api().unwrap();
        assert_eq!(api.status, 404);
        assert_eq!(api.method, "GET");
        assert!(api.body.contains("Not found."));
    }

    #[tokio::test]
    async fn test_list_follows_pagination() {
        let stub = StubTransport::new(vec![
            (200, json!({"pagination": {"next": 2}, "results": [{"n": 1}]})),
            (200, json!({"pagination": {"next": 0}, "results": [{"n": 2}]})),
        ]);
        let client = ApiClient::with_transport(&config(), stub.clone()).unwrap();

        let items: Vec<Value> = client
            .list("core/groups/", &[("name", "admins".to_string())])
            .await
            .unwrap();
        assert_eq!(items, vec![json!({"n": 1}), json!({"n": 2})]);

        let seen = stub.seen.lock().unwrap();
        assert!(seen[0].1.ends_with("core/groups/?name=admins&page=1"));
        assert!(seen[1].1.ends_with("core/groups/?name=admins&page=2"));
    }

    #[tokio::test]
    async fn test_failing_transport_surfaces_400() {
        let client = ApiClient::with_transport(&config(), Arc::new(FailingTransport)).unwrap();
        let err = client.delete("core/users/1/").await.unwrap_err();
        assert_eq!(err.as_api().map(|e| e.status), Some(400));
    }
}
