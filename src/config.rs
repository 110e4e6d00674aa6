//! Provider configuration.
//!
//! Values come from the provider block, falling back to environment
//! variables. The block always wins.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Schema, Validator};

/// Environment variable holding the API URL.
pub const ENV_URL: &str = "AUTHENTIK_URL";
/// Environment variable holding the API token.
pub const ENV_TOKEN: &str = "AUTHENTIK_TOKEN";
/// Environment variable toggling TLS verification.
pub const ENV_INSECURE: &str = "AUTHENTIK_INSECURE";
/// Environment variable enabling the failing test transport.
pub const ENV_TEST_FAIL_REQUESTS: &str = "AUTHENTIK_TEST_FAIL_REQUESTS";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    url: Option<String>,
    token: Option<String>,
    insecure: Option<bool>,
    headers: Option<BTreeMap<String, String>>,
}

/// Fully resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL of the authentik instance, without the `/api/v3` suffix.
    pub url: String,
    /// API token sent as a bearer token.
    pub token: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Static headers added to every request.
    pub headers: BTreeMap<String, String>,
    /// Answer every request with HTTP 400 instead of contacting the API.
    pub fail_requests: bool,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("fail_requests", &self.fail_requests)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a configuration for the given URL and token.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            insecure: false,
            headers: BTreeMap::new(),
            fail_requests: false,
        }
    }

    /// Add a static header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Enable or disable the failing test transport.
    pub fn with_fail_requests(mut self, fail_requests: bool) -> Self {
        self.fail_requests = fail_requests;
        self
    }

    /// Resolve the provider block against the process environment.
    pub fn resolve(value: &Value) -> Result<Self, ProviderError> {
        Self::resolve_with(value, |key| std::env::var(key).ok())
    }

    /// Resolve the provider block using `env` to look up fallbacks.
    pub fn resolve_with(
        value: &Value,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProviderError> {
        let raw: RawConfig = match value {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other.clone())
                .map_err(|e| ProviderError::Configuration(e.to_string()))?,
        };

        let url = non_empty(raw.url)
            .or_else(|| non_empty(env(ENV_URL)))
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "url must be set in the provider block or via {}",
                    ENV_URL
                ))
            })?;
        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| ProviderError::Configuration(format!("invalid url '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProviderError::Configuration(format!(
                "url '{}' must use http or https",
                url
            )));
        }

        let token = non_empty(raw.token)
            .or_else(|| non_empty(env(ENV_TOKEN)))
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "token must be set in the provider block or via {}",
                    ENV_TOKEN
                ))
            })?;

        let insecure = match raw.insecure {
            Some(v) => v,
            None => env(ENV_INSECURE).map(|v| parse_bool(&v)).unwrap_or(false),
        };

        Ok(Self {
            url,
            token,
            insecure,
            headers: raw.headers.unwrap_or_default(),
            fail_requests: env(ENV_TEST_FAIL_REQUESTS)
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
        })
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Manage authentik objects.")
            .with_attribute(
                "url",
                Attribute::optional_string()
                    .with_validator(Validator::Url)
                    .with_description(format!(
                        "The authentik API endpoint, can optionally be passed as `{}` environmental variable",
                        ENV_URL
                    )),
            )
            .with_attribute(
                "token",
                Attribute::optional_string().sensitive().with_description(format!(
                    "The authentik API token, can optionally be passed as `{}` environmental variable",
                    ENV_TOKEN
                )),
            )
            .with_attribute(
                "insecure",
                Attribute::optional_bool().with_description(format!(
                    "Whether to skip TLS verification, can optionally be passed as `{}` environmental variable",
                    ENV_INSECURE
                )),
            )
            .with_attribute(
                "headers",
                Attribute::optional_map(AttributeType::String)
                    .sensitive()
                    .with_description("Optional HTTP headers sent with every request"),
            )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_block_values() {
        let config = ProviderConfig::resolve_with(
            &json!({
                "url": "https://authentik.company",
                "token": "secret",
                "insecure": true,
                "headers": {"X-Tenant": "a"}
            }),
            env(&[]),
        )
        .unwrap();
        assert_eq!(config.url, "https://authentik.company");
        assert_eq!(config.token, "secret");
        assert!(config.insecure);
        assert_eq!(config.headers["X-Tenant"], "a");
        assert!(!config.fail_requests);
    }

    #[test]
    fn test_env_fallback() {
        let config = ProviderConfig::resolve_with(
            &json!({}),
            env(&[
                (ENV_URL, "http://localhost:9000"),
                (ENV_TOKEN, "from-env"),
                (ENV_INSECURE, "TRUE"),
                (ENV_TEST_FAIL_REQUESTS, "1"),
            ]),
        )
        .unwrap();
        assert_eq!(config.url, "http://localhost:9000");
        assert_eq!(config.token, "from-env");
        assert!(config.insecure);
        assert!(config.fail_requests);
    }

    #[test]
    fn test_block_wins_over_env() {
        let config = ProviderConfig::resolve_with(
            &json!({"url": "https://block", "token": "block", "insecure": false}),
            env(&[(ENV_URL, "https://env"), (ENV_TOKEN, "env"), (ENV_INSECURE, "true")]),
        )
        .unwrap();
        assert_eq!(config.url, "https://block");
        assert_eq!(config.token, "block");
        assert!(!config.insecure);
    }

    #[test]
    fn test_missing_values() {
        let err = ProviderConfig::resolve_with(&Value::Null, env(&[])).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(m) if m.contains(ENV_URL)));

        let err = ProviderConfig::resolve_with(&json!({"url": "https://a", "token": " "}), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(m) if m.contains(ENV_TOKEN)));
    }

    #[test]
    fn test_invalid_url_and_unknown_fields() {
        let err = ProviderConfig::resolve_with(&json!({"url": "not a url", "token": "t"}), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err = ProviderConfig::resolve_with(&json!({"url": "ftp://a", "token": "t"}), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err = ProviderConfig::resolve_with(&json!({"endpoint": "x"}), env(&[])).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ProviderConfig::new("https://a", "very-secret");
        assert!(!format!("{:?}", config).contains("very-secret"));
    }

    #[test]
    fn test_schema_marks_token_sensitive() {
        let schema = ProviderConfig::schema();
        assert!(schema.attributes["token"].flags.sensitive);
        assert!(!schema.attributes["url"].flags.required);
    }
}
