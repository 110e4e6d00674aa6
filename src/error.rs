//! Error types for the authentik provider.

use serde_json::Value;
use thiserror::Error;

use crate::schema::Diagnostic;

/// A non-success response returned by the authentik API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP Error '{status}' during request '{method} {path}': \"{body}\"")]
pub struct ApiError {
    /// HTTP method of the failed request.
    pub method: String,
    /// Request path relative to the API root.
    pub path: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl ApiError {
    /// Create an API error from its parts.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    /// Whether the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// User-supplied input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal error, usually a schema/handler mismatch.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// The provider configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is not registered.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// State, config or an API body was not valid JSON for its type.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The gRPC listener failed.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The HTTP request to the API could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Operation not supported for this type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The host sent a malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The operation failed after the remote object was already changed.
    ///
    /// The host must still record `state`, or the object becomes untracked.
    #[error("{source}")]
    Partial {
        /// State to keep for the object.
        state: Value,
        /// What went wrong.
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// The inner message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Sdk(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::Http(_err) => "http error (see Debug output)",
            Self::Api(err) => &err.body,
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
            Self::Partial { source, .. } => source.message(),
        }
    }

    /// Attach the state the host must keep despite the failure.
    pub fn with_state(self, state: Value) -> Self {
        match self {
            Self::Partial { source, .. } => Self::Partial { state, source },
            other => Self::Partial {
                state,
                source: Box::new(other),
            },
        }
    }

    /// Split off the state attached by [`with_state`](Self::with_state).
    pub fn into_parts(self) -> (Option<Value>, ProviderError) {
        match self {
            Self::Partial { state, source } => (Some(state), *source),
            other => (None, other),
        }
    }

    /// The API error behind this error, if any.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Partial { source, .. } => source.as_api(),
            _ => None,
        }
    }

    /// Whether this error means the remote object is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api(err) => err.is_not_found(),
            Self::Partial { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Render this error as the diagnostics returned to the host.
    ///
    /// Every error produces exactly one error diagnostic.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Api(err) => vec![crate::diag::http_to_diag(err)],
            Self::Http(err) => vec![Diagnostic::error("HTTP request failed")
                .with_detail(err.to_string())],
            Self::Partial { source, .. } => source.to_diagnostics(),
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Sdk(msg) => tonic::Status::internal(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Http(err) => {
                tonic::Status::unavailable(format!("HTTP request failed: {}", err))
            },
            ProviderError::Api(err) => match err.status {
                404 => tonic::Status::not_found(err.to_string()),
                401 | 403 => tonic::Status::permission_denied(err.to_string()),
                429 => tonic::Status::resource_exhausted(err.to_string()),
                500..=599 => tonic::Status::unavailable(err.to_string()),
                _ => tonic::Status::failed_precondition(err.to_string()),
            },
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Partial { source, .. } => (*source).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("user-123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: user-123");

        let err = ProviderError::UnknownResource("authentik_widget".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: authentik_widget");
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::new("GET", "core/users/4/", 500, "boom");
        assert_eq!(
            err.to_string(),
            "HTTP Error '500' during request 'GET core/users/4/': \"boom\""
        );
        assert!(!err.is_not_found());
        assert!(ApiError::new("GET", "x", 404, "").is_not_found());
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::Validation("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Configuration("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::Sdk("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }

    #[test]
    fn test_api_error_to_status() {
        let cases = [
            (404, tonic::Code::NotFound),
            (403, tonic::Code::PermissionDenied),
            (429, tonic::Code::ResourceExhausted),
            (502, tonic::Code::Unavailable),
            (400, tonic::Code::FailedPrecondition),
        ];
        for (code, expected) in cases {
            let err: ProviderError = ApiError::new("GET", "x", code, "").into();
            let status: tonic::Status = err.into();
            assert_eq!(status.code(), expected, "status {}", code);
        }
    }

    #[test]
    fn test_is_not_found() {
        assert!(ProviderError::NotFound("x".into()).is_not_found());
        assert!(ProviderError::from(ApiError::new("DELETE", "x", 404, "")).is_not_found());
        assert!(!ProviderError::from(ApiError::new("DELETE", "x", 500, "")).is_not_found());
        assert!(!ProviderError::Sdk("x".into()).is_not_found());
    }

    #[test]
    fn test_one_diagnostic_per_error() {
        let err = ProviderError::from(ApiError::new("GET", "core/groups/a/", 500, "oops"));
        let diags = err.to_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("500"));

        let diags = ProviderError::Validation("bad".into()).to_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Validation error: bad");
    }

    #[test]
    fn test_partial_state_keeps_inner_error() {
        let err = ProviderError::from(ApiError::new("GET", "core/groups/a/", 500, "boom"))
            .with_state(serde_json::json!({"id": "a"}));

        assert_eq!(err.as_api().unwrap().status, 500);
        assert_eq!(err.to_diagnostics().len(), 1);
        assert!(err.to_string().contains("500"));

        let err = err.with_state(serde_json::json!({"id": "b"}));
        let (state, inner) = err.into_parts();
        assert_eq!(state, Some(serde_json::json!({"id": "b"})));
        assert!(matches!(inner, ProviderError::Api(_)));

        let (state, _) = ProviderError::Sdk("x".into()).into_parts();
        assert!(state.is_none());
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Configuration("invalid config".to_string());
        assert_eq!(err.message(), "invalid config");

        let err = ProviderError::from(ApiError::new("GET", "x", 400, "bad body"));
        assert_eq!(err.message(), "bad body");
    }
}
