//! Translation of failed API calls into diagnostics.
//!
//! Not-found is never fatal: on read it clears the identifier so the host
//! plans a recreate, on delete it counts as already done. Everything else is
//! surfaced with the HTTP status and the response body.

use tracing::{debug, warn};

use crate::error::{ApiError, ProviderError};
use crate::schema::Diagnostic;
use crate::state::ResourceData;

/// Build the diagnostic reported for a failed API call.
pub fn http_to_diag(err: &ApiError) -> Diagnostic {
    Diagnostic::error(format!(
        "HTTP Error '{}' during request '{} {}'",
        err.status, err.method, err.path
    ))
    .with_detail(err.body.clone())
}

/// Handle an error raised while reading a resource.
///
/// A 404 clears the identifier and succeeds; any other error is returned.
pub fn handle_read_error(data: &mut ResourceData, err: ProviderError) -> Result<(), ProviderError> {
    if err.is_not_found() {
        warn!(id = %data.id(), "Remote object not found, removing from state");
        data.clear_id();
        return Ok(());
    }
    Err(err)
}

/// Treat a 404 from a delete call as success.
pub fn ignore_not_found(result: Result<(), ProviderError>) -> Result<(), ProviderError> {
    match result {
        Err(err) if err.is_not_found() => {
            debug!("Remote object already deleted");
            Ok(())
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_to_diag() {
        let err = ApiError::new("PUT", "core/groups/x/", 400, "{\"name\":[\"required\"]}");
        let diag = http_to_diag(&err);
        assert!(diag.is_error());
        assert!(diag.summary.contains("400"));
        assert!(diag.summary.contains("PUT core/groups/x/"));
        assert_eq!(diag.detail.as_deref(), Some("{\"name\":[\"required\"]}"));
    }

    #[test]
    fn test_read_not_found_clears_id() {
        let mut data = ResourceData::with_id("5");
        let err = ApiError::new("GET", "core/users/5/", 404, "").into();
        assert!(handle_read_error(&mut data, err).is_ok());
        assert!(!data.exists());
    }

    #[test]
    fn test_read_server_error_is_returned() {
        let mut data = ResourceData::with_id("5");
        let err = ApiError::new("GET", "core/users/5/", 500, "down").into();
        let err = handle_read_error(&mut data, err).unwrap_err();
        assert_eq!(data.id(), "5");
        let diags = err.to_diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("500"));
    }

    #[test]
    fn test_ignore_not_found() {
        assert!(ignore_not_found(Err(ApiError::new("DELETE", "x", 404, "").into())).is_ok());
        assert!(ignore_not_found(Err(ApiError::new("DELETE", "x", 403, "").into())).is_err());
        assert!(ignore_not_found(Ok(())).is_ok());
    }
}
