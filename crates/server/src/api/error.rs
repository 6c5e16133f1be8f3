//! Error responses shared by the API handlers.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use arxivist_core::{ErrorCode, OrchestratorError};

/// Error body: `{"code": "NOT_FOUND", "error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ResourceBusy => StatusCode::CONFLICT,
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::TransformFailed
        | ErrorCode::FetchFailed
        | ErrorCode::CacheIoError
        | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn api_error(code: ErrorCode, error: impl Into<String>) -> ApiError {
    (
        status_for(code),
        Json(ErrorResponse {
            code,
            error: error.into(),
        }),
    )
}

pub fn bad_request(error: impl Into<String>) -> ApiError {
    api_error(ErrorCode::InvalidRequest, error)
}

impl From<&OrchestratorError> for ErrorResponse {
    fn from(err: &OrchestratorError) -> Self {
        Self {
            code: err.code(),
            error: err.to_string(),
        }
    }
}

/// Map an orchestrator error onto its HTTP response.
pub fn from_orchestrator(err: OrchestratorError) -> ApiError {
    let body = ErrorResponse::from(&err);
    if body.code == ErrorCode::Internal {
        tracing::error!(error = %err, "Request failed");
    }
    (status_for(body.code), Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arxivist_core::ResolveError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorCode::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorCode::ResourceBusy), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorCode::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(ErrorCode::TransformFailed),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_resolve_error_is_not_found() {
        let (status, Json(body)) = from_orchestrator(OrchestratorError::Resolve(
            ResolveError::NoPapers("s".to_string()),
        ));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, ErrorCode::NotFound);
        assert!(!body.error.is_empty());
    }
}
