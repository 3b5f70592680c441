//! `LanternError` → HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lantern_core::LanternError;
use serde::Serialize;
use tracing::warn;

/// Wire shape of an error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Message safe to show an end user.
    pub message: String,
}

/// A `LanternError` carried to an HTTP response.
///
/// Upstream detail stays in the logs; only `public_message` crosses the
/// wire.
#[derive(Debug)]
pub struct ApiError(pub LanternError);

impl From<LanternError> for ApiError {
    fn from(err: LanternError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// The status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LanternError::Validation { .. } => StatusCode::BAD_REQUEST,
            LanternError::NotFound { .. } => StatusCode::NOT_FOUND,
            LanternError::Conflict { .. } => StatusCode::CONFLICT,
            LanternError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            LanternError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, code = self.0.code(), "request failed");
        }
        let body = ErrorBody {
            code: self.0.code(),
            message: self.0.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let err = ApiError(LanternError::validation("name", "may not be empty"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError(LanternError::not_found("chat", "c-1"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = ApiError(LanternError::conflict("branch name taken"));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn timeout_maps_to_504() {
        let err = ApiError(LanternError::timeout("planner", 1500));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn upstream_maps_to_502_and_hides_detail() {
        let err = ApiError(LanternError::upstream("provider key leaked in detail"));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.0.public_message(), "an upstream dependency failed");
    }
}
