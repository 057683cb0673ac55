//! HTTP error mapping: engine error kinds onto status codes with a
//! `{"detail": "..."}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use smartrecover::EngineError;

pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    /// Mapping for admin updates: a configuration problem in the submitted
    /// payload is the caller's fault (400), not a server fault.
    pub fn from_admin(error: EngineError) -> Self {
        match error {
            EngineError::Config(message) => Self::new(StatusCode::BAD_REQUEST, message),
            other => Self::from(other),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        let status = match &error {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Upstream(_) | EngineError::NotSupported(_) => StatusCode::BAD_GATEWAY,
            EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Cancellation never surfaces as an HTTP error; this arm only
            // exists to keep the match total.
            EngineError::Cancelled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kinds_map_to_contract_statuses() {
        let cases = [
            (EngineError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (EngineError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::Conflict("x".into()), StatusCode::CONFLICT),
            (EngineError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
            (
                EngineError::Config("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status, expected);
        }
    }

    #[test]
    fn admin_mapping_downgrades_config_errors() {
        let error = ApiError::from_admin(EngineError::Config("bad provider".into()));
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
    }
}
