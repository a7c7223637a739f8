//! Uniform JSON error bodies for the order API
//!
//! Every failure leaves the service as `{code, message, request_id}` with the
//! request ID echoed in the `x-request-id` header.

use crate::enrichment::WorkflowError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Standard error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Unique error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Request ID for correlation
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Convert to HTTP response with proper headers
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        let request_id = self.request_id.clone();
        let mut response = (status, Json(self)).into_response();

        if let Some(id) = request_id {
            if let Ok(header_value) = HeaderValue::from_str(&id) {
                response
                    .headers_mut()
                    .insert(REQUEST_ID_HEADER, header_value);
            }
        }

        response
    }
}

/// A workflow failure bound to the request that caused it
#[derive(Debug)]
pub struct ApiError {
    error: WorkflowError,
    request_id: Option<String>,
}

impl ApiError {
    pub fn new(error: WorkflowError, headers: &HeaderMap) -> Self {
        Self {
            error,
            request_id: extract_request_id(headers),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        status_for(&self.error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        ErrorResponse::new(self.error.code(), self.error.to_string())
            .with_request_id(self.request_id)
            .into_response_with_status(status)
    }
}

pub fn status_for(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::Upstream(_) => StatusCode::BAD_GATEWAY,
        WorkflowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Helper to extract request ID from headers
pub fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(WorkflowError::validation("x"), StatusCode::BAD_REQUEST)]
    #[case(WorkflowError::not_found("x"), StatusCode::NOT_FOUND)]
    #[case(WorkflowError::upstream("x"), StatusCode::BAD_GATEWAY)]
    #[case(WorkflowError::persistence("x"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn workflow_errors_map_to_statuses(#[case] error: WorkflowError, #[case] status: StatusCode) {
        assert_eq!(status_for(&error), status);
    }

    #[test]
    fn api_error_echoes_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-123"));

        let response = ApiError::new(WorkflowError::not_found("order"), &headers).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "req-123"
        );
    }

    #[test]
    fn error_response_without_request_id_serializes_null() {
        let body = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "gone")).unwrap();
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["message"], "gone");
        assert!(body["request_id"].is_null());
    }
}
