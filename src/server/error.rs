//! HTTP rendering of crate errors.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::HuginnError;

/// JSON error body: `{"error": ..., "details": ...}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A [`HuginnError`] on its way out of an HTTP handler.
#[derive(Debug)]
pub struct ApiError(pub HuginnError);

impl From<HuginnError> for ApiError {
    fn from(err: HuginnError) -> Self {
        Self(err)
    }
}

/// Unreadable request bodies (bad JSON, wrong shape, missing
/// `Content-Type`) are the client's fault.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(HuginnError::InvalidInput(rejection.body_text()))
    }
}

impl ApiError {
    /// Status code and body for this error.
    pub fn parts(&self) -> (StatusCode, ErrorBody) {
        let plain = |status, error: &str| {
            (
                status,
                ErrorBody {
                    error: error.to_string(),
                    details: None,
                },
            )
        };

        match &self.0 {
            HuginnError::InvalidInput(message) => plain(StatusCode::BAD_REQUEST, message),
            HuginnError::MissingApiKey => plain(
                StatusCode::SERVICE_UNAVAILABLE,
                "API key is not configured. Set GROQ_API_KEY or add it to secrets.toml and restart the server.",
            ),
            HuginnError::AuthenticationFailed => plain(
                StatusCode::UNAUTHORIZED,
                "Invalid API key. Check the configured GROQ_API_KEY.",
            ),
            HuginnError::QueueClosed => plain(
                StatusCode::SERVICE_UNAVAILABLE,
                "The completion service is shutting down.",
            ),
            HuginnError::Fetch(err) => plain(
                StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                &err.to_string(),
            ),
            HuginnError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody {
                    error: "Failed to get a response from the AI".to_string(),
                    details: Some(self.0.to_string()),
                },
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Failed to get a response from the AI".to_string(),
                    details: Some(other.to_string()),
                },
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FetchError;

    #[test]
    fn invalid_input_is_bad_request() {
        let (status, body) = ApiError(HuginnError::InvalidInput("Message is required".into())).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Message is required");
        assert!(body.details.is_none());
    }

    #[test]
    fn missing_key_is_unavailable() {
        let (status, _) = ApiError(HuginnError::MissingApiKey).parts();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn auth_failure_is_unauthorized() {
        let (status, _) = ApiError(HuginnError::AuthenticationFailed).parts();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn fetch_errors_keep_their_status() {
        let (status, body) = ApiError(FetchError::Timeout.into()).parts();
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body.error, FetchError::Timeout.to_string());
    }

    #[test]
    fn provider_errors_carry_details() {
        let err = HuginnError::Api {
            status: 500,
            message: "boom".into(),
        };
        let (status, body) = ApiError(err).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.details.unwrap().contains("boom"));
    }
}
