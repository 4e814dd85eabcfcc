//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use llm_balance_core::{KeyRejection, UnknownProvider};

use crate::upstream::FetchError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The supplied key failed shape validation.
    #[error(transparent)]
    InvalidKey(#[from] KeyRejection),

    /// Bad request - malformed body or invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested provider is not supported.
    #[error(transparent)]
    UnknownProvider(#[from] UnknownProvider),

    /// Route not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider rejected the key.
    #[error("API key was rejected by the provider")]
    UpstreamUnauthorized,

    /// The provider denied access for the key.
    #[error("API key is not allowed to query the balance")]
    UpstreamForbidden,

    /// The provider did not answer in time.
    #[error("provider request timed out")]
    Timeout,

    /// The provider is rate limiting the key.
    #[error("provider rate limit exceeded, retry later")]
    RateLimited,

    /// The provider failed or answered with an unexpected status.
    #[error("provider returned an error")]
    UpstreamServer,

    /// The provider could not be reached.
    #[error("provider is unreachable")]
    UpstreamUnreachable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidKey(_) | Self::BadRequest(_) | Self::UnknownProvider(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamUnauthorized => StatusCode::UNAUTHORIZED,
            Self::UpstreamForbidden => StatusCode::FORBIDDEN,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamServer => StatusCode::BAD_GATEWAY,
            Self::UpstreamUnreachable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey(rejection) => rejection.code(),
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            Self::NotFound(_) => "NOT_FOUND",
            Self::UpstreamUnauthorized => "UNAUTHORIZED",
            Self::UpstreamForbidden => "FORBIDDEN",
            Self::Timeout => "TIMEOUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::UpstreamServer => "UPSTREAM_ERROR",
            Self::UpstreamUnreachable => "NETWORK_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                "An internal error occurred".to_string()
            }
            Self::BadRequest(msg) | Self::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Attach the request ID so it is echoed in the body.
    #[must_use]
    pub fn with_request_id(self, request_id: impl Into<String>) -> ApiFailure {
        ApiFailure {
            request_id: Some(request_id.into()),
            error: self,
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout => Self::Timeout,
            FetchError::Unauthorized => Self::UpstreamUnauthorized,
            FetchError::Forbidden => Self::UpstreamForbidden,
            FetchError::RateLimited => Self::RateLimited,
            FetchError::Server { .. } | FetchError::UnexpectedStatus { .. } => Self::UpstreamServer,
            FetchError::Network(_) => Self::UpstreamUnreachable,
            FetchError::Configuration(msg) => Self::Internal(msg),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message.
    pub error: String,
    /// Machine-readable code.
    pub code: &'static str,
    /// Request ID, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    /// Build the body for an error.
    #[must_use]
    pub fn new(error: &ApiError, request_id: Option<String>) -> Self {
        Self {
            success: false,
            error: error.public_message(),
            code: error.code(),
            request_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::new(&self, None))).into_response()
    }
}

/// An [`ApiError`] tied to a request ID.
#[derive(Debug)]
pub struct ApiFailure {
    /// Request the error belongs to.
    pub request_id: Option<String>,
    /// The error.
    pub error: ApiError,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(&self.error, self.request_id);
        (self.error.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_map_to_documented_statuses() {
        let cases = [
            (FetchError::Unauthorized, StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (FetchError::Forbidden, StatusCode::FORBIDDEN, "FORBIDDEN"),
            (FetchError::Timeout, StatusCode::REQUEST_TIMEOUT, "TIMEOUT"),
            (FetchError::RateLimited, StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            (
                FetchError::Server { status: 500 },
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
            ),
            (
                FetchError::UnexpectedStatus { status: 404 },
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
            ),
            (
                FetchError::Network("connection refused".into()),
                StatusCode::SERVICE_UNAVAILABLE,
                "NETWORK_ERROR",
            ),
        ];

        for (fetch, status, code) in cases {
            let err = ApiError::from(fetch);
            assert_eq!(err.status(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn invalid_key_uses_rejection_code() {
        let err = ApiError::from(KeyRejection::TooShort { length: 8, min: 20 });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "API_KEY_TOO_SHORT");
    }

    #[test]
    fn network_detail_is_not_exposed() {
        let err = ApiError::from(FetchError::Network("dns error: api.internal".into()));
        assert!(!err.public_message().contains("api.internal"));
    }

    #[test]
    fn internal_message_is_generic() {
        let body = ErrorResponse::new(&ApiError::Internal("secret".into()), Some("r1".into()));
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "An internal error occurred");
        assert_eq!(json["requestId"], "r1");
    }
}
