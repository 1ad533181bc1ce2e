//! Request failures and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::Envelope;
use crate::ingest::DecodeError;
use crate::security::TokenError;

/// Every way a request can fail after routing.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("ip validation failed, {0}")]
    Forbidden(&'static str),

    #[error("bearer token validation failed, {0}")]
    Token(#[from] TokenError),

    #[error("Content-Type header must contain application/x-ndjson")]
    UnsupportedMediaType,

    #[error("Request Timeout")]
    RequestTimeout,

    #[error("failed to read request: {0}")]
    ReadBody(String),

    #[error("failed to read request: {0}")]
    Decode(#[from] DecodeError),

    #[error("empty request")]
    EmptyRequest,

    #[error("failed to publish request: {0}")]
    Publish(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Token(e) => e.status(),
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::ReadBody(_)
            | ApiError::Decode(_)
            | ApiError::EmptyRequest
            | ApiError::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Failed to handle request");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        Envelope::fail(self.to_string()).into_response_with(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_wire_contract() {
        assert_eq!(
            ApiError::Forbidden("ip not allowed").to_string(),
            "ip validation failed, ip not allowed"
        );
        assert_eq!(
            ApiError::Token(TokenError::Mismatch).to_string(),
            "bearer token validation failed, incorrect bearer auth token"
        );
        assert_eq!(ApiError::EmptyRequest.to_string(), "empty request");
    }

    #[test]
    fn statuses_follow_failing_check() {
        assert_eq!(ApiError::Token(TokenError::Missing).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Token(TokenError::Mismatch).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::UnsupportedMediaType.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(ApiError::EmptyRequest.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
