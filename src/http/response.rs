//! Response envelope and buffering.
//!
//! # Responsibilities
//! - Define the JSON envelope every response body uses
//! - Buffer the inner response so status, headers and body go out once
//! - Replace empty error bodies (router 404) with an envelope
//! - Stamp `Content-Type: application/json` and `X-Content-Type-Options`
//!
//! # Design Decisions
//! - A 404 is always rewritten, whatever the inner body was
//! - Other error statuses are rewritten only when their body is empty
//! - Bodies produced by this service are small, so buffering is cheap

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::server::{EVENTS_PATH, ITEMS_PATH};
use crate::observability::metrics;

/// Top-level outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Fail,
}

/// The only body shape returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub response: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn success() -> Self {
        Self {
            response: Outcome::Success,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            response: Outcome::Fail,
            error: Some(error.into()),
        }
    }

    /// Pair the envelope with a status.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Outermost application middleware: buffers the response and applies the
/// envelope and header policy.
pub async fn buffered_response(req: Request, next: Next) -> Response {
    let route = route_label(req.uri().path());
    let response = next.run(req).await;
    let (mut parts, body) = response.into_parts();

    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) if !needs_envelope(parts.status, bytes.is_empty()) => Body::from(bytes),
        Ok(_) => fallback_body(parts.status),
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer response body");
            parts.status = StatusCode::INTERNAL_SERVER_ERROR;
            fallback_body(parts.status)
        }
    };

    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts
        .headers
        .insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    metrics::record_request(route, parts.status.as_u16());
    Response::from_parts(parts, body)
}

fn needs_envelope(status: StatusCode, empty: bool) -> bool {
    status == StatusCode::NOT_FOUND || (empty && (status.is_client_error() || status.is_server_error()))
}

fn fallback_body(status: StatusCode) -> Body {
    let reason = status.canonical_reason().unwrap_or("Unknown Error");
    match serde_json::to_vec(&Envelope::fail(reason)) {
        Ok(json) => Body::from(json),
        Err(_) => Body::empty(),
    }
}

fn route_label(path: &str) -> &'static str {
    match path {
        ITEMS_PATH => "items",
        EVENTS_PATH => "events",
        _ => "unmatched",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_error() {
        let json = serde_json::to_string(&Envelope::success()).unwrap();
        assert_eq!(json, r#"{"response":"success"}"#);
    }

    #[test]
    fn fail_envelope_carries_error() {
        let json = serde_json::to_string(&Envelope::fail("empty request")).unwrap();
        assert_eq!(json, r#"{"response":"fail","error":"empty request"}"#);
    }

    #[test]
    fn not_found_is_always_rewritten() {
        assert!(needs_envelope(StatusCode::NOT_FOUND, false));
        assert!(needs_envelope(StatusCode::NOT_FOUND, true));
    }

    #[test]
    fn only_empty_errors_are_rewritten() {
        assert!(needs_envelope(StatusCode::REQUEST_TIMEOUT, true));
        assert!(!needs_envelope(StatusCode::FORBIDDEN, false));
        assert!(!needs_envelope(StatusCode::CREATED, true));
    }

    #[test]
    fn routes_are_labelled() {
        assert_eq!(route_label("/api/v1/items"), "items");
        assert_eq!(route_label("/api/v1/events"), "events");
        assert_eq!(route_label("/api/v1/other"), "unmatched");
    }
}
