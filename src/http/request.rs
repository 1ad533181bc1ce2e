//! Request correlation.
//!
//! # Responsibilities
//! - Assign a UUID v4 `x-request-id` to every request lacking one
//! - Open the per-request trace span carrying that id
//!
//! # Design Decisions
//! - A caller-supplied id is kept, so ids survive upstream proxies
//! - The id is echoed on the response by `PropagateRequestIdLayer`

use axum::extract::Request;
use axum::http::HeaderValue;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Span for one request, tagged with its id.
pub fn request_span(req: &Request) -> Span {
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn generated_ids_are_uuids() {
        let req = Request::new(Body::empty());
        let id = MakeRequestUuid.make_request_id(&req).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }

    #[test]
    fn generated_ids_differ() {
        let req = Request::new(Body::empty());
        let a = MakeRequestUuid.make_request_id(&req).unwrap();
        let b = MakeRequestUuid.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
