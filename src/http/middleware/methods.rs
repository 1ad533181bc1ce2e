//! HTTP method restriction.

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::error::ApiError;

/// Methods accepted by the ingest routes.
pub const POST_ONLY: &[Method] = &[Method::POST];

/// Reject requests whose method is not in `allowed`.
pub async fn allowed_methods(
    State(allowed): State<&'static [Method]>,
    req: Request,
    next: Next,
) -> Response {
    if !allowed.contains(req.method()) {
        return ApiError::MethodNotAllowed.into_response();
    }
    next.run(req).await
}
