//! Access control middleware.
//!
//! Runs the peer allow-list, the bearer token and the content-type check
//! in that order; the first failure wins.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::error::ApiError;
use crate::security::AccessPolicy;

/// Media type accepted when a request declares one.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

pub async fn access_control(
    State(policy): State<Arc<AccessPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(e) = check_access(&policy, &req) {
        return e.into_response();
    }
    next.run(req).await
}

/// Evaluate `policy` against the request head.
pub fn check_access<B>(policy: &AccessPolicy, req: &axum::http::Request<B>) -> Result<(), ApiError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .ok_or(ApiError::Forbidden("peer address unknown"))?;

    if !policy.peers.allows(peer) {
        tracing::debug!(peer = %peer, "Peer not in allow-list");
        return Err(ApiError::Forbidden("ip not allowed"));
    }

    if policy.token.is_enabled() {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        policy.token.validate(header)?;
    }

    if let Some(content_type) = req.headers().get(CONTENT_TYPE) {
        if !content_type.is_empty() && content_type.as_bytes() != NDJSON_CONTENT_TYPE.as_bytes() {
            return Err(ApiError::UnsupportedMediaType);
        }
    }

    Ok(())
}
