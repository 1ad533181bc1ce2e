//! Ingest endpoint handlers.
//!
//! # Data Flow
//! ```text
//! body (bounded read) → decode_batch → publish each record in order → 201
//! ```
//!
//! # Design Decisions
//! - The response reports enqueue attempts, never broker delivery
//! - Publishing runs on a tracked task, so a dropped client connection
//!   cannot stop a batch halfway

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use crate::http::error::ApiError;
use crate::http::response::Envelope;
use crate::http::server::AppState;
use crate::ingest::{decode_batch, RecordKind};

/// `POST /api/v1/items`
pub async fn items(State(state): State<AppState>, body: Body) -> Result<Response, ApiError> {
    ingest(state, RecordKind::Item, body).await
}

/// `POST /api/v1/events`
pub async fn events(State(state): State<AppState>, body: Body) -> Result<Response, ApiError> {
    ingest(state, RecordKind::Event, body).await
}

async fn ingest(state: AppState, kind: RecordKind, body: Body) -> Result<Response, ApiError> {
    let read = axum::body::to_bytes(body, state.max_body_size);
    let bytes = tokio::time::timeout(state.read_timeout, read)
        .await
        .map_err(|_| ApiError::RequestTimeout)?
        .map_err(|e| ApiError::ReadBody(e.to_string()))?;

    let records = decode_batch(bytes.as_ref(), kind)?;
    if records.is_empty() {
        return Err(ApiError::EmptyRequest);
    }

    let count = records.len();
    let publisher = Arc::clone(&state.publisher);
    state
        .tasks
        .spawn(async move {
            for record in &records {
                publisher.publish(record).await;
            }
        })
        .await
        .map_err(|e| ApiError::Publish(e.to_string()))?;

    tracing::debug!(kind = %kind, records = count, "Batch forwarded");
    Ok(Envelope::success().into_response_with(StatusCode::CREATED))
}
