//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum-server, request id, trace span)
//!     → response.rs (buffer the response, apply the envelope policy)
//!     → middleware/ (method, peer, token, content type)
//!     → handlers.rs (decode batch, publish records)
//!     → error.rs (failures rendered as envelopes)
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use error::ApiError;
pub use response::{Envelope, Outcome};
pub use server::{build_router, AppState, HttpServer, ServerError, EVENTS_PATH, ITEMS_PATH};
