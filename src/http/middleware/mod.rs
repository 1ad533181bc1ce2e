//! Per-route middleware.
//!
//! Applied innermost-last, so a request meets them in this order:
//! ```text
//! methods.rs (allowed HTTP methods)
//!     → access_control.rs (peer allow-list, bearer token, content type)
//!     → handler
//! ```
//! Each check short-circuits with an `ApiError` envelope.

pub mod access_control;
pub mod methods;

pub use access_control::{access_control, check_access, NDJSON_CONTENT_TYPE};
pub use methods::{allowed_methods, POST_ONLY};
