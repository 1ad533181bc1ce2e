//! Network layer.
//!
//! # Data Flow
//! ```text
//! listener.rs (bind the configured address, before serving)
//!     → tls.rs (optional rustls config from PEM files)
//!     → Hand off to the HTTP server
//! ```
//!
//! # Design Decisions
//! - The socket is bound up front so bind errors are startup errors
//! - TLS is optional and handled by axum-server

pub mod listener;
pub mod tls;

pub use listener::{bind, ListenerError};
