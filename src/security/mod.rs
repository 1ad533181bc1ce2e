//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → peers.rs (remote address against the allow-list)
//!     → token.rs (bearer token, when configured)
//!     → Pass to content-type check and handler
//! ```
//!
//! # Design Decisions
//! - Both checks are pure predicates built once at startup
//! - Fail closed: reject on any security check failure

pub mod peers;
pub mod token;

pub use peers::{AllowedPeers, PeerError};
pub use token::{BearerToken, TokenError};

/// Access policy applied to every ingest route.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub peers: AllowedPeers,
    pub token: BearerToken,
}

impl AccessPolicy {
    pub fn new(peers: AllowedPeers, token: BearerToken) -> Self {
        Self { peers, token }
    }
}
