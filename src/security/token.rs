//! Bearer token validation.

use axum::http::StatusCode;
use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

/// Reason a presented `Authorization` header was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("failed to retrieve bearer auth token")]
    Missing,

    #[error("incorrect bearer auth token")]
    Mismatch,
}

impl TokenError {
    /// HTTP status implied by the failure.
    pub fn status(&self) -> StatusCode {
        match self {
            TokenError::Missing => StatusCode::BAD_REQUEST,
            TokenError::Mismatch => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Configured shared secret for the ingest endpoints.
///
/// With no token configured every request passes.
#[derive(Debug, Clone, Default)]
pub struct BearerToken {
    expected: Option<String>,
}

impl BearerToken {
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    /// Check the raw `Authorization` header value.
    // TODO: compare in constant time.
    pub fn validate(&self, header: Option<&str>) -> Result<(), TokenError> {
        let Some(expected) = self.expected.as_deref() else {
            return Ok(());
        };

        let presented = header
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .ok_or(TokenError::Missing)?;

        if presented != expected {
            return Err(TokenError::Mismatch);
        }

        Ok(())
    }
}
