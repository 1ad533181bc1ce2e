//! Listener binding.

use std::net::{SocketAddr, TcpListener};

use thiserror::Error;

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid listen address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind the configured host and port.
pub fn bind(config: &ServerConfig) -> Result<TcpListener, ListenerError> {
    let address = config
        .listen_address()
        .map_err(|source| ListenerError::Address {
            address: format!("{}:{}", config.bind_host, config.port),
            source,
        })?;

    let listener =
        TcpListener::bind(address).map_err(|source| ListenerError::Bind { address, source })?;

    tracing::info!(address = %address, "Listener bound");
    Ok(listener)
}
