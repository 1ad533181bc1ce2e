//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and initialize logging and metrics
//! - Connect the publisher before any traffic is accepted
//! - Build the allow-list, bind the listener and serve
//! - On a signal: drain HTTP, wait for publish tasks, close the publisher
//!
//! # Design Decisions
//! - Fail fast: every startup error is fatal and returned to `main`
//! - The publisher is closed on every exit path once connected
//! - Publish tasks get the same grace period as HTTP connections

use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;

use crate::config::{load_config, ConfigError, ServerConfig};
use crate::http::{AppState, HttpServer, ServerError};
use crate::kafka::{KafkaPublisher, KafkaSetupError, Publisher};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::net::{self, ListenerError};
use crate::observability::logging::{init_logging, LoggingError};
use crate::observability::metrics::init_metrics;
use crate::security::{AccessPolicy, AllowedPeers, BearerToken, PeerError};

/// Fatal error; the message is prefixed with what was being attempted.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load the configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize logger: {0}")]
    Logging(#[from] LoggingError),

    #[error("failed to initialize kafka producer: {0}")]
    Kafka(#[from] KafkaSetupError),

    #[error("failed to initialize allowed ip: {0}")]
    Peers(#[from] PeerError),

    #[error("failed to start listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("server failed: {0}")]
    Server(#[from] ServerError),

    #[error("server task failed: {0}")]
    Join(#[from] JoinError),
}

/// Run the connector until a termination signal or a server failure.
pub async fn run(config_path: &Path) -> Result<(), StartupError> {
    let config = load_config(config_path)?;
    let _log_guard = init_logging(&config.connector)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting Kafka connector"
    );

    start_metrics(&config.connector);

    let publisher: Arc<dyn Publisher> = Arc::new(KafkaPublisher::connect(&config.kafka).await?);

    let (access, listener) = match prepare(&config.connector) {
        Ok(prepared) => prepared,
        Err(e) => {
            publisher.close().await;
            return Err(e);
        }
    };

    let result = serve(&config.connector, publisher, access, listener, shutdown_requested()).await;
    tracing::info!("Kafka connector stopped");
    result
}

/// Build the allow-list, then bind the listener.
fn prepare(config: &ServerConfig) -> Result<(AccessPolicy, TcpListener), StartupError> {
    let peers = AllowedPeers::parse(&config.allowed_ip)?;
    tracing::debug!(entries = peers.len(), "Allow-list built");
    let access = AccessPolicy::new(peers, BearerToken::new(config.token()));

    let listener = net::bind(config)?;
    Ok((access, listener))
}

async fn shutdown_requested() {
    let signal = wait_for_signal().await;
    tracing::info!(signal, "Shutdown requested");
}

/// Serve on `listener` until `shutdown` resolves or the server fails.
///
/// Then, in order: stop accepting and drain connections, wait for
/// publish tasks (bounded by the grace period), close `publisher`.
pub async fn serve<F>(
    config: &ServerConfig,
    publisher: Arc<dyn Publisher>,
    access: AccessPolicy,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send,
{
    let state = AppState::new(Arc::clone(&publisher), access, config);
    let tasks = state.tasks.clone();
    let server = HttpServer::new(config, state);

    let stop = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, stop.subscribe()));

    let finished = tokio::select! {
        _ = shutdown => None,
        result = &mut server_task => Some(result),
    };

    stop.trigger();
    let result = match finished {
        Some(result) => result,
        None => server_task.await,
    };

    tasks.close();
    if tokio::time::timeout(config.grace_period(), tasks.wait())
        .await
        .is_err()
    {
        tracing::warn!(pending = tasks.len(), "Publish tasks still running after grace period");
    }

    publisher.close().await;

    result??;
    Ok(())
}

fn start_metrics(config: &ServerConfig) {
    let Some(address) = config.metrics_address.as_deref() else {
        return;
    };

    match address.parse::<SocketAddr>() {
        Ok(addr) => {
            if let Err(e) = init_metrics(addr) {
                tracing::error!(error = %e, address, "Failed to start metrics exporter");
            }
        }
        Err(e) => tracing::error!(error = %e, address, "Failed to parse metrics address"),
    }
}
