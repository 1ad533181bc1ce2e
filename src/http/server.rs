//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router: two ingest routes, each wrapped in the
//!   method and access-control middleware
//! - Wire the cross-cutting layers (request id, tracing, envelope buffering)
//! - Serve plain HTTP or TLS on a pre-bound listener
//! - Drain in-flight requests on shutdown, bounded by the grace period
//!
//! # Layer Order (outermost first)
//! ```text
//! SetRequestId → Trace → PropagateRequestId → buffered_response → router
//!     → allowed_methods → access_control → handler
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::any;
use axum::Router;
use axum_server::Handle;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::handlers;
use crate::http::middleware::{access_control, allowed_methods, POST_ONLY};
use crate::http::request::{request_span, MakeRequestUuid};
use crate::http::response::buffered_response;
use crate::kafka::Publisher;
use crate::net::tls::load_tls_config;
use crate::security::AccessPolicy;

pub const ITEMS_PATH: &str = "/api/v1/items";
pub const EVENTS_PATH: &str = "/api/v1/events";

/// Error raised while serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),

    #[error("listener failed: {0}")]
    Io(#[from] std::io::Error),
}

/// State shared by the ingest handlers.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn Publisher>,
    pub access: Arc<AccessPolicy>,
    /// Publish tasks still running; awaited before the publisher closes.
    pub tasks: TaskTracker,
    pub max_body_size: usize,
    pub read_timeout: Duration,
}

impl AppState {
    pub fn new(publisher: Arc<dyn Publisher>, access: AccessPolicy, config: &ServerConfig) -> Self {
        Self {
            publisher,
            access: Arc::new(access),
            tasks: TaskTracker::new(),
            max_body_size: config.max_body_size,
            read_timeout: config.request_timeout(),
        }
    }
}

/// Build the router with every middleware layer applied.
pub fn build_router(state: AppState) -> Router {
    let access = middleware::from_fn_with_state(Arc::clone(&state.access), access_control);
    let methods = middleware::from_fn_with_state(POST_ONLY, allowed_methods);

    Router::new()
        .route(
            ITEMS_PATH,
            any(handlers::items).layer(access.clone()).layer(methods.clone()),
        )
        .route(
            EVENTS_PATH,
            any(handlers::events).layer(access).layer(methods),
        )
        .with_state(state)
        .layer(middleware::from_fn(buffered_response))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

struct TlsFiles {
    cert: PathBuf,
    key: PathBuf,
}

/// HTTP(S) front end of the connector.
pub struct HttpServer {
    router: Router,
    grace_period: Duration,
    tls: Option<TlsFiles>,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, state: AppState) -> Self {
        let tls = config.enable_tls.then(|| TlsFiles {
            cert: PathBuf::from(&config.cert_file),
            key: PathBuf::from(&config.key_file),
        });

        Self {
            router: build_router(state),
            grace_period: config.grace_period(),
            tls,
        }
    }

    /// Serve on `listener` until `shutdown` fires, then let in-flight
    /// requests finish within the grace period.
    pub async fn run(
        self,
        listener: std::net::TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let handle = Handle::new();
        let trigger = handle.clone();
        let grace = self.grace_period;
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!(grace = ?grace, "Draining HTTP connections");
            trigger.graceful_shutdown(Some(grace));
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        match self.tls {
            Some(files) => {
                let tls = load_tls_config(&files.cert, &files.key)
                    .await
                    .map_err(ServerError::Tls)?;
                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::from_tcp_rustls(listener, tls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum_server::from_tcp(listener)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
