//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful shutdown. A handler that
//! cannot be installed is logged and never fires.

use std::future::pending;

/// Resolve with the name of the first termination signal received.
pub async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => tokio::select! {
                _ = interrupt() => "SIGINT",
                _ = term.recv() => "SIGTERM",
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                interrupt().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        interrupt().await;
        "SIGINT"
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install SIGINT handler");
        pending::<()>().await;
    }
}
