//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (console or append-only file)
//! - Map the numeric log level onto a tracing filter
//!
//! # Design Decisions
//! - `RUST_LOG`, when set, overrides the configured level
//! - File output is written without ANSI colors by a background writer
//!   thread; the returned guard flushes it on drop

use std::fs::OpenOptions;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("can not open log file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("can not install logger: {0}")]
    Init(#[from] TryInitError),
}

/// Filter directive for a numeric log level.
///
/// 0 is info, 1 and 2 are error, 3 is warn, 4 is debug, 5 is trace.
pub fn level_directive(log_level: u8) -> &'static str {
    match log_level {
        0 => "info",
        1 | 2 => "error",
        3 => "warn",
        4 => "debug",
        5 => "trace",
        _ => "info",
    }
}

/// Install the global subscriber described by `config`.
///
/// File logging returns a guard that must be held until exit.
pub fn init_logging(config: &ServerConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(config.log_level)));

    if config.log_type == "file" {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .map_err(|source| LoggingError::Open {
                path: config.log_file.clone(),
                source,
            })?;

        let (writer, guard) = tracing_appender::non_blocking(file);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .try_init()?;
        return Ok(Some(guard));
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_numeric_levels() {
        assert_eq!(level_directive(0), "info");
        assert_eq!(level_directive(1), "error");
        assert_eq!(level_directive(2), "error");
        assert_eq!(level_directive(3), "warn");
        assert_eq!(level_directive(4), "debug");
        assert_eq!(level_directive(5), "trace");
        assert_eq!(level_directive(42), "info");
    }

    #[test]
    fn unopenable_log_file_is_reported() {
        let config = ServerConfig {
            log_type: "file".to_string(),
            log_file: "/nonexistent-dir/connector.log".to_string(),
            ..ServerConfig::default()
        };

        assert!(matches!(init_logging(&config), Err(LoggingError::Open { .. })));
    }

    #[test]
    fn file_logging_flushes_when_guard_drops() {
        let path = std::env::temp_dir().join(format!("connector-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let config = ServerConfig {
            log_type: "file".to_string(),
            log_file: path.display().to_string(),
            log_level: 3,
            ..ServerConfig::default()
        };

        let guard = init_logging(&config).unwrap();
        assert!(guard.is_some());
        tracing::error!(topic = "items", "record dropped");
        drop(guard);

        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(written.contains("record dropped"));
        assert!(written.contains("topic=\"items\""));
        assert!(!written.contains('\u{1b}'));
    }
}
