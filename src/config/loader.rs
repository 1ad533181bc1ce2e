//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ConnectorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ConnectorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ConnectorConfig, ConfigError> {
    let config: ConnectorConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_configuration() {
        let config = parse_config(
            r#"
            [connector]
            port = 8080
            allowed_ip = "127.0.0.1,10.0.0.0/8"
            bearer_token = "foobar"
            timeout = 5

            [kafka]
            brokers = "kafka-1:9092,kafka-2:9092"
            items = "zabbix-items"
            events = "zabbix-events"
            username = "zabbix"
            password = "secret"
            retry = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.connector.port, 8080);
        assert_eq!(config.connector.token().as_deref(), Some("foobar"));
        assert_eq!(config.kafka.broker_list().len(), 2);
        assert_eq!(config.kafka.items, "zabbix-items");
        assert_eq!(config.kafka.retry, 2);
    }

    #[test]
    fn reports_validation_failures() {
        let err = parse_config("[connector]\ntimeout = 99\n").unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 2));
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("Connector.Timeout"));
    }

    #[test]
    fn reports_parse_errors() {
        let err = parse_config("[connector\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/kafka_connector.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
