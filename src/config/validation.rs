//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts, keep-alive, log level)
//! - Check that TLS material is present when TLS is requested
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConnectorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::config::schema::{ConnectorConfig, KafkaConfig, ServerConfig};

const TIMEOUT_RANGE: RangeInclusive<u64> = 1..=30;
const KEEP_ALIVE_RANGE: RangeInclusive<u64> = 60..=300;
const LOG_LEVEL_RANGE: RangeInclusive<u8> = 0..=5;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("invalid listen address: {0}")]
    ListenAddress(String),

    #[error("unknown log type {0:?}, expected \"console\" or \"file\"")]
    LogType(String),

    #[error("both tls certificate and key file paths must be set")]
    ListenerTls,

    #[error("kafka tls authentication requires {0}")]
    KafkaTls(&'static str),

    #[error("kafka password is set without a username")]
    PasswordWithoutUser,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ConnectorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_server(&config.connector, &mut errors);
    validate_kafka(&config.kafka, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_server(config: &ServerConfig, errors: &mut Vec<ValidationError>) {
    check_range("Connector.Timeout", config.timeout, TIMEOUT_RANGE, errors);
    check_range(
        "Connector.LogLevel",
        u64::from(config.log_level),
        u64::from(*LOG_LEVEL_RANGE.start())..=u64::from(*LOG_LEVEL_RANGE.end()),
        errors,
    );

    if config.allowed_ip.trim().is_empty() {
        errors.push(ValidationError::Empty("Connector.AllowedIP"));
    }

    if let Err(e) = config.listen_address() {
        errors.push(ValidationError::ListenAddress(e.to_string()));
    }

    match config.log_type.as_str() {
        "console" => {}
        "file" => {
            if config.log_file.is_empty() {
                errors.push(ValidationError::Empty("Connector.LogFile"));
            }
        }
        other => errors.push(ValidationError::LogType(other.to_string())),
    }

    if config.enable_tls && (config.cert_file.is_empty() || config.key_file.is_empty()) {
        errors.push(ValidationError::ListenerTls);
    }

    if config.max_body_size == 0 {
        errors.push(ValidationError::Empty("Connector.MaxBodySize"));
    }
}

fn validate_kafka(config: &KafkaConfig, errors: &mut Vec<ValidationError>) {
    check_range("Kafka.KeepAlive", config.keep_alive, KEEP_ALIVE_RANGE, errors);

    if config.timeout == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "Kafka.Timeout",
            min: 1,
            max: u64::MAX,
            value: 0,
        });
    }

    if config.broker_list().is_empty() {
        errors.push(ValidationError::Empty("Kafka.Brokers"));
    }
    if config.items.trim().is_empty() {
        errors.push(ValidationError::Empty("Kafka.Items"));
    }
    if config.events.trim().is_empty() {
        errors.push(ValidationError::Empty("Kafka.Events"));
    }

    if config.username.is_empty() && !config.password.is_empty() {
        errors.push(ValidationError::PasswordWithoutUser);
    }

    if config.tls_auth {
        if config.ca_file.is_empty() {
            errors.push(ValidationError::KafkaTls("a CA file"));
        }
        if config.client_cert_file.is_empty() != config.client_key_file.is_empty() {
            errors.push(ValidationError::KafkaTls("both client certificate and key files"));
        }
    }
}

fn check_range(
    field: &'static str,
    value: u64,
    range: RangeInclusive<u64>,
    errors: &mut Vec<ValidationError>,
) {
    if !range.contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field,
            min: *range.start(),
            max: *range.end(),
            value,
        });
    }
}
