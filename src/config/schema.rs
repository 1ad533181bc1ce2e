//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the connector.
//! All types derive Serde traits for deserialization from config files.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the connector.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConnectorConfig {
    /// HTTP intake settings (listener, access control, logging).
    pub connector: ServerConfig,

    /// Kafka producer settings.
    pub kafka: KafkaConfig,
}

/// HTTP intake configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,

    /// Listen host (e.g., "0.0.0.0" or "::").
    pub bind_host: String,

    /// Comma-separated list of addresses, CIDR blocks and hostnames
    /// allowed to send data.
    pub allowed_ip: String,

    /// Bearer token required in the `Authorization` header.
    /// Empty disables token authentication.
    pub bearer_token: String,

    /// Serve HTTPS instead of plain HTTP.
    pub enable_tls: bool,

    /// Path to the listener certificate (PEM).
    pub cert_file: String,

    /// Path to the listener private key (PEM).
    pub key_file: String,

    /// Request timeout in seconds.
    pub timeout: u64,

    /// Seconds in-flight requests get to finish on shutdown.
    pub shutdown_grace: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,

    /// Log destination: "console" or "file".
    pub log_type: String,

    /// Log file path, used when `log_type` is "file".
    pub log_file: String,

    /// Log verbosity, 0 (info) to 5 (trace).
    pub log_level: u8,

    /// Prometheus exporter bind address. Unset disables the exporter.
    pub metrics_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 80,
            bind_host: "0.0.0.0".to_string(),
            allowed_ip: String::new(),
            bearer_token: String::new(),
            enable_tls: false,
            cert_file: String::new(),
            key_file: String::new(),
            timeout: 3,
            shutdown_grace: 5,
            max_body_size: 16 * 1024 * 1024,
            log_type: "console".to_string(),
            log_file: "/tmp/kafka-connector.log".to_string(),
            log_level: 3,
            metrics_address: None,
        }
    }
}

impl ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub fn listen_address(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let host = self.bind_host.trim_start_matches('[').trim_end_matches(']');
        if host.contains(':') {
            format!("[{}]:{}", host, self.port).parse()
        } else {
            format!("{}:{}", host, self.port).parse()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }

    /// Configured bearer token, `None` when authentication is disabled.
    pub fn token(&self) -> Option<String> {
        if self.bearer_token.is_empty() {
            None
        } else {
            Some(self.bearer_token.clone())
        }
    }
}

/// Kafka producer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap broker list.
    pub brokers: String,

    /// Topic receiving item records.
    pub items: String,

    /// Topic receiving event records.
    pub events: String,

    /// Seconds a broker connection may sit idle before it is closed
    /// (`connections.max.idle.ms`).
    ///
    /// This is not a TCP keep-alive period: keep-alive probes are always
    /// enabled on broker sockets and their interval is left to the OS.
    pub keep_alive: u64,

    /// SASL PLAIN username. Empty disables SASL.
    pub username: String,

    /// SASL PLAIN password.
    pub password: String,

    /// Encrypt the broker connection.
    pub enable_tls: bool,

    /// Encrypt and authenticate with the CA and client certificate below.
    pub tls_auth: bool,

    pub ca_file: String,
    pub client_cert_file: String,
    pub client_key_file: String,

    /// Producer retries per message, performed by the Kafka client.
    pub retry: u32,

    /// Connect, read and write timeout in seconds.
    pub timeout: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            items: "items".to_string(),
            events: "events".to_string(),
            keep_alive: 300,
            username: String::new(),
            password: String::new(),
            enable_tls: false,
            tls_auth: false,
            ca_file: String::new(),
            client_cert_file: String::new(),
            client_key_file: String::new(),
            retry: 0,
            timeout: 1,
        }
    }
}

impl KafkaConfig {
    /// Broker endpoints with surrounding whitespace removed.
    pub fn broker_list(&self) -> Vec<String> {
        self.brokers
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Idle lifetime of a broker connection.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let config: ConnectorConfig = toml::from_str(
            r#"
            [connector]
            allowed_ip = "127.0.0.1"
            "#,
        )
        .unwrap();

        assert_eq!(config.connector.port, 80);
        assert_eq!(config.connector.timeout, 3);
        assert_eq!(config.kafka.items, "items");
        assert_eq!(config.kafka.events, "events");
        assert_eq!(config.kafka.keep_alive, 300);
        assert!(config.connector.token().is_none());
    }

    #[test]
    fn broker_list_trims_entries() {
        let config = KafkaConfig {
            brokers: " a:9092, b:9092 ,,c:9092".to_string(),
            ..KafkaConfig::default()
        };
        assert_eq!(config.broker_list(), vec!["a:9092", "b:9092", "c:9092"]);
    }

    #[test]
    fn listen_address_handles_ipv6_hosts() {
        let mut config = ServerConfig {
            port: 8080,
            ..ServerConfig::default()
        };
        assert_eq!(config.listen_address().unwrap().to_string(), "0.0.0.0:8080");

        config.bind_host = "::".to_string();
        assert_eq!(config.listen_address().unwrap().to_string(), "[::]:8080");
    }
}
