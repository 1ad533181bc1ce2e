//! librdkafka client configuration.
//!
//! Maps `KafkaConfig` onto librdkafka properties:
//! - bootstrap servers, client id, retries
//! - connect/read/write timeouts
//! - idle connection limit (`keep_alive`) and TCP keep-alive probes
//! - SASL PLAIN when a username is set
//! - TLS, optionally with a CA and client certificate
//! - topic auto-creation disabled

use rdkafka::config::ClientConfig;

use crate::config::KafkaConfig;

const CLIENT_ID: &str = "kafka-connector";

/// librdkafka `security.protocol` for the given settings.
fn security_protocol(config: &KafkaConfig) -> &'static str {
    let tls = config.enable_tls || config.tls_auth;
    let sasl = !config.username.is_empty();

    match (sasl, tls) {
        (false, false) => "plaintext",
        (false, true) => "ssl",
        (true, false) => "sasl_plaintext",
        (true, true) => "sasl_ssl",
    }
}

/// Build the producer client configuration.
pub fn client_config(config: &KafkaConfig) -> ClientConfig {
    let timeout_ms = config.network_timeout().as_millis().to_string();

    let mut client = ClientConfig::new();
    client
        .set("client.id", CLIENT_ID)
        .set("bootstrap.servers", config.broker_list().join(","))
        // `keep_alive` bounds idle connections; the probe interval is the OS default.
        .set("socket.keepalive.enable", "true")
        .set("connections.max.idle.ms", config.keep_alive().as_millis().to_string())
        .set("socket.connection.setup.timeout.ms", &timeout_ms)
        .set("socket.timeout.ms", &timeout_ms)
        .set("message.send.max.retries", config.retry.to_string())
        .set("allow.auto.create.topics", "false")
        .set("security.protocol", security_protocol(config));

    if !config.username.is_empty() {
        tracing::info!(username = %config.username, "Configuring SASL PLAIN authentication");
        client
            .set("sasl.mechanism", "PLAIN")
            .set("sasl.username", &config.username)
            .set("sasl.password", &config.password);
    }

    if config.tls_auth {
        tracing::info!(ca_file = %config.ca_file, "Enabling TLS authentication for Kafka connection");
        client.set("ssl.ca.location", &config.ca_file);

        if !config.client_cert_file.is_empty() {
            client
                .set("ssl.certificate.location", &config.client_cert_file)
                .set("ssl.key.location", &config.client_key_file);
        }
    } else if config.enable_tls {
        tracing::info!("Enabling TLS for Kafka connection");
    }

    client
}
