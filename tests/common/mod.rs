//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::request::Builder;
use axum::http::Request;
use axum::response::Response;

use kafka_connector::config::ServerConfig;
use kafka_connector::http::{AppState, Envelope};
use kafka_connector::kafka::Publisher;
use kafka_connector::security::{AccessPolicy, AllowedPeers, BearerToken};

/// One produce call seen by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Produced {
    pub topic: &'static str,
    pub key: String,
    pub message: String,
}

/// Publisher that records every call instead of talking to a broker.
#[derive(Default)]
pub struct RecordingPublisher {
    produced: Mutex<Vec<Produced>>,
    /// Number of produce calls seen when `close` ran.
    closed_after: Mutex<Option<usize>>,
    /// Pause before each produce call completes.
    delay: Duration,
}

impl RecordingPublisher {
    #[allow(dead_code)]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn produced(&self) -> Vec<Produced> {
        self.produced.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn is_closed(&self) -> bool {
        self.closed_after.lock().unwrap().is_some()
    }

    #[allow(dead_code)]
    pub fn produced_at_close(&self) -> Option<usize> {
        *self.closed_after.lock().unwrap()
    }

    async fn record(&self, topic: &'static str, key: &str, message: &str) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.produced.lock().unwrap().push(Produced {
            topic,
            key: key.to_string(),
            message: message.to_string(),
        });
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn produce_item(&self, key: &str, message: &str) {
        self.record("items", key, message).await;
    }

    async fn produce_event(&self, key: &str, message: &str) {
        self.record("events", key, message).await;
    }

    async fn close(&self) {
        let count = self.produced.lock().unwrap().len();
        *self.closed_after.lock().unwrap() = Some(count);
    }
}

/// Server configuration allowing loopback peers only.
pub fn server_config(token: Option<&str>) -> ServerConfig {
    ServerConfig {
        bind_host: "127.0.0.1".to_string(),
        port: 0,
        allowed_ip: "127.0.0.1,::1".to_string(),
        bearer_token: token.unwrap_or_default().to_string(),
        ..ServerConfig::default()
    }
}

/// Allow-list and token policy for `config`.
pub fn access_policy(config: &ServerConfig) -> AccessPolicy {
    let peers = AllowedPeers::parse(&config.allowed_ip).unwrap();
    AccessPolicy::new(peers, BearerToken::new(config.token()))
}

#[allow(dead_code)]
pub fn app_state(publisher: Arc<RecordingPublisher>, config: &ServerConfig) -> AppState {
    AppState::new(publisher, access_policy(config), config)
}

/// Request builder that looks like it arrived from `peer`.
#[allow(dead_code)]
pub fn from_peer(method: &str, path: &str, peer: &str) -> Builder {
    let addr: SocketAddr = peer.parse().unwrap();
    let mut builder = Request::builder().method(method).uri(path);
    builder.extensions_mut().unwrap().insert(ConnectInfo(addr));
    builder
}

#[allow(dead_code)]
pub fn ndjson(method: &str, path: &str, body: &str) -> Request<Body> {
    from_peer(method, path, "127.0.0.1:40000")
        .header("content-type", "application/x-ndjson")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn read_envelope(response: Response) -> Envelope {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
