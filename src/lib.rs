//! HTTP to Kafka telemetry connector.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /api/v1/items ─┐
//!   POST /api/v1/events ┤
//!                       ▼
//!   ┌──────┐   ┌─────────────────────────────┐   ┌────────┐   ┌──────────────┐
//!   │ net  │──▶│ http                        │──▶│ ingest │──▶│ kafka        │──▶ brokers
//!   │      │   │ methods → security → handler│   │ decode │   │ publisher    │
//!   └──────┘   └─────────────────────────────┘   └────────┘   └──────┬───────┘
//!                                                                    │ delivery
//!                                                                    ▼ failures
//!                                                             background drain
//!
//!   Cross-cutting: config, observability (logging, metrics), lifecycle
//! ```

pub mod config;
pub mod http;
pub mod ingest;
pub mod kafka;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::ConnectorConfig;
pub use http::HttpServer;
pub use kafka::{KafkaPublisher, Publisher};
pub use lifecycle::Shutdown;
