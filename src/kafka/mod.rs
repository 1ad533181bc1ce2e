//! Kafka subsystem.
//!
//! # Data Flow
//! ```text
//! handler
//!     → publisher.rs (Publisher::produce_item / produce_event)
//!     → producer.rs (bounded enqueue into librdkafka's local queue)
//!     → librdkafka (batching, retries, delivery)
//!     → delivery.rs (failed delivery reports → background log task)
//! ```
//!
//! # Publisher States
//! `Unconnected → Connected (listener running) → Closed`; there is no way
//! back from `Closed`.

pub mod client;
pub mod delivery;
pub mod producer;
pub mod publisher;

pub use delivery::DeliveryFailure;
pub use producer::{KafkaPublisher, KafkaSetupError, ENQUEUE_TIMEOUT};
pub use publisher::Publisher;
