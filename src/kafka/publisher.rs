//! Publishing seam between the HTTP layer and the broker.

use async_trait::async_trait;

use crate::ingest::{Record, RecordKind};

/// Forwards records to the broker.
///
/// Produce calls return once the message is handed to the client or
/// dropped; they never wait for delivery. Callers must stop producing
/// before calling `close`.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Produce to the items topic.
    async fn produce_item(&self, key: &str, message: &str);

    /// Produce to the events topic.
    async fn produce_event(&self, key: &str, message: &str);

    /// Release the broker connection.
    async fn close(&self);

    /// Produce `record` to the topic of its kind.
    async fn publish(&self, record: &Record) {
        let key = record.key();
        match record.kind() {
            RecordKind::Item => self.produce_item(&key, record.raw_payload()).await,
            RecordKind::Event => self.produce_event(&key, record.raw_payload()).await,
        }
    }
}
