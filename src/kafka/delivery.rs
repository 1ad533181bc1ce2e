//! Delivery report handling.
//!
//! # Responsibilities
//! - Receive librdkafka delivery callbacks on the producer's poll thread
//! - Forward failed deliveries to a bounded channel
//! - Drain that channel on a background task and log each failure
//!
//! # Design Decisions
//! - Observability only: failed messages are not retried or persisted
//! - The channel is bounded; when full, the failure is logged inline
//! - The drain task stops when its cancellation token fires

use rdkafka::config::RDKafkaLogLevel;
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{DeliveryResult, ProducerContext};
use rdkafka::ClientContext;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;

/// Capacity of the delivery failure channel.
pub const DELIVERY_FAILURE_BUFFER: usize = 1024;

/// A message the broker did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub topic: String,
    pub key: String,
    pub error: String,
}

fn report(failure: &DeliveryFailure) {
    metrics::record_delivery_failure(&failure.topic);
    tracing::error!(
        topic = %failure.topic,
        key = %failure.key,
        error = %failure.error,
        "Kafka producer error"
    );
}

/// Producer context that forwards delivery failures.
pub struct DeliveryReporter {
    failures: mpsc::Sender<DeliveryFailure>,
}

impl DeliveryReporter {
    pub fn new(failures: mpsc::Sender<DeliveryFailure>) -> Self {
        Self { failures }
    }

    fn forward(&self, failure: DeliveryFailure) {
        match self.failures.try_send(failure) {
            Ok(()) => {}
            Err(TrySendError::Full(failure)) | Err(TrySendError::Closed(failure)) => {
                report(&failure);
            }
        }
    }
}

impl ClientContext for DeliveryReporter {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        match level {
            RDKafkaLogLevel::Emerg
            | RDKafkaLogLevel::Alert
            | RDKafkaLogLevel::Critical
            | RDKafkaLogLevel::Error => {
                tracing::error!(facility = fac, "librdkafka: {}", log_message)
            }
            RDKafkaLogLevel::Warning => tracing::warn!(facility = fac, "librdkafka: {}", log_message),
            RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => {
                tracing::info!(facility = fac, "librdkafka: {}", log_message)
            }
            RDKafkaLogLevel::Debug => tracing::debug!(facility = fac, "librdkafka: {}", log_message),
        }
    }

    fn error(&self, error: KafkaError, reason: &str) {
        tracing::error!(error = %error, reason, "Kafka client error");
    }
}

impl ProducerContext for DeliveryReporter {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _: Self::DeliveryOpaque) {
        if let Err((error, message)) = delivery_result {
            self.forward(DeliveryFailure {
                topic: message.topic().to_string(),
                key: message
                    .key()
                    .map(|k| String::from_utf8_lossy(k).into_owned())
                    .unwrap_or_default(),
                error: error.to_string(),
            });
        }
    }
}

/// Log delivery failures until `cancel` fires or every sender is gone.
///
/// Failures already queued when cancellation arrives are still logged.
pub async fn drain_delivery_failures(
    mut failures: mpsc::Receiver<DeliveryFailure>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            failure = failures.recv() => match failure {
                Some(failure) => report(&failure),
                None => break,
            },
            _ = cancel.cancelled() => {
                while let Ok(failure) = failures.try_recv() {
                    report(&failure);
                }
                break;
            }
        }
    }

    tracing::debug!("Delivery error listener stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn failure(key: &str) -> DeliveryFailure {
        DeliveryFailure {
            topic: "items".to_string(),
            key: key.to_string(),
            error: "Broker: Unknown topic or partition".to_string(),
        }
    }

    #[tokio::test]
    async fn drain_stops_on_cancel() {
        let (tx, rx) = mpsc::channel(DELIVERY_FAILURE_BUFFER);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(drain_delivery_failures(rx, cancel.clone()));

        tx.send(failure("1")).await.unwrap();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("drain task did not stop")
            .unwrap();
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn drain_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(drain_delivery_failures(rx, CancellationToken::new()));

        tx.send(failure("1")).await.unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("drain task did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn drain_with_pending_failures_finishes_after_cancel() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(failure("1")).await.unwrap();
        tx.send(failure("2")).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), drain_delivery_failures(rx, cancel))
            .await
            .expect("drain did not finish");
        assert!(tx.is_closed());
    }

    #[test]
    fn full_channel_falls_back_to_inline_report() {
        let (tx, mut rx) = mpsc::channel(1);
        let reporter = DeliveryReporter::new(tx);

        reporter.forward(failure("1"));
        reporter.forward(failure("2"));

        assert_eq!(rx.try_recv().unwrap().key, "1");
        assert!(rx.try_recv().is_err());
    }
}
