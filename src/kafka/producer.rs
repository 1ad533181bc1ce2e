//! Kafka publisher.
//!
//! # Responsibilities
//! - Own the single producer connection for the process lifetime
//! - Verify broker reachability at startup
//! - Enqueue messages with a bounded wait, dropping them on timeout
//! - Run the delivery failure listener until close
//!
//! # Design Decisions
//! - Enqueue never waits for delivery acknowledgment
//! - The enqueue wait is fixed and independent of the network timeout
//! - Close is idempotent; failures are logged, not returned

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{BaseRecord, Producer, ThreadedProducer};
use rdkafka::util::Timeout;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::KafkaConfig;
use crate::kafka::client::client_config;
use crate::kafka::delivery::{
    drain_delivery_failures, DeliveryReporter, DELIVERY_FAILURE_BUFFER,
};
use crate::kafka::publisher::Publisher;
use crate::observability::metrics;

/// Maximum time a publish call waits for room in the local queue.
pub const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(3);

/// Pause between enqueue attempts while the local queue is full.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(50);

/// Lower bound for the startup metadata request.
const MIN_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Time given to outstanding messages on close.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Error raised while setting up the producer.
#[derive(Debug, Error)]
pub enum KafkaSetupError {
    #[error("async producer init failed: {0}")]
    Create(#[source] KafkaError),

    #[error("failed to connect to kafka brokers {brokers}: {source}")]
    Connect {
        brokers: String,
        #[source]
        source: KafkaError,
    },

    #[error("kafka connection check aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Why a single enqueue attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// Local queue is full; worth another attempt.
    QueueFull,
    /// The client refused the message outright.
    Fatal(String),
}

impl From<KafkaError> for SendFailure {
    fn from(err: KafkaError) -> Self {
        match err {
            KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull) => SendFailure::QueueFull,
            other => SendFailure::Fatal(other.to_string()),
        }
    }
}

/// Result of a bounded enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    TimedOut,
    Rejected(String),
    /// The publisher was already closed; nothing was sent.
    Closed,
}

/// Call `try_send` until it succeeds, fails fatally, or `timeout` passes.
pub async fn enqueue_within<F>(timeout: Duration, mut try_send: F) -> EnqueueOutcome
where
    F: FnMut() -> Result<(), SendFailure>,
{
    let deadline = Instant::now() + timeout;

    loop {
        match try_send() {
            Ok(()) => return EnqueueOutcome::Enqueued,
            Err(SendFailure::Fatal(reason)) => return EnqueueOutcome::Rejected(reason),
            Err(SendFailure::QueueFull) => {
                let now = Instant::now();
                if now >= deadline {
                    return EnqueueOutcome::TimedOut;
                }
                tokio::time::sleep(QUEUE_FULL_BACKOFF.min(deadline - now)).await;
            }
        }
    }
}

/// Publisher backed by librdkafka.
pub struct KafkaPublisher {
    producer: Arc<ThreadedProducer<DeliveryReporter>>,
    items_topic: String,
    events_topic: String,
    enqueue_timeout: Duration,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl KafkaPublisher {
    /// Create the producer, check that the brokers answer and start the
    /// delivery failure listener.
    pub async fn connect(config: &KafkaConfig) -> Result<Self, KafkaSetupError> {
        let publisher = Self::create(config)?;

        let checker = Arc::clone(&publisher.producer);
        let timeout = config.network_timeout().max(MIN_CONNECT_TIMEOUT);
        let topics = [config.items.clone(), config.events.clone()];
        let checked = tokio::task::spawn_blocking(move || check_brokers(&checker, timeout, &topics))
            .await
            .map_err(KafkaSetupError::from)
            .and_then(|result| {
                result.map_err(|source| KafkaSetupError::Connect {
                    brokers: config.brokers.clone(),
                    source,
                })
            });

        if let Err(e) = checked {
            publisher.cancel.cancel();
            return Err(e);
        }

        tracing::info!(
            brokers = %config.brokers,
            items_topic = %config.items,
            events_topic = %config.events,
            "Kafka producer connected"
        );
        Ok(publisher)
    }

    /// Build the producer and start the listener without contacting brokers.
    fn create(config: &KafkaConfig) -> Result<Self, KafkaSetupError> {
        let (failures_tx, failures_rx) = mpsc::channel(DELIVERY_FAILURE_BUFFER);

        let producer: ThreadedProducer<DeliveryReporter> = client_config(config)
            .create_with_context(DeliveryReporter::new(failures_tx))
            .map_err(KafkaSetupError::Create)?;

        let cancel = CancellationToken::new();
        let listener = tokio::spawn(drain_delivery_failures(failures_rx, cancel.clone()));

        Ok(Self {
            producer: Arc::new(producer),
            items_topic: config.items.clone(),
            events_topic: config.events.clone(),
            enqueue_timeout: ENQUEUE_TIMEOUT,
            cancel,
            listener: Mutex::new(Some(listener)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn produce(&self, topic: &str, key: &str, message: &str) -> EnqueueOutcome {
        if self.is_closed() {
            tracing::warn!(topic, key, "Producer closed, message dropped");
            metrics::record_dropped(topic, "closed");
            return EnqueueOutcome::Closed;
        }

        let outcome = enqueue_within(self.enqueue_timeout, || {
            let record = BaseRecord::to(topic).key(key).payload(message);
            self.producer
                .send(record)
                .map_err(|(err, _)| SendFailure::from(err))
        })
        .await;

        match &outcome {
            EnqueueOutcome::Enqueued => {
                metrics::record_enqueued(topic);
                tracing::debug!(topic, key, "New message produced");
            }
            EnqueueOutcome::TimedOut => {
                metrics::record_dropped(topic, "timeout");
                tracing::warn!(topic, key, timeout = ?self.enqueue_timeout, "Message send timeout");
            }
            EnqueueOutcome::Rejected(reason) => {
                metrics::record_dropped(topic, "rejected");
                tracing::warn!(topic, key, error = %reason, "Message rejected by producer");
            }
            EnqueueOutcome::Closed => {}
        }
        outcome
    }
}

/// Fetch cluster metadata, warning about configured topics the cluster lacks.
fn check_brokers(
    producer: &ThreadedProducer<DeliveryReporter>,
    timeout: Duration,
    topics: &[String],
) -> Result<(), KafkaError> {
    let metadata = producer
        .client()
        .fetch_metadata(None, Timeout::After(timeout))?;

    tracing::debug!(
        brokers = metadata.brokers().len(),
        topics = metadata.topics().len(),
        "Fetched Kafka metadata"
    );

    for topic in topics {
        if !metadata.topics().iter().any(|t| t.name() == topic.as_str()) {
            tracing::warn!(topic = %topic, "Configured topic does not exist on the cluster");
        }
    }

    Ok(())
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn produce_item(&self, key: &str, message: &str) {
        self.produce(&self.items_topic, key, message).await;
    }

    async fn produce_event(&self, key: &str, message: &str) {
        self.produce(&self.events_topic, key, message).await;
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Kafka producer already closed");
            return;
        }

        let producer = Arc::clone(&self.producer);
        match tokio::task::spawn_blocking(move || producer.flush(Timeout::After(FLUSH_TIMEOUT))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Failed to flush Kafka producer"),
            Err(e) => tracing::error!(error = %e, "Kafka flush task failed"),
        }

        self.cancel.cancel();

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            if let Err(e) = listener.await {
                tracing::error!(error = %e, "Delivery error listener failed");
            }
        }

        tracing::info!("Kafka producer closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn enqueues_on_first_attempt() {
        let attempts = Cell::new(0);
        let outcome = enqueue_within(ENQUEUE_TIMEOUT, || {
            attempts.set(attempts.get() + 1);
            Ok(())
        })
        .await;

        assert_eq!(outcome, EnqueueOutcome::Enqueued);
        assert_eq!(attempts.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_while_queue_is_full() {
        let attempts = Cell::new(0);
        let outcome = enqueue_within(ENQUEUE_TIMEOUT, || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 4 {
                Err(SendFailure::QueueFull)
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(outcome, EnqueueOutcome::Enqueued);
        assert_eq!(attempts.get(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_deadline() {
        let start = Instant::now();
        let outcome = enqueue_within(ENQUEUE_TIMEOUT, || Err(SendFailure::QueueFull)).await;

        assert_eq!(outcome, EnqueueOutcome::TimedOut);
        assert!(start.elapsed() >= ENQUEUE_TIMEOUT);
        assert!(start.elapsed() < ENQUEUE_TIMEOUT + QUEUE_FULL_BACKOFF * 2);
    }

    #[tokio::test]
    async fn fatal_failure_is_not_retried() {
        let attempts = Cell::new(0);
        let outcome = enqueue_within(ENQUEUE_TIMEOUT, || {
            attempts.set(attempts.get() + 1);
            Err(SendFailure::Fatal("Message size too large".to_string()))
        })
        .await;

        assert_eq!(
            outcome,
            EnqueueOutcome::Rejected("Message size too large".to_string())
        );
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn queue_full_is_retryable() {
        let err = KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull);
        assert_eq!(SendFailure::from(err), SendFailure::QueueFull);

        let err = KafkaError::MessageProduction(RDKafkaErrorCode::MessageSizeTooLarge);
        assert!(matches!(SendFailure::from(err), SendFailure::Fatal(_)));
    }

    fn unreachable() -> KafkaConfig {
        KafkaConfig {
            brokers: "127.0.0.1:1".to_string(),
            ..KafkaConfig::default()
        }
    }

    #[tokio::test]
    async fn produce_after_close_is_dropped() {
        let publisher = KafkaPublisher::create(&unreachable()).unwrap();
        publisher.close().await;

        assert!(publisher.is_closed());
        assert_eq!(
            publisher.produce("items", "1", r#"{"itemid":1}"#).await,
            EnqueueOutcome::Closed
        );
    }

    #[tokio::test]
    async fn close_is_idempotent_and_stops_listener() {
        let publisher = KafkaPublisher::create(&unreachable()).unwrap();

        publisher.close().await;
        publisher.close().await;

        assert!(publisher.cancel.is_cancelled());
        assert!(publisher
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none());
    }
}
