//! Shutdown ordering: stop serving, finish in-flight batches, then close.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use kafka_connector::kafka::Publisher;
use kafka_connector::lifecycle::serve;
use kafka_connector::net;

mod common;
use common::{access_policy, server_config, RecordingPublisher};

#[tokio::test]
async fn shutdown_mid_batch_closes_publisher_after_last_record() {
    let publisher = Arc::new(RecordingPublisher::with_delay(Duration::from_millis(100)));
    let config = server_config(None);
    let listener = net::bind(&config).unwrap();
    let url = format!("http://{}/api/v1/items", listener.local_addr().unwrap());

    let (stop, stopped) = oneshot::channel::<()>();
    let serving = tokio::spawn({
        let publisher: Arc<dyn Publisher> = publisher.clone();
        let access = access_policy(&config);
        async move {
            let shutdown = async move {
                let _ = stopped.await;
            };
            serve(&config, publisher, access, listener, shutdown).await
        }
    });

    let body: String = (1..=5).map(|id| format!("{{\"itemid\":{id}}}\n")).collect();
    let request = tokio::spawn(async move {
        reqwest::Client::new()
            .post(url)
            .body(body)
            .send()
            .await
            .map(|response| response.status())
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while publisher.produced().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("batch never started");
    assert!(!publisher.is_closed());

    stop.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(10), serving)
        .await
        .expect("serve did not return")
        .unwrap()
        .unwrap();

    assert_eq!(publisher.produced().len(), 5);
    assert_eq!(publisher.produced_at_close(), Some(5));
    assert_eq!(request.await.unwrap().unwrap(), 201);
}

#[tokio::test]
async fn publisher_is_closed_when_nothing_was_sent() {
    let publisher = Arc::new(RecordingPublisher::default());
    let config = server_config(None);
    let listener = net::bind(&config).unwrap();

    serve(
        &config,
        publisher.clone(),
        access_policy(&config),
        listener,
        async {},
    )
    .await
    .unwrap();

    assert_eq!(publisher.produced_at_close(), Some(0));
}
