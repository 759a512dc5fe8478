//! Bounded background publisher.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::publish::EventPublisher;
use chronicle_core::store::StoredEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PublisherConfig;
use crate::dead_letter::{DeadLetter, DeadLetterReason, DeadLetterSink};
use crate::error::PublisherError;

/// Publishes event batches on a background task.
///
/// Batches are delivered to the wrapped publisher one at a time, in the order
/// they were accepted. Nothing is dropped silently: a batch rejected by the
/// queue or by the wrapped publisher goes to the dead-letter sink.
pub struct BackgroundPublisher {
    sender: mpsc::Sender<Vec<StoredEvent>>,
    dead_letters: Arc<dyn DeadLetterSink>,
    shutdown: CancellationToken,
    delivery: CancellationToken,
    drain_timeout: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for BackgroundPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundPublisher")
            .field("capacity", &self.sender.max_capacity())
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl BackgroundPublisher {
    /// Starts the worker task on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime or with a zero capacity.
    #[must_use]
    pub fn spawn(
        inner: Arc<dyn EventPublisher>,
        dead_letters: Arc<dyn DeadLetterSink>,
        config: PublisherConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity);
        let shutdown = CancellationToken::new();
        let delivery = CancellationToken::new();
        let worker = tokio::spawn(run_worker(
            receiver,
            inner,
            Arc::clone(&dead_letters),
            shutdown.clone(),
            delivery.clone(),
        ));
        info!(capacity = config.capacity, "background publisher started");

        Self {
            sender,
            dead_letters,
            shutdown,
            delivery,
            drain_timeout: config.drain_timeout,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queues a batch without waiting.
    ///
    /// If the queue is full or the worker has stopped, the batch is logged
    /// and handed to the dead-letter sink.
    pub fn publish_detached(&self, events: Vec<StoredEvent>) {
        if events.is_empty() {
            return;
        }
        match self.sender.try_send(events) {
            Ok(()) => debug!("event batch queued"),
            Err(mpsc::error::TrySendError::Full(events)) => {
                warn!(events = events.len(), "publisher queue full");
                self.dead_letters
                    .record(DeadLetter::new(events, DeadLetterReason::QueueFull));
            }
            Err(mpsc::error::TrySendError::Closed(events)) => {
                warn!(events = events.len(), "publisher queue closed");
                self.dead_letters
                    .record(DeadLetter::new(events, DeadLetterReason::QueueClosed));
            }
        }
    }

    /// Stops accepting batches, delivers everything already queued and waits
    /// for the worker to finish.
    ///
    /// If the queue is not drained within the configured drain timeout, the
    /// in-flight delivery is cancelled and every undelivered batch is
    /// dead-lettered with `DeadLetterReason::DrainTimeout`.
    ///
    /// # Errors
    ///
    /// Returns `PublisherError::Worker` if the worker task panicked.
    pub async fn shutdown(&self) -> Result<(), PublisherError> {
        self.shutdown.cancel();
        let worker = self
            .worker
            .lock()
            .map_err(|e| PublisherError::Worker(e.to_string()))?
            .take();
        let Some(mut worker) = worker else {
            return Ok(());
        };
        match tokio::time::timeout(self.drain_timeout, &mut worker).await {
            Ok(joined) => joined.map_err(|e| PublisherError::Worker(e.to_string())),
            Err(_) => {
                warn!(
                    drain_timeout = ?self.drain_timeout,
                    "drain deadline elapsed, abandoning pending deliveries"
                );
                self.delivery.cancel();
                worker
                    .await
                    .map_err(|e| PublisherError::Worker(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EventPublisher for BackgroundPublisher {
    /// Waits for queue space, then returns; delivery happens in the
    /// background.
    async fn publish(
        &self,
        events: &[StoredEvent],
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        match cancel
            .run_until_cancelled(self.sender.send(events.to_vec()))
            .await
        {
            Some(Ok(())) => Ok(()),
            Some(Err(mpsc::error::SendError(events))) => {
                self.dead_letters
                    .record(DeadLetter::new(events, DeadLetterReason::QueueClosed));
                Err(DomainError::Publish("publisher queue closed".into()))
            }
            None => Err(DomainError::Cancelled),
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Vec<StoredEvent>>,
    inner: Arc<dyn EventPublisher>,
    dead_letters: Arc<dyn DeadLetterSink>,
    shutdown: CancellationToken,
    delivery: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            batch = receiver.recv() => match batch {
                Some(batch) => {
                    deliver(inner.as_ref(), dead_letters.as_ref(), batch, &delivery).await;
                }
                None => break,
            },
            () = shutdown.cancelled() => {
                receiver.close();
                while let Some(batch) = receiver.recv().await {
                    deliver(inner.as_ref(), dead_letters.as_ref(), batch, &delivery).await;
                }
                break;
            }
        }
    }
    info!("background publisher stopped");
}

async fn deliver(
    inner: &dyn EventPublisher,
    dead_letters: &dyn DeadLetterSink,
    batch: Vec<StoredEvent>,
    cancel: &CancellationToken,
) {
    let outcome = cancel
        .run_until_cancelled(inner.publish(&batch, cancel))
        .await;
    match outcome {
        Some(Ok(())) => debug!(events = batch.len(), "event batch delivered"),
        Some(Err(err)) => {
            error!(error = %err, events = batch.len(), "event batch delivery failed");
            dead_letters.record(DeadLetter::new(
                batch,
                DeadLetterReason::DeliveryFailed(err.to_string()),
            ));
        }
        None => {
            warn!(events = batch.len(), "event batch abandoned at shutdown");
            dead_letters.record(DeadLetter::new(batch, DeadLetterReason::DrainTimeout));
        }
    }
}

#[cfg(test)]
mod tests {
    use chronicle_test_support::{FailingPublisher, RecordingPublisher, fixed_time};
    use tokio::sync::Semaphore;
    use uuid::Uuid;

    use super::*;
    use crate::dead_letter::MemoryDeadLetterSink;

    fn make_stored_event(sequence_number: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            identity: "cart-1".to_owned(),
            aggregate_type: "cart".to_owned(),
            event_type: format!("cart.event_{sequence_number}"),
            payload: serde_json::json!({}),
            sequence_number,
            correlation_id: Uuid::nil(),
            causation_id: Uuid::nil(),
            occurred_at: fixed_time(),
        }
    }

    /// Holds every delivery until permits are added.
    struct GatedPublisher {
        gate: Semaphore,
        inner: RecordingPublisher,
    }

    #[async_trait]
    impl EventPublisher for GatedPublisher {
        async fn publish(
            &self,
            events: &[StoredEvent],
            cancel: &CancellationToken,
        ) -> Result<(), DomainError> {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| DomainError::Publish(e.to_string()))?;
            permit.forget();
            self.inner.publish(events, cancel).await
        }
    }

    #[tokio::test]
    async fn test_detached_batches_are_delivered_in_order() {
        // Arrange
        let inner = Arc::new(RecordingPublisher::new());
        let sink = Arc::new(MemoryDeadLetterSink::new());
        let publisher =
            BackgroundPublisher::spawn(inner.clone(), sink.clone(), PublisherConfig::default());

        // Act
        for n in 1..=3 {
            publisher.publish_detached(vec![make_stored_event(n)]);
        }
        publisher.shutdown().await.unwrap();

        // Assert
        assert_eq!(
            inner.published_event_types(),
            vec!["cart.event_1", "cart.event_2", "cart.event_3"]
        );
        assert!(sink.letters().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_dead_lettered() {
        let sink = Arc::new(MemoryDeadLetterSink::new());
        let publisher = BackgroundPublisher::spawn(
            Arc::new(FailingPublisher),
            sink.clone(),
            PublisherConfig::default(),
        );

        publisher.publish_detached(vec![make_stored_event(1), make_stored_event(2)]);
        publisher.shutdown().await.unwrap();

        let letters = sink.letters();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].events.len(), 2);
        assert!(matches!(
            letters[0].reason,
            DeadLetterReason::DeliveryFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_full_queue_is_dead_lettered_not_blocking() {
        // Arrange
        let gated = Arc::new(GatedPublisher {
            gate: Semaphore::new(0),
            inner: RecordingPublisher::new(),
        });
        let sink = Arc::new(MemoryDeadLetterSink::new());
        let publisher = BackgroundPublisher::spawn(
            gated.clone(),
            sink.clone(),
            PublisherConfig {
                capacity: 1,
                ..PublisherConfig::default()
            },
        );

        // Act
        for n in 1..=3 {
            publisher.publish_detached(vec![make_stored_event(n)]);
        }
        gated.gate.add_permits(3);
        publisher.shutdown().await.unwrap();

        // Assert
        let letters = sink.letters();
        assert!(!letters.is_empty());
        assert!(
            letters
                .iter()
                .all(|letter| letter.reason == DeadLetterReason::QueueFull)
        );
        let delivered = gated.inner.published_batches().len();
        assert_eq!(delivered + letters.len(), 3);
    }

    /// Never completes a delivery, whatever the cancellation token says.
    struct StalledPublisher;

    #[async_trait]
    impl EventPublisher for StalledPublisher {
        async fn publish(
            &self,
            _events: &[StoredEvent],
            _cancel: &CancellationToken,
        ) -> Result<(), DomainError> {
            std::future::pending::<Result<(), DomainError>>().await
        }
    }

    #[tokio::test]
    async fn test_shutdown_abandons_stalled_delivery_after_drain_timeout() {
        // Arrange
        let sink = Arc::new(MemoryDeadLetterSink::new());
        let publisher = BackgroundPublisher::spawn(
            Arc::new(StalledPublisher),
            sink.clone(),
            PublisherConfig {
                capacity: 4,
                drain_timeout: Duration::from_millis(50),
            },
        );
        publisher.publish_detached(vec![make_stored_event(1)]);
        publisher.publish_detached(vec![make_stored_event(2)]);

        // Act
        let result = tokio::time::timeout(Duration::from_secs(5), publisher.shutdown()).await;

        // Assert
        assert!(matches!(result, Ok(Ok(()))));
        let letters = sink.letters();
        assert_eq!(letters.len(), 2);
        assert!(
            letters
                .iter()
                .all(|letter| letter.reason == DeadLetterReason::DrainTimeout)
        );
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_is_dead_lettered() {
        let sink = Arc::new(MemoryDeadLetterSink::new());
        let publisher = BackgroundPublisher::spawn(
            Arc::new(RecordingPublisher::new()),
            sink.clone(),
            PublisherConfig::default(),
        );
        publisher.shutdown().await.unwrap();

        publisher.publish_detached(vec![make_stored_event(1)]);
        let result = publisher
            .publish(&[make_stored_event(2)], &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(DomainError::Publish(_))));
        let reasons: Vec<DeadLetterReason> =
            sink.letters().into_iter().map(|letter| letter.reason).collect();
        assert_eq!(
            reasons,
            vec![DeadLetterReason::QueueClosed, DeadLetterReason::QueueClosed]
        );
    }

    #[tokio::test]
    async fn test_awaited_publish_enqueues_and_delivers() {
        let inner = Arc::new(RecordingPublisher::new());
        let publisher = BackgroundPublisher::spawn(
            inner.clone(),
            Arc::new(MemoryDeadLetterSink::new()),
            PublisherConfig::default(),
        );

        publisher
            .publish(&[make_stored_event(1)], &CancellationToken::new())
            .await
            .unwrap();
        publisher.shutdown().await.unwrap();

        assert_eq!(inner.published_batches().len(), 1);
    }
}
