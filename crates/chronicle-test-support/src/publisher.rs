//! Test publishers: `EventPublisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::publish::EventPublisher;
use chronicle_core::store::StoredEvent;
use tokio_util::sync::CancellationToken;

/// A publisher that records every published batch and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Vec<StoredEvent>>>,
}

impl RecordingPublisher {
    /// Creates an empty recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published batches, in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published_batches(&self) -> Vec<Vec<StoredEvent>> {
        self.published.lock().unwrap().clone()
    }

    /// Returns every published event type, flattened across batches.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published_event_types(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|event| event.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        events: &[StoredEvent],
        _cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        self.published.lock().unwrap().push(events.to_vec());
        Ok(())
    }
}

/// A publisher that always fails with `DomainError::Publish`.
#[derive(Debug)]
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(
        &self,
        _events: &[StoredEvent],
        _cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        Err(DomainError::Publish("broker unavailable".into()))
    }
}
