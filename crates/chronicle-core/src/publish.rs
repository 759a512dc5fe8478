//! Event publisher abstraction.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::DomainError;
use crate::store::StoredEvent;

/// Notifies other components about events after they were persisted.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a batch of persisted events, preserving their order.
    async fn publish(
        &self,
        events: &[StoredEvent],
        cancel: &CancellationToken,
    ) -> Result<(), DomainError>;
}

/// Publisher for repositories whose events nobody subscribes to.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(
        &self,
        _events: &[StoredEvent],
        _cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        Ok(())
    }
}
