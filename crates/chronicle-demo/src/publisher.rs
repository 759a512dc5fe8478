//! Downstream publisher used by the demo.

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::publish::EventPublisher;
use chronicle_core::store::StoredEvent;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Publisher that reports each event through `tracing` instead of a broker.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPublisher;

#[async_trait]
impl EventPublisher for LoggingPublisher {
    async fn publish(
        &self,
        events: &[StoredEvent],
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        for event in events {
            info!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                identity = %event.identity,
                sequence_number = event.sequence_number,
                correlation_id = %event.correlation_id,
                "event published"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_accepts_empty_batch() {
        let result = LoggingPublisher
            .publish(&[], &CancellationToken::new())
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_publish_honours_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = LoggingPublisher.publish(&[], &cancel).await;

        assert!(matches!(result, Err(DomainError::Cancelled)));
    }
}
