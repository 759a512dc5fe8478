//! Event store abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate stream this event belongs to.
    pub identity: String,
    /// Aggregate type name, e.g. `"cart"`.
    pub aggregate_type: String,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event occurrence.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Store trait for loading and appending aggregate event streams.
///
/// Implementations own durability and optimistic concurrency: `save` must
/// reject the batch with `DomainError::ConcurrencyConflict` when the stream's
/// current version differs from `expected_version`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Load all events for a given aggregate, ordered by sequence number.
    async fn load_events(
        &self,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append new events to an aggregate stream with optimistic concurrency.
    /// `expected_version` is the last known sequence number.
    async fn save(
        &self,
        identity: &str,
        expected_version: i64,
        events: &[StoredEvent],
        cancel: &CancellationToken,
    ) -> Result<(), DomainError>;

    /// Load events with a sequence number greater than or equal to
    /// `from_sequence`.
    ///
    /// Stores that cannot query by range fall back to filtering the full
    /// stream.
    async fn load_events_from(
        &self,
        identity: &str,
        from_sequence: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let mut events = self.load_events(identity, cancel).await?;
        events.retain(|event| event.sequence_number >= from_sequence);
        Ok(events)
    }
}
