//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::store::StoredEvent;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name for deserialization routing.
    pub event_type: String,
    /// Identity of the aggregate stream this event belongs to.
    pub identity: String,
    /// Position of the event within the aggregate stream, starting at 1.
    pub sequence_number: i64,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Causation ID linking this event to the event/command that caused it.
    pub causation_id: Uuid,
    /// Timestamp of event occurrence.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Rebuilds metadata from a stored envelope.
    #[must_use]
    pub fn from_stored(stored: &StoredEvent) -> Self {
        Self {
            event_id: stored.event_id,
            event_type: stored.event_type.clone(),
            identity: stored.identity.clone(),
            sequence_number: stored.sequence_number,
            correlation_id: stored.correlation_id,
            causation_id: stored.causation_id,
            occurred_at: stored.occurred_at,
        }
    }
}

/// Trait that all domain events implement.
///
/// Each domain declares its events as a closed enum wrapped in an envelope
/// carrying [`EventMetadata`]. Payloads travel as JSON so stores can persist
/// them without knowing the concrete type.
pub trait DomainEvent: Send + Sync + std::fmt::Debug + Sized {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &str;

    /// Serializes the event payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload cannot be encoded.
    fn to_payload(&self) -> Result<serde_json::Value, DomainError>;

    /// Rebuilds a typed event from its stored envelope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload does not decode.
    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError>;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;

    /// Returns the identity this event assigns to its aggregate, if it is a
    /// creation event.
    fn assigned_identity(&self) -> Option<&str> {
        None
    }

    /// Converts the event to its stored envelope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload cannot be encoded.
    fn to_stored(&self, aggregate_type: &str) -> Result<StoredEvent, DomainError> {
        let meta = self.metadata();
        Ok(StoredEvent {
            event_id: meta.event_id,
            identity: meta.identity.clone(),
            aggregate_type: aggregate_type.to_owned(),
            event_type: self.event_type().to_owned(),
            payload: self.to_payload()?,
            sequence_number: meta.sequence_number,
            correlation_id: meta.correlation_id,
            causation_id: meta.causation_id,
            occurred_at: meta.occurred_at,
        })
    }
}

/// Maps a `serde_json` failure to a domain serialization error.
pub(crate) fn serialization_error(event_type: &str, err: &serde_json::Error) -> DomainError {
    DomainError::Serialization(format!("event {event_type}: {err}"))
}

/// Serializes any payload type to JSON, tagging failures with the event type.
///
/// # Errors
///
/// Returns `DomainError::Serialization` if encoding fails.
pub fn encode_payload<T: Serialize>(
    event_type: &str,
    payload: &T,
) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(payload).map_err(|e| serialization_error(event_type, &e))
}

/// Deserializes the payload of a stored envelope.
///
/// # Errors
///
/// Returns `DomainError::Serialization` if decoding fails.
pub fn decode_payload<T: DeserializeOwned>(stored: &StoredEvent) -> Result<T, DomainError> {
    serde_json::from_value(stored.payload.clone())
        .map_err(|e| serialization_error(&stored.event_type, &e))
}
