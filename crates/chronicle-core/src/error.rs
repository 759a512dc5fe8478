//! Domain error types.

use thiserror::Error;

use crate::validation::ValidationError;

/// Raised when an aggregate's `apply` dispatch has no case for an event.
///
/// This is a programming or deployment error: the running aggregate does not
/// know how to interpret an event variant it was asked to apply or replay.
/// It must propagate to top-level error reporting rather than be handled
/// locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("aggregate {aggregate_type} cannot apply event {event_type}")]
pub struct UnsupportedEvent {
    /// The aggregate type that rejected the event.
    pub aggregate_type: &'static str,
    /// The event type tag that could not be dispatched.
    pub event_type: String,
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An event was rejected by a validation hook. No state was changed.
    #[error("validation failed: {message}")]
    ValidationFailed {
        /// Human-readable summary.
        message: String,
        /// Structured error entries, in the order they were reported.
        errors: Vec<ValidationError>,
    },

    /// The aggregate cannot interpret an event variant.
    #[error(transparent)]
    UnsupportedEvent(#[from] UnsupportedEvent),

    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(String),

    /// Optimistic concurrency conflict.
    #[error(
        "concurrency conflict on aggregate {identity}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        identity: String,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A second identity-assigning event was applied to an aggregate.
    #[error("aggregate identity already assigned to {current}, refusing {attempted}")]
    IdentityAlreadyAssigned {
        /// The identity the aggregate already carries.
        current: String,
        /// The identity the rejected event tried to assign.
        attempted: String,
    },

    /// The aggregate holds events that were never persisted, so it cannot be
    /// rebuilt from history.
    #[error("aggregate has {0} pending events")]
    PendingEvents(usize),

    /// A pending event is stamped with an identity or sequence number that
    /// does not match its aggregate.
    #[error("event does not match its aggregate: {0}")]
    EventMismatch(String),

    /// An event payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persisted events could not be handed to the publisher.
    #[error("publish error: {0}")]
    Publish(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// The operation was cancelled before any state was changed.
    #[error("operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Builds a `ValidationFailed` error with a single message and no
    /// structured entries.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Returns `true` for errors that indicate a defect rather than a
    /// recoverable domain or infrastructure condition.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedEvent(_) | Self::EventMismatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_event_converts_and_is_fatal() {
        let err: DomainError = UnsupportedEvent {
            aggregate_type: "cart",
            event_type: "cart.gift_wrapped".to_owned(),
        }
        .into();

        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "aggregate cart cannot apply event cart.gift_wrapped"
        );
    }

    #[test]
    fn test_validation_helper_has_no_entries_and_is_not_fatal() {
        let err = DomainError::validation("cart is empty");

        assert!(!err.is_fatal());
        match err {
            DomainError::ValidationFailed { message, errors } => {
                assert_eq!(message, "cart is empty");
                assert!(errors.is_empty());
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }
}
