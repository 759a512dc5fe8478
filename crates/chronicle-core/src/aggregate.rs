//! Aggregate root abstraction.
//!
//! Domain types implement [`Aggregate`]: an exhaustive `apply` dispatch over
//! their event enum plus an optional validation hook. [`AggregateRoot`]
//! wraps that state and owns everything the domain must not touch directly:
//! identity, version and the buffer of events pending persistence.

use std::borrow::Borrow;
use std::ops::Deref;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{DomainError, UnsupportedEvent};
use crate::event::DomainEvent;
use crate::store::StoredEvent;
use crate::validation::{AsyncEventValidator, EventValidator, ValidationResult};

/// Domain state that is derived from its own events.
pub trait Aggregate: Default + Send + Sync {
    /// Aggregate type name, used to tag stored events.
    const AGGREGATE_TYPE: &'static str;

    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Apply an event to mutate internal state.
    ///
    /// Must cover every declared variant and must not mutate anything when
    /// it returns an error.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedEvent` for a variant this aggregate cannot
    /// interpret.
    fn apply(&mut self, event: &Self::Event) -> Result<(), UnsupportedEvent>;

    /// Checks an event against the current state before it is applied.
    fn validate(&self, _event: &Self::Event) -> ValidationResult {
        ValidationResult::Success
    }
}

/// A single aggregate instance together with its event bookkeeping.
#[derive(Debug)]
pub struct AggregateRoot<A: Aggregate> {
    identity: Option<String>,
    version: i64,
    pending: Vec<A::Event>,
    persisted: bool,
    state: A,
}

impl<A: Aggregate> Default for AggregateRoot<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Aggregate> AggregateRoot<A> {
    /// Creates an empty, uninitialized aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            identity: None,
            version: 0,
            pending: Vec::new(),
            persisted: false,
            state: A::default(),
        }
    }

    /// Reconstructs an aggregate from previously persisted events.
    ///
    /// # Errors
    ///
    /// See [`AggregateRoot::replay`].
    pub fn from_history<I>(events: I) -> Result<Self, DomainError>
    where
        I: IntoIterator,
        I::Item: Borrow<A::Event>,
    {
        let mut root = Self::new();
        root.replay(events)?;
        Ok(root)
    }

    /// Returns the aggregate identity, once a creation event has been applied.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Returns the current version (number of events applied).
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Returns the version the backing store is expected to hold, i.e. the
    /// version before any pending events.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn persisted_version(&self) -> i64 {
        self.version - self.pending.len() as i64
    }

    /// Returns the sequence number the next event should carry.
    #[must_use]
    pub fn next_sequence_number(&self) -> i64 {
        self.version + 1
    }

    /// Returns events applied since construction or the last flush.
    #[must_use]
    pub fn pending_events(&self) -> &[A::Event] {
        &self.pending
    }

    /// Returns `true` when the aggregate holds changes and has never been
    /// loaded from or written to storage.
    #[must_use]
    pub fn is_new(&self) -> bool {
        !self.persisted && self.version > 0
    }

    /// Returns the domain state.
    #[must_use]
    pub fn state(&self) -> &A {
        &self.state
    }

    /// Validates, applies and buffers a new event.
    ///
    /// Call this from domain behaviour methods after business rules have been
    /// checked. Returns the buffered event so callers can forward it to
    /// logging or metrics.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` if the aggregate's validation
    /// hook rejects the event, `DomainError::IdentityAlreadyAssigned` for a
    /// second creation event and `DomainError::UnsupportedEvent` if `apply`
    /// has no case for it. State is unchanged in every error case.
    pub fn apply_change(&mut self, event: A::Event) -> Result<&A::Event, DomainError> {
        self.state.validate(&event).into_result()?;
        self.record(event)
    }

    /// Like [`AggregateRoot::apply_change`], additionally consulting an
    /// external validator.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` carrying the error entries of
    /// both the aggregate hook and `validator`, in that order.
    pub fn apply_change_with(
        &mut self,
        event: A::Event,
        validator: &dyn EventValidator<A::Event>,
    ) -> Result<&A::Event, DomainError> {
        self.state
            .validate(&event)
            .and(validator.validate(&event))
            .into_result()?;
        self.record(event)
    }

    /// Like [`AggregateRoot::apply_change_with`] for validators that suspend.
    ///
    /// Cancellation is observed while the validator runs and once more after
    /// it completes; after that the mutation runs to completion.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` if `cancel` fires before mutation,
    /// otherwise the errors of [`AggregateRoot::apply_change_with`].
    pub async fn apply_change_async(
        &mut self,
        event: A::Event,
        validator: &dyn AsyncEventValidator<A::Event>,
        cancel: &CancellationToken,
    ) -> Result<&A::Event, DomainError> {
        let external = cancel
            .run_until_cancelled(validator.validate(&event))
            .await
            .ok_or(DomainError::Cancelled)?;
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        self.state.validate(&event).and(external).into_result()?;
        self.record(event)
    }

    /// Rebuilds state from an ordered stream of persisted events.
    ///
    /// The stream is folded into fresh state, so replaying the same stream
    /// always yields the same result. The root is only updated once every
    /// event has been applied.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PendingEvents` if the root holds unsaved events,
    /// `DomainError::UnsupportedEvent` if an event cannot be applied and
    /// `DomainError::IdentityAlreadyAssigned` if the stream holds more than
    /// one creation event. The root is unchanged in every error case.
    pub fn replay<I>(&mut self, events: I) -> Result<(), DomainError>
    where
        I: IntoIterator,
        I::Item: Borrow<A::Event>,
    {
        if !self.pending.is_empty() {
            return Err(DomainError::PendingEvents(self.pending.len()));
        }
        let mut rebuilt = Self::new();
        for event in events {
            let event: &A::Event = event.borrow();
            rebuilt.mutate(event)?;
        }
        self.state = rebuilt.state;
        self.identity = rebuilt.identity;
        self.version = rebuilt.version;
        self.persisted = true;
        debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            identity = self.identity.as_deref().unwrap_or_default(),
            version = self.version,
            "aggregate replayed"
        );
        Ok(())
    }

    /// Decodes stored envelopes and replays them.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if a payload does not decode, or
    /// the errors of [`AggregateRoot::replay`].
    pub fn replay_stored(&mut self, stored: &[StoredEvent]) -> Result<(), DomainError> {
        let events = stored
            .iter()
            .map(A::Event::from_stored)
            .collect::<Result<Vec<_>, _>>()?;
        self.replay(&events)
    }

    /// Clears pending events after they were durably stored and returns them.
    pub fn flush(&mut self) -> Vec<A::Event> {
        self.persisted = true;
        let flushed = std::mem::take(&mut self.pending);
        debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            identity = self.identity.as_deref().unwrap_or_default(),
            version = self.version,
            flushed = flushed.len(),
            "pending events flushed"
        );
        flushed
    }

    fn record(&mut self, event: A::Event) -> Result<&A::Event, DomainError> {
        self.mutate(&event)?;
        debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            identity = self.identity.as_deref().unwrap_or_default(),
            version = self.version,
            event_type = event.event_type(),
            "event applied"
        );
        self.pending.push(event);
        let index = self.pending.len() - 1;
        Ok(&self.pending[index])
    }

    fn mutate(&mut self, event: &A::Event) -> Result<(), DomainError> {
        let assigned = event.assigned_identity();
        if let (Some(current), Some(attempted)) = (self.identity.as_deref(), assigned) {
            return Err(DomainError::IdentityAlreadyAssigned {
                current: current.to_owned(),
                attempted: attempted.to_owned(),
            });
        }
        self.state.apply(event)?;
        if let Some(identity) = assigned {
            self.identity = Some(identity.to_owned());
        }
        self.version += 1;
        Ok(())
    }
}

impl<A: Aggregate> Deref for AggregateRoot<A> {
    type Target = A;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}
