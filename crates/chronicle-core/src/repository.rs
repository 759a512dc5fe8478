//! Repository facade composing an event store and a publisher.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::publish::EventPublisher;
use crate::store::{EventStore, StoredEvent};

/// Loads aggregates from their event streams and saves their pending events.
pub struct Repository<A> {
    store: Arc<dyn EventStore>,
    publisher: Arc<dyn EventPublisher>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> Clone for Repository<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            publisher: Arc::clone(&self.publisher),
            _aggregate: PhantomData,
        }
    }
}

impl<A> std::fmt::Debug for Repository<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").finish_non_exhaustive()
    }
}

impl<A: Aggregate> Repository<A> {
    /// Creates a repository over the given store and publisher.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            _aggregate: PhantomData,
        }
    }

    /// Persists the aggregate's pending events, publishes them and flushes
    /// the aggregate. Returns the stored envelopes.
    ///
    /// The store is asked to append at the aggregate's persisted version, so
    /// a concurrent writer surfaces as `DomainError::ConcurrencyConflict`.
    /// Once the store accepted the batch the aggregate is flushed even if
    /// publishing fails.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` if the aggregate has pending
    /// events but no identity, `DomainError::Cancelled` if `cancel` fired
    /// before the write, the store's error if the write fails, and
    /// `DomainError::Publish` if the events were stored but not published.
    /// Returns `DomainError::EventMismatch` without writing if a pending
    /// event carries another identity or is out of sequence.
    #[instrument(
        skip_all,
        fields(
            aggregate_type = A::AGGREGATE_TYPE,
            identity = root.identity().unwrap_or_default()
        )
    )]
    pub async fn save(
        &self,
        root: &mut AggregateRoot<A>,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        if root.pending_events().is_empty() {
            return Ok(Vec::new());
        }
        let identity = root
            .identity()
            .ok_or_else(|| DomainError::validation("cannot save an aggregate without identity"))?
            .to_owned();
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        check_stamps(&identity, root.persisted_version(), root.pending_events())?;

        let stored = root
            .pending_events()
            .iter()
            .map(|event| event.to_stored(A::AGGREGATE_TYPE))
            .collect::<Result<Vec<_>, _>>()?;

        self.store
            .save(&identity, root.persisted_version(), &stored, cancel)
            .await?;

        let published = self.publisher.publish(&stored, cancel).await;
        root.flush();

        match published {
            Ok(()) => {
                info!(events = stored.len(), version = root.version(), "aggregate saved");
                Ok(stored)
            }
            Err(err) => {
                error!(error = %err, events = stored.len(), "events stored but not published");
                match err {
                    DomainError::Publish(_) => Err(err),
                    other => Err(DomainError::Publish(other.to_string())),
                }
            }
        }
    }

    /// Loads an aggregate by replaying its stream, or `None` if the stream is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns the store's error, `DomainError::Serialization` for payloads
    /// that do not decode and `DomainError::UnsupportedEvent` for events the
    /// aggregate cannot apply.
    #[instrument(skip(self, cancel), fields(aggregate_type = A::AGGREGATE_TYPE))]
    pub async fn load(
        &self,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AggregateRoot<A>>, DomainError> {
        let stored = self.store.load_events(identity, cancel).await?;
        if stored.is_empty() {
            return Ok(None);
        }

        let mut root = AggregateRoot::<A>::new();
        if let Err(err) = root.replay_stored(&stored) {
            if err.is_fatal() {
                error!(error = %err, "aggregate cannot replay its stream");
            }
            return Err(err);
        }
        info!(version = root.version(), "aggregate loaded");
        Ok(Some(root))
    }

    /// Loads an aggregate that must exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` for an empty stream, otherwise
    /// the errors of [`Repository::load`].
    pub async fn get(
        &self,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<AggregateRoot<A>, DomainError> {
        self.load(identity, cancel)
            .await?
            .ok_or_else(|| DomainError::AggregateNotFound(identity.to_owned()))
    }
}

fn check_stamps<E: DomainEvent>(
    identity: &str,
    persisted_version: i64,
    pending: &[E],
) -> Result<(), DomainError> {
    for (expected, event) in (persisted_version + 1..).zip(pending) {
        let metadata = event.metadata();
        if metadata.identity != identity {
            return Err(DomainError::EventMismatch(format!(
                "event {} is stamped for {}, expected {identity}",
                metadata.event_id, metadata.identity
            )));
        }
        if metadata.sequence_number != expected {
            return Err(DomainError::EventMismatch(format!(
                "event {} has sequence number {}, expected {expected}",
                metadata.event_id, metadata.sequence_number
            )));
        }
    }
    Ok(())
}
