//! Test stores: `EventStore` implementations for tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::store::{EventStore, StoredEvent};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// An in-memory event store that enforces optimistic concurrency.
///
/// `save` accepts a batch only when `expected_version` equals the number of
/// events already in the stream.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: Mutex<HashMap<String, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a stream, replacing anything stored for `identity`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_stream(self, identity: &str, events: Vec<StoredEvent>) -> Self {
        self.streams
            .lock()
            .unwrap()
            .insert(identity.to_owned(), events);
        self
    }

    /// Returns a snapshot of the stream stored for `identity`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stream(&self, identity: &str) -> Vec<StoredEvent> {
        self.streams
            .lock()
            .unwrap()
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn load_events(
        &self,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        Ok(self.stream(identity))
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn save(
        &self,
        identity: &str,
        expected_version: i64,
        events: &[StoredEvent],
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        let mut streams = self.streams.lock().unwrap();
        let stream = streams.entry(identity.to_owned()).or_default();
        let actual = stream.len() as i64;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                identity: identity.to_owned(),
                expected: expected_version,
                actual,
            });
        }
        stream.extend_from_slice(events);
        debug!(identity, appended = events.len(), version = stream.len(), "stream appended");
        Ok(())
    }
}

/// An event store that records all `save` calls. Returns the configured
/// events from `load_events` on every call and always accepts saves.
#[derive(Debug, Default)]
pub struct RecordingEventStore {
    load_result: Vec<StoredEvent>,
    saved: Mutex<Vec<(String, i64, Vec<StoredEvent>)>>,
}

impl RecordingEventStore {
    /// Create a new recording store that will return `load_result` from every
    /// `load_events` call.
    #[must_use]
    pub fn new(load_result: Vec<StoredEvent>) -> Self {
        Self {
            load_result,
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all `(identity, expected_version, events)` saves.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved_events(&self) -> Vec<(String, i64, Vec<StoredEvent>)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn load_events(
        &self,
        _identity: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.load_result.clone())
    }

    async fn save(
        &self,
        identity: &str,
        expected_version: i64,
        events: &[StoredEvent],
        _cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        self.saved
            .lock()
            .unwrap()
            .push((identity.to_owned(), expected_version, events.to_vec()));
        Ok(())
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn load_events(
        &self,
        _identity: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save(
        &self,
        _identity: &str,
        _expected_version: i64,
        _events: &[StoredEvent],
        _cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
