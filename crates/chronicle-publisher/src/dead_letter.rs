//! Dead letters: batches that could not be published.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use chronicle_core::store::StoredEvent;
use serde::{Deserialize, Serialize};
use tracing::error;

/// The reason a batch was dead-lettered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadLetterReason {
    /// The queue was at capacity when the batch was submitted.
    QueueFull,
    /// The worker had already shut down.
    QueueClosed,
    /// The downstream publisher returned an error.
    DeliveryFailed(String),
    /// Shutdown's drain deadline elapsed before the batch was delivered.
    DrainTimeout,
}

/// A batch of events that could not be published, with the failure reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    /// The events, in their original order.
    pub events: Vec<StoredEvent>,
    /// Why the batch was not delivered.
    pub reason: DeadLetterReason,
    /// When the batch was dead-lettered.
    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    /// Creates a dead letter stamped with the current time.
    #[must_use]
    pub fn new(events: Vec<StoredEvent>, reason: DeadLetterReason) -> Self {
        Self {
            events,
            reason,
            failed_at: Utc::now(),
        }
    }
}

/// Destination for batches the background publisher could not deliver.
///
/// `record` is synchronous so it can run on the caller's thread when the
/// queue rejects a batch.
pub trait DeadLetterSink: Send + Sync {
    /// Retain or report an undeliverable batch.
    fn record(&self, letter: DeadLetter);
}

/// Sink that reports dead letters through `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDeadLetterSink;

impl DeadLetterSink for LoggingDeadLetterSink {
    fn record(&self, letter: DeadLetter) {
        let event_ids: Vec<String> = letter
            .events
            .iter()
            .map(|event| event.event_id.to_string())
            .collect();
        error!(
            reason = ?letter.reason,
            events = letter.events.len(),
            event_ids = ?event_ids,
            "event batch dead-lettered"
        );
    }
}

/// Sink that keeps dead letters in memory for later inspection or replay.
#[derive(Debug, Default)]
pub struct MemoryDeadLetterSink {
    letters: Mutex<Vec<DeadLetter>>,
}

impl MemoryDeadLetterSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the retained dead letters.
    #[must_use]
    pub fn letters(&self) -> Vec<DeadLetter> {
        self.letters
            .lock()
            .map(|letters| letters.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Removes and returns all retained dead letters.
    pub fn drain(&self) -> Vec<DeadLetter> {
        let mut letters = self
            .letters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::take(&mut *letters)
    }
}

impl DeadLetterSink for MemoryDeadLetterSink {
    fn record(&self, letter: DeadLetter) {
        LoggingDeadLetterSink.record(letter.clone());
        self.letters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(letter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_retains_and_drains() {
        let sink = MemoryDeadLetterSink::new();

        sink.record(DeadLetter::new(Vec::new(), DeadLetterReason::QueueFull));
        sink.record(DeadLetter::new(
            Vec::new(),
            DeadLetterReason::DeliveryFailed("boom".to_owned()),
        ));

        assert_eq!(sink.letters().len(), 2);
        let drained = sink.drain();
        assert_eq!(drained[0].reason, DeadLetterReason::QueueFull);
        assert_eq!(
            drained[1].reason,
            DeadLetterReason::DeliveryFailed("boom".to_owned())
        );
        assert!(sink.letters().is_empty());
    }
}
