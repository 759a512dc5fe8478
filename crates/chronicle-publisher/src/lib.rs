//! Chronicle Publisher: fire-and-forget event publishing.
//!
//! Wraps any `EventPublisher` behind a bounded queue drained by a single
//! worker task. Batches that cannot be queued or delivered are handed to a
//! `DeadLetterSink` instead of being dropped.

pub mod background;
pub mod config;
pub mod dead_letter;
pub mod error;
