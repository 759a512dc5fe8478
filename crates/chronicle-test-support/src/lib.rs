//! Shared test doubles and utilities for Chronicle.

mod clock;
mod publisher;
mod store;

pub use clock::{FixedClock, fixed_time};
pub use publisher::{FailingPublisher, RecordingPublisher};
pub use store::{FailingEventStore, InMemoryEventStore, RecordingEventStore};
