//! Clock abstraction used to stamp event occurrence times.

use chrono::{DateTime, Utc};

/// Source of `occurred_at` timestamps for new events.
///
/// Domain behaviour methods take a `&dyn Clock` instead of reading system
/// time, so tests can pin timestamps and replays stay reproducible.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
