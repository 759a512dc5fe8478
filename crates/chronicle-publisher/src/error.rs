//! Publisher error types.

use thiserror::Error;

/// Errors raised while configuring or running the background publisher.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// A configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The worker task panicked or was aborted.
    #[error("publisher worker failed: {0}")]
    Worker(String),
}
