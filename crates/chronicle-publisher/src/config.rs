//! Background publisher configuration.

use std::time::Duration;

use crate::error::PublisherError;

/// Environment variable holding the queue capacity, in batches.
pub const CAPACITY_ENV: &str = "CHRONICLE_PUBLISHER_CAPACITY";

/// Environment variable holding the shutdown drain deadline, in milliseconds.
pub const DRAIN_TIMEOUT_ENV: &str = "CHRONICLE_PUBLISHER_DRAIN_TIMEOUT_MS";

/// Queue capacity used when nothing is configured.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Drain deadline used when nothing is configured.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for [`crate::background::BackgroundPublisher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Maximum number of batches waiting for delivery.
    pub capacity: usize,
    /// How long `shutdown` waits for queued batches before abandoning
    /// in-flight deliveries.
    pub drain_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl PublisherConfig {
    /// Reads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `PublisherError::Config` if the capacity is not a positive
    /// integer or the drain timeout is not a whole number of milliseconds.
    pub fn from_env() -> Result<Self, PublisherError> {
        Self::from_vars(
            std::env::var(CAPACITY_ENV).ok().as_deref(),
            std::env::var(DRAIN_TIMEOUT_ENV).ok().as_deref(),
        )
    }

    fn from_vars(
        capacity: Option<&str>,
        drain_timeout_ms: Option<&str>,
    ) -> Result<Self, PublisherError> {
        let mut config = Self::default();
        if let Some(raw) = capacity {
            config.capacity = raw.trim().parse().map_err(|e| {
                PublisherError::Config(format!("{CAPACITY_ENV} must be a valid usize: {e}"))
            })?;
            if config.capacity == 0 {
                return Err(PublisherError::Config(format!(
                    "{CAPACITY_ENV} must be greater than zero"
                )));
            }
        }
        if let Some(raw) = drain_timeout_ms {
            let millis: u64 = raw.trim().parse().map_err(|e| {
                PublisherError::Config(format!("{DRAIN_TIMEOUT_ENV} must be a valid u64: {e}"))
            })?;
            config.drain_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_vars_use_defaults() {
        let config = PublisherConfig::from_vars(None, None).unwrap();

        assert_eq!(config, PublisherConfig::default());
    }

    #[test]
    fn test_vars_are_parsed() {
        let config = PublisherConfig::from_vars(Some(" 16 "), Some("250")).unwrap();

        assert_eq!(config.capacity, 16);
        assert_eq!(config.drain_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_capacity_is_rejected() {
        assert!(matches!(
            PublisherConfig::from_vars(Some("many"), None),
            Err(PublisherError::Config(_))
        ));
        assert!(matches!(
            PublisherConfig::from_vars(Some("0"), None),
            Err(PublisherError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_drain_timeout_is_rejected() {
        assert!(matches!(
            PublisherConfig::from_vars(None, Some("-5")),
            Err(PublisherError::Config(_))
        ));
    }
}
