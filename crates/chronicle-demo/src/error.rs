//! Chronicle demo: error types.

use chronicle_core::error::DomainError;
use chronicle_publisher::error::PublisherError;
use thiserror::Error;

/// Startup and runtime errors for the demo binary.
#[derive(Debug, Error)]
pub enum DemoError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The tracing subscriber could not be installed.
    #[error("logging error: {0}")]
    Logging(String),

    /// A command or query failed in the domain layer.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The background publisher could not be configured or stopped.
    #[error(transparent)]
    Publisher(#[from] PublisherError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_message_is_passed_through() {
        let err = DemoError::from(DomainError::AggregateNotFound("c1".to_owned()));

        assert_eq!(
            err.to_string(),
            DomainError::AggregateNotFound("c1".to_owned()).to_string()
        );
    }

    #[test]
    fn test_config_error_names_the_problem() {
        let err = DemoError::Config("CHRONICLE_LOG_FORMAT must be json or pretty".to_owned());

        assert_eq!(
            err.to_string(),
            "configuration error: CHRONICLE_LOG_FORMAT must be json or pretty"
        );
    }
}
