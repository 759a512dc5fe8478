//! Validation hooks run before an event mutates an aggregate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A single structured validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Human-readable description.
    pub message: String,
    /// Optional machine-readable code.
    pub code: Option<String>,
}

impl ValidationError {
    /// Creates an entry without a code.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Creates an entry carrying a machine-readable code.
    #[must_use]
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Outcome of validating an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationResult {
    /// The event may be applied.
    #[default]
    Success,
    /// The event must not be applied.
    Failure {
        /// Summary message.
        message: String,
        /// Structured entries, possibly empty.
        errors: Vec<ValidationError>,
    },
}

impl ValidationResult {
    /// Builds a failure with a single entry.
    #[must_use]
    pub fn failure(message: impl Into<String>, error: ValidationError) -> Self {
        Self::Failure {
            message: message.into(),
            errors: vec![error],
        }
    }

    /// Returns `true` when validation passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Combines two results, keeping the first message and concatenating
    /// error entries in order.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Success, other) => other,
            (failure, Self::Success) => failure,
            (
                Self::Failure {
                    message,
                    mut errors,
                },
                Self::Failure {
                    errors: more_errors,
                    ..
                },
            ) => {
                errors.extend(more_errors);
                Self::Failure { message, errors }
            }
        }
    }

    /// Converts the outcome into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ValidationFailed` for a failure.
    pub fn into_result(self) -> Result<(), DomainError> {
        match self {
            Self::Success => Ok(()),
            Self::Failure { message, errors } => {
                Err(DomainError::ValidationFailed { message, errors })
            }
        }
    }
}

/// External synchronous validator, composed with an aggregate per call.
pub trait EventValidator<E>: Send + Sync {
    /// Validates an event before it is applied.
    fn validate(&self, event: &E) -> ValidationResult;
}

impl<E, F> EventValidator<E> for F
where
    F: Fn(&E) -> ValidationResult + Send + Sync,
{
    fn validate(&self, event: &E) -> ValidationResult {
        self(event)
    }
}

/// External validator that may suspend, e.g. to consult another service.
#[async_trait]
pub trait AsyncEventValidator<E: Sync>: Send + Sync {
    /// Validates an event before it is applied.
    async fn validate(&self, event: &E) -> ValidationResult;
}
