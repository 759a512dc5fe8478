//! Demo configuration read from the environment.

use std::str::FromStr;

use chronicle_publisher::config::PublisherConfig;

use crate::error::DemoError;

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "CHRONICLE_LOG_FORMAT";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line human-readable output.
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = DemoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(DemoError::Config(format!(
                "{LOG_FORMAT_ENV} must be json or pretty, got {other:?}"
            ))),
        }
    }
}

/// Settings for one demo run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemoConfig {
    /// Log output format.
    pub log_format: LogFormat,
    /// Background publisher settings.
    pub publisher: PublisherConfig,
}

impl DemoConfig {
    /// Reads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `DemoError::Config` for an unknown log format and
    /// `DemoError::Publisher` for an invalid queue capacity.
    pub fn from_env() -> Result<Self, DemoError> {
        let publisher = PublisherConfig::from_env()?;
        Self::from_log_format_var(std::env::var(LOG_FORMAT_ENV).ok().as_deref(), publisher)
    }

    fn from_log_format_var(
        value: Option<&str>,
        publisher: PublisherConfig,
    ) -> Result<Self, DemoError> {
        let log_format = value.map(str::parse).transpose()?.unwrap_or_default();
        Ok(Self {
            log_format,
            publisher,
        })
    }
}
