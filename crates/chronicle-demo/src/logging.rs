//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::error::DemoError;

/// Installs the global subscriber. The filter comes from `RUST_LOG` and
/// falls back to `info`.
///
/// # Errors
///
/// Returns `DemoError::Logging` if a global subscriber is already set.
pub fn init(format: LogFormat) -> Result<(), DemoError> {
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|e| DemoError::Logging(e.to_string()))
}
