//! Tracing bootstrap for binaries embedding the service.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::error::ServiceError;

/// Install the global `tracing` subscriber. The filter comes from
/// `RUST_LOG`, defaulting to `info`. Fails if a subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<(), ServiceError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| ServiceError::Telemetry(e.to_string()))
}
