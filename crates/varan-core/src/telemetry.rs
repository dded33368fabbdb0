//! Tracing bootstrap

use crate::config::{AnnotationsConfig, LogFormat};
use crate::error::{VaranError, VaranResult};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber
///
/// `RUST_LOG` wins over [`AnnotationsConfig::log_filter`]. Returns `false`
/// when a global subscriber was already installed.
///
/// # Errors
/// Returns [`VaranError::LogFilter`] if the configured directive does not parse
pub fn init_tracing(config: &AnnotationsConfig) -> VaranResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(|err| VaranError::LogFilter {
            filter: config.log_filter.clone(),
            message: err.to_string(),
        })?,
    };

    let installed = match config.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_ok(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
    };

    if installed {
        tracing::debug!(format = ?config.log_format, "tracing initialized");
    }
    Ok(installed)
}
