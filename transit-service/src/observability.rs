//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Build the log filter for the configured level
///
/// An unparsable level falls back to `info`.
pub fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a JSON `tracing` subscriber for the process
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(config))
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(
        environment = %config.service.environment,
        "Tracing initialized for service: {}",
        config.service.name
    );

    Ok(())
}
