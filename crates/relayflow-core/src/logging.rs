/*!
 * Logging functionality for RelayFlow.
 *
 * This module provides tracing setup and the spans used by the two boot
 * stages, so that every log line emitted during bring-up and topology
 * construction can be attributed to the stage and peripheral that produced it.
 */
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize the logging system with default configuration
pub fn init() -> Result<()> {
    init_with_filter("info")
}

/// Initialize the logging system from the `[logging]` configuration section
pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    install(&config.level, config.with_target)
}

/// Initialize the logging system with a specific filter
///
/// # Arguments
///
/// * `filter` - The log filter string (e.g., "info", "debug", "relayflow_devices=trace")
pub fn init_with_filter(filter: &str) -> Result<()> {
    install(filter, true)
}

fn install(filter: &str, with_target: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(with_target))
        .with(filter)
        .try_init()
        .map_err(|e| Error::logging(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// A type alias for a tracing span
pub type Span = tracing::Span;

/// Create a span covering one boot stage
///
/// # Arguments
///
/// * `stage` - The stage name ("bring-up", "topology")
pub fn stage_span(stage: &str) -> Span {
    tracing::info_span!("boot", stage = %stage)
}

/// Create a span for a single physical channel
///
/// # Arguments
///
/// * `kind` - The channel kind ("input", "output", "power-meter")
/// * `id` - The channel id
pub fn channel_span(kind: &str, id: u8) -> Span {
    tracing::debug_span!("channel", kind = %kind, id = id)
}
