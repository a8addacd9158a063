//! # Logging Setup
//!
//! Installs a `tracing-subscriber` pipeline for binaries and tests that host
//! the executor. Library code only emits events; it never installs a
//! subscriber on its own.

use std::env;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target used for guest `println` output.
pub const PRINTLN_TARGET: &str = "sandbox_executor::println";

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive (e.g. `info`, `sandbox_executor=debug`).
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Loads from `SANDBOX_LOG_LEVEL` (or `RUST_LOG`) and `SANDBOX_JSON_LOGS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            level: env::var("SANDBOX_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
            json: env::var("SANDBOX_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Logging initialisation failure.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber is already installed.
    #[error("subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Installs the global subscriber.
///
/// # Errors
///
/// `Filter` for an unparsable level, `AlreadyInstalled` if another subscriber
/// won the race.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::Filter(e.to_string()))?;

    if config.json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInstalled(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInstalled(e.to_string()))?;
    }

    tracing::info!(level = %config.level, json = config.json, "logging initialized");
    Ok(())
}
