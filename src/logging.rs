//! Structured logging setup built on `tracing`.

use crate::error::ManagerError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// Colored output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_format(),
            color: default_true(),
        }
    }
}

/// Initialize the logging system.
///
/// The `LFT_LOG` environment variable takes priority over the configured
/// level and accepts full `EnvFilter` directives.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ManagerError> {
    let filter = match EnvFilter::try_from_env("LFT_LOG") {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(&config.level),
    };
    let base = Registry::default().with(filter);

    match config.format.as_str() {
        "json" => {
            base.with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .init();
        }
        "text" => {
            base.with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.color),
            )
            .init();
        }
        other => {
            return Err(ManagerError::Config(format!(
                "invalid log format: {} (must be 'json' or 'text')",
                other
            )));
        }
    }
    Ok(())
}
