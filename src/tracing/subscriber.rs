//! Process-wide structured logger
//!
//! Installs a `tracing` subscriber built from:
//! - **EnvFilter**: `RUST_LOG` when set, otherwise the configured level
//! - **Fmt layer**: human-readable console lines, or JSON objects
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG | logging.level)
//!   └── Fmt Layer (console | json)
//! ```

use crate::config::{LogFormat, LoggingConfig};
use crate::tracing::init::TracingError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Build the level filter: `RUST_LOG` wins over the configured directive.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TracingError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            TracingError::SubscriberError(format!(
                "Invalid log level '{}': {}",
                config.level, e
            ))
        })
}

/// Initialize the global subscriber.
///
/// Fails when the filter directive cannot be parsed or a global subscriber
/// is already installed.
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), TracingError> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    let result = match config.format {
        LogFormat::Console => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true);
            tracing::subscriber::set_global_default(registry.with(fmt_layer))
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true);
            tracing::subscriber::set_global_default(registry.with(fmt_layer))
        }
    };

    result.map_err(|e| {
        TracingError::SubscriberError(format!(
            "Failed to set global subscriber (may already be initialized): {}",
            e
        ))
    })
}
