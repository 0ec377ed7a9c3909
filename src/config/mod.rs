//! Configuration module for RollDice
//!
//! Every field has a default that reproduces the stock service: listen on
//! `0.0.0.0:8080`, log in the human-readable development format, and export
//! spans for service `RollDice` through OTLP/gRPC using the transport's own
//! endpoint discovery. YAML files are supported for embedders and tests, with
//! environment variable expansion in string values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with a letter or underscore and contain only
/// uppercase letters, digits, and underscores.
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("static pattern is valid");
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let var_name = &cap[1];

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);
    result
}

/// Deserialize a string, expanding `${VAR}` references.
fn deserialize_with_env<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(expand_env_vars(&s))
}

/// Like [`deserialize_with_env`], but for optional values. A value that
/// expands to an empty string is treated as unset.
fn deserialize_optional_with_env<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.map(|v| expand_env_vars(&v)).filter(|v| !v.trim().is_empty()))
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
pub(crate) fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Server address cannot be empty".into(),
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Log level cannot be empty".into(),
            ));
        }

        self.tracing.validate()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on. Default: "0.0.0.0:8080"
    #[serde(default = "default_address", deserialize_with = "deserialize_with_env")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Output encoding of the console logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line development output
    #[default]
    Console,
    /// One JSON object per record
    Json,
}

/// Structured logger configuration.
///
/// `RUST_LOG` takes precedence over `level` when it is set.
///
/// # Example
///
/// ```yaml
/// logging:
///   level: "info,rolldice=debug"
///   format: "json"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset. Default: "info,rolldice=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console encoding. Default: console
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info,rolldice=debug".to_string()
}

// ============================================================================
// Tracing Configuration
// ============================================================================

/// OpenTelemetry distributed tracing configuration.
///
/// # Example
///
/// ```yaml
/// tracing:
///   service_name: "RollDice"
///   tracer_name: "roll-dice"
///   otlp:
///     endpoint: "${OTLP_ENDPOINT:-http://localhost:4317}"
///     timeout_seconds: 10
///   sampling:
///     strategy: "always"
///   batch:
///     scheduled_delay_millis: 5000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// `service.name` resource attribute. Supports ${VAR} and ${VAR:-default} expansion.
    /// Default: "RollDice"
    #[serde(
        default = "default_service_name",
        deserialize_with = "deserialize_with_env"
    )]
    pub service_name: String,

    /// Instrumentation name of the tracer handed to the request handler.
    /// Default: "roll-dice"
    #[serde(default = "default_tracer_name")]
    pub tracer_name: String,

    /// OTLP exporter configuration
    #[serde(default)]
    pub otlp: OtlpConfig,

    /// Trace sampling configuration
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Batch span processor configuration
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            tracer_name: default_tracer_name(),
            otlp: OtlpConfig::default(),
            sampling: SamplingConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl TracingConfig {
    /// Validate the tracing section on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Service name cannot be empty".into(),
            ));
        }

        if self.tracer_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Tracer name cannot be empty".into(),
            ));
        }

        if let Some(ref endpoint) = self.otlp.endpoint {
            if !is_valid_http_url(endpoint) {
                return Err(ConfigError::ValidationError(
                    "Invalid OTLP endpoint: must start with http:// or https://".into(),
                ));
            }
        }

        if self.sampling.ratio < 0.0 || self.sampling.ratio > 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid sampling ratio {}: must be between 0.0 and 1.0",
                self.sampling.ratio
            )));
        }

        match self.sampling.strategy.as_str() {
            "always" | "never" | "ratio" | "parent_based" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid sampling strategy '{}': must be 'always', 'never', 'ratio', or 'parent_based'",
                    self.sampling.strategy
                )))
            }
        }

        if self.batch.max_queue_size == 0 || self.batch.max_export_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "Batch queue and export sizes must be greater than zero".into(),
            ));
        }

        if self.batch.max_export_batch_size > self.batch.max_queue_size {
            return Err(ConfigError::ValidationError(format!(
                "max_export_batch_size ({}) cannot exceed max_queue_size ({})",
                self.batch.max_export_batch_size, self.batch.max_queue_size
            )));
        }

        Ok(())
    }
}

fn default_service_name() -> String {
    "RollDice".to_string()
}

fn default_tracer_name() -> String {
    "roll-dice".to_string()
}

/// OTLP/gRPC exporter configuration.
///
/// Leaving `endpoint` unset defers to the transport's own discovery
/// (`OTEL_EXPORTER_OTLP_TRACES_ENDPOINT`, `OTEL_EXPORTER_OTLP_ENDPOINT`,
/// then `http://localhost:4317`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtlpConfig {
    /// OTLP collector endpoint URL. Supports ${VAR} expansion.
    #[serde(default, deserialize_with = "deserialize_optional_with_env")]
    pub endpoint: Option<String>,

    /// Timeout for OTLP export in seconds. Default: 10
    #[serde(default = "default_otlp_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OtlpConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: default_otlp_timeout(),
        }
    }
}

fn default_otlp_timeout() -> u64 {
    10
}

/// Trace sampling configuration.
///
/// # Sampling Strategies
/// - `always` - Sample all traces (default)
/// - `never` - Sample no traces
/// - `ratio` - Sample a fraction of traces given by `ratio`
/// - `parent_based` - Follow the parent's decision, `ratio` for root spans
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Sampling strategy. Default: "always"
    #[serde(default = "default_sampling_strategy")]
    pub strategy: String,

    /// Sampling ratio (0.0 to 1.0). Default: 1.0
    #[serde(default = "default_sampling_ratio")]
    pub ratio: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            strategy: default_sampling_strategy(),
            ratio: default_sampling_ratio(),
        }
    }
}

fn default_sampling_strategy() -> String {
    "always".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

/// Batch span processor configuration.
///
/// Spans are queued and exported in the background when either the
/// scheduled delay elapses or a full batch is ready.
///
/// # Example
///
/// ```yaml
/// batch:
///   max_queue_size: 2048
///   scheduled_delay_millis: 5000  # Export every 5 seconds
///   max_export_batch_size: 512
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of spans to queue; further spans are dropped. Default: 2048
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Delay in milliseconds between scheduled exports. Default: 5000 (5 seconds)
    #[serde(default = "default_scheduled_delay")]
    pub scheduled_delay_millis: u64,

    /// Maximum number of spans per export batch. Default: 512
    #[serde(default = "default_max_export_batch_size")]
    pub max_export_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            scheduled_delay_millis: default_scheduled_delay(),
            max_export_batch_size: default_max_export_batch_size(),
        }
    }
}

fn default_max_queue_size() -> usize {
    2048
}

fn default_scheduled_delay() -> u64 {
    5000
}

fn default_max_export_batch_size() -> usize {
    512
}
