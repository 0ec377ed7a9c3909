//! Configuration loading tests
//!
//! Test Coverage:
//! - YAML file loading with defaults for absent fields
//! - Environment variable expansion in string values
//! - Validation failures surface as errors

use rolldice::config::{Config, ConfigError, LogFormat};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
server:
  address: "127.0.0.1:18080"
logging:
  level: "warn"
  format: "json"
tracing:
  service_name: "dice-svc"
  tracer_name: "dice-tracer"
  otlp:
    endpoint: "http://otel-collector:4317"
    timeout_seconds: 3
  sampling:
    strategy: "parent_based"
    ratio: 0.5
  batch:
    max_queue_size: 100
    scheduled_delay_millis: 200
    max_export_batch_size: 50
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.server.address, "127.0.0.1:18080");
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.tracing.service_name, "dice-svc");
    assert_eq!(config.tracing.tracer_name, "dice-tracer");
    assert_eq!(
        config.tracing.otlp.endpoint.as_deref(),
        Some("http://otel-collector:4317")
    );
    assert_eq!(config.tracing.otlp.timeout_seconds, 3);
    assert_eq!(config.tracing.sampling.strategy, "parent_based");
    assert_eq!(config.tracing.batch.max_export_batch_size, 50);
}

#[test]
fn test_load_missing_file() {
    let result = Config::load("/nonexistent/rolldice.yaml");
    assert!(matches!(result, Err(ConfigError::IoError(_))));
}

#[test]
fn test_load_malformed_yaml() {
    let file = write_config("server: [unclosed");
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_load_rejects_invalid_values() {
    let file = write_config(
        r#"
tracing:
  otlp:
    endpoint: "grpc://collector:4317"
"#,
    );
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
#[serial]
fn test_env_expansion_in_fields() {
    std::env::set_var("ROLLDICE_TEST_ENDPOINT", "http://from-env:4317");
    std::env::remove_var("ROLLDICE_TEST_SERVICE");

    let file = write_config(
        r#"
tracing:
  service_name: "${ROLLDICE_TEST_SERVICE:-RollDice-default}"
  otlp:
    endpoint: "${ROLLDICE_TEST_ENDPOINT}"
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.tracing.service_name, "RollDice-default");
    assert_eq!(
        config.tracing.otlp.endpoint.as_deref(),
        Some("http://from-env:4317")
    );

    std::env::remove_var("ROLLDICE_TEST_ENDPOINT");
}

#[test]
#[serial]
fn test_empty_env_endpoint_means_transport_default() {
    std::env::set_var("ROLLDICE_TEST_EMPTY", "");

    let file = write_config(
        r#"
tracing:
  otlp:
    endpoint: "${ROLLDICE_TEST_EMPTY}"
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert!(config.tracing.otlp.endpoint.is_none());

    std::env::remove_var("ROLLDICE_TEST_EMPTY");
}
