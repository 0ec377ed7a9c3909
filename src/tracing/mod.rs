//! OpenTelemetry tracing pipeline and structured logging
//!
//! Spans go through an OTLP/gRPC exporter wrapped in a batch span processor.
//! Logs go through a `tracing` subscriber on stdout.
//!
//! # Example
//!
//! ```no_run
//! use rolldice::config::TracingConfig;
//! use rolldice::tracing::{otlp_exporter, TracingPipeline};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TracingConfig::default();
//! let mut pipeline = TracingPipeline::new(otlp_exporter(&config)?, &config);
//! pipeline.install_global();
//! let tracer = pipeline.tracer();
//! // ... hand `tracer` to the request handler ...
//! pipeline.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod init;
pub mod propagation;
pub mod subscriber;

pub use init::{otlp_exporter, PipelineState, TracingError, TracingPipeline};
pub use subscriber::init_subscriber;
