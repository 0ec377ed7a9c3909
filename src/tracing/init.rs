//! OpenTelemetry tracer pipeline construction and lifecycle management
//!
//! The pipeline moves through a fixed sequence of states:
//!
//! ```text
//! exporter built -> ProviderReady -> Active (installed globally) -> ShutDown
//! ```
//!
//! Shutdown flushes buffered spans and releases the batch processor. It runs
//! at most once, either explicitly or when the pipeline is dropped.

use crate::config::{is_valid_http_url, SamplingConfig, TracingConfig};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{SpanExporterBuilder, WithExportConfig};
use opentelemetry_sdk::export::trace::SpanExporter;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{self as sdktrace, BatchSpanProcessor, Sampler, Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::debug;

/// Resource attribute key carrying the service name
pub const SERVICE_NAME_KEY: &str = "service.name";

/// Errors that can occur while building or tearing down the tracing pipeline or logger
#[derive(Error, Debug)]
pub enum TracingError {
    #[error("Invalid OTLP endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to initialize OTLP exporter: {0}")]
    ExporterError(String),

    #[error("Tracer provider error: {0}")]
    ProviderError(String),

    #[error("Failed to initialize logger: {0}")]
    SubscriberError(String),
}

/// Lifecycle state of a [`TracingPipeline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Provider built, not yet installed as the process-wide provider
    ProviderReady,
    /// Installed globally; spans flow to the exporter
    Active,
    /// Flushed and released; new spans are not recorded
    ShutDown,
}

/// Build the OTLP/gRPC span exporter.
///
/// Without an explicit endpoint the transport falls back to its own
/// discovery (`OTEL_EXPORTER_OTLP_TRACES_ENDPOINT`,
/// `OTEL_EXPORTER_OTLP_ENDPOINT`, then `http://localhost:4317`). The channel
/// connects lazily, so an unreachable collector does not fail construction.
///
/// Must be called from within a Tokio runtime.
pub fn otlp_exporter(
    config: &TracingConfig,
) -> Result<opentelemetry_otlp::SpanExporter, TracingError> {
    let mut builder = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_timeout(Duration::from_secs(config.otlp.timeout_seconds));

    if let Some(ref endpoint) = config.otlp.endpoint {
        if !is_valid_http_url(endpoint) {
            return Err(TracingError::InvalidEndpoint(format!(
                "Endpoint must start with http:// or https://, got: {}",
                endpoint
            )));
        }
        builder = builder.with_endpoint(endpoint.clone());
    }

    SpanExporterBuilder::from(builder)
        .build_span_exporter()
        .map_err(|e| TracingError::ExporterError(e.to_string()))
}

/// Resource attached to every span: SDK defaults merged with the configured
/// service name, which wins over any detected value.
pub fn service_resource(service_name: &str) -> Resource {
    Resource::default().merge(&Resource::new(vec![KeyValue::new(
        SERVICE_NAME_KEY,
        service_name.to_string(),
    )]))
}

fn sampler(config: &SamplingConfig) -> Sampler {
    match config.strategy.as_str() {
        "never" => Sampler::AlwaysOff,
        "ratio" => Sampler::TraceIdRatioBased(config.ratio),
        "parent_based" => Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(config.ratio))),
        _ => Sampler::AlwaysOn,
    }
}

/// Batching tracer provider plus the named tracer derived from it.
#[derive(Debug)]
pub struct TracingPipeline {
    provider: Option<TracerProvider>,
    tracer: Tracer,
    state: PipelineState,
}

impl TracingPipeline {
    /// Wrap `exporter` in a batch span processor and build the provider.
    ///
    /// Spans are buffered and handed to the exporter from a background Tokio
    /// task, so this must be called from within a Tokio runtime.
    pub fn new<E>(exporter: E, config: &TracingConfig) -> Self
    where
        E: SpanExporter + 'static,
    {
        let batch = sdktrace::BatchConfig::default()
            .with_max_queue_size(config.batch.max_queue_size)
            .with_scheduled_delay(Duration::from_millis(config.batch.scheduled_delay_millis))
            .with_max_export_batch_size(config.batch.max_export_batch_size);

        let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
            .with_batch_config(batch)
            .build();

        let provider = TracerProvider::builder()
            .with_span_processor(processor)
            .with_config(
                sdktrace::Config::default()
                    .with_sampler(sampler(&config.sampling))
                    .with_resource(service_resource(&config.service_name)),
            )
            .build();

        let tracer = provider.tracer(config.tracer_name.clone());

        debug!(
            service = %config.service_name,
            tracer = %config.tracer_name,
            "tracer provider ready"
        );

        Self {
            provider: Some(provider),
            tracer,
            state: PipelineState::ProviderReady,
        }
    }

    /// Install the provider and the W3C trace-context propagator as the
    /// process-wide defaults.
    pub fn install_global(&mut self) {
        if self.state != PipelineState::ProviderReady {
            return;
        }
        if let Some(ref provider) = self.provider {
            global::set_text_map_propagator(TraceContextPropagator::new());
            let _ = global::set_tracer_provider(provider.clone());
            self.state = PipelineState::Active;
        }
    }

    /// Handle to the named tracer. Clones share the provider.
    pub fn tracer(&self) -> Tracer {
        self.tracer.clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Flush pending spans, then release the provider.
    ///
    /// Blocks the calling thread until the batch processor has drained. From
    /// async code use [`TracingPipeline::close`] instead. Calling this more
    /// than once is a no-op.
    pub fn shutdown(&mut self) -> Result<(), TracingError> {
        let Some(provider) = self.provider.take() else {
            return Ok(());
        };
        let installed = self.state == PipelineState::Active;
        self.state = PipelineState::ShutDown;
        shutdown_provider(provider, installed)
    }

    /// Run [`TracingPipeline::shutdown`] on the blocking pool so the async
    /// runtime stays free to drive the batch processor while it drains.
    pub async fn close(mut self) -> Result<(), TracingError> {
        tokio::task::spawn_blocking(move || self.shutdown())
            .await
            .map_err(|e| TracingError::ProviderError(e.to_string()))?
    }
}

fn shutdown_provider(provider: TracerProvider, installed: bool) -> Result<(), TracingError> {
    let flushed = provider
        .force_flush()
        .into_iter()
        .find_map(Result::err)
        .map_or(Ok(()), |e| Err(TracingError::ProviderError(e.to_string())));

    if installed {
        global::shutdown_tracer_provider();
    }

    // Dropping the last provider handle shuts the span processors down.
    drop(provider);
    flushed
}

/// How long a dropped pipeline waits for its flush before giving up.
const DROP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

impl Drop for TracingPipeline {
    /// Shut down a pipeline that was never closed.
    ///
    /// The flush waits on the batch task, which runs on the Tokio runtime, so
    /// it runs on its own thread. A current-thread runtime drives that task
    /// from this very thread, so there the flush is left to finish in the
    /// background. Otherwise the wait is bounded by [`DROP_SHUTDOWN_TIMEOUT`].
    fn drop(&mut self) {
        let Some(provider) = self.provider.take() else {
            return;
        };
        let installed = self.state == PipelineState::Active;
        self.state = PipelineState::ShutDown;

        let (done_tx, done_rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("tracer-shutdown".into())
            .spawn(move || {
                let _ = done_tx.send(shutdown_provider(provider, installed));
            });
        if let Err(e) = spawned {
            debug!(error = %e, "failed to spawn tracer shutdown thread");
            return;
        }

        let wait = || done_rx.recv_timeout(DROP_SHUTDOWN_TIMEOUT);
        let outcome = match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::CurrentThread) => return,
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(wait),
            _ => wait(),
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "tracer provider shutdown failed"),
            Err(_) => debug!("tracer provider shutdown timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Key;

    #[test]
    fn test_resource_carries_service_name() {
        let resource = service_resource("RollDice");
        let value = resource.get(Key::new(SERVICE_NAME_KEY)).unwrap();
        assert_eq!(value.as_str(), "RollDice");
        assert!(resource.get(Key::new("telemetry.sdk.name")).is_some());
    }

    #[test]
    fn test_sampler_selection() {
        let mut config = SamplingConfig::default();
        assert!(matches!(sampler(&config), Sampler::AlwaysOn));

        config.strategy = "never".into();
        assert!(matches!(sampler(&config), Sampler::AlwaysOff));

        config.strategy = "ratio".into();
        config.ratio = 0.25;
        assert!(matches!(sampler(&config), Sampler::TraceIdRatioBased(r) if r == 0.25));

        config.strategy = "parent_based".into();
        assert!(matches!(sampler(&config), Sampler::ParentBased(_)));
    }

    #[tokio::test]
    async fn test_otlp_exporter_rejects_bad_endpoint() {
        let mut config = TracingConfig::default();
        config.otlp.endpoint = Some("collector:4317".into());
        let result = otlp_exporter(&config);
        assert!(matches!(result, Err(TracingError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_otlp_exporter_builds_without_collector() {
        let mut config = TracingConfig::default();
        config.otlp.endpoint = Some("http://127.0.0.1:4317".into());
        assert!(otlp_exporter(&config).is_ok());
    }
}
