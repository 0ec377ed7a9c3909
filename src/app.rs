//! Process entrypoint sequencing
//!
//! Startup runs in a fixed order, each step gating the next:
//!
//! 1. build the span exporter (failure aborts startup, nothing is bound)
//! 2. build the tracer provider, install it globally, derive the tracer
//! 3. build the die and the handler, register the route
//! 4. bind and serve until the shutdown future resolves
//!
//! The tracer provider is flushed and shut down on every exit path after
//! step 2. The logger is set up by the caller beforehand, since startup
//! failures are reported through it.

use crate::config::{Config, ConfigError, TracingConfig};
use crate::dice::Dice;
use crate::handler::{RollDiceHandler, Router};
use crate::server::{Server, ServerError};
use crate::tracing::{otlp_exporter, TracingError, TracingPipeline};
use opentelemetry_sdk::export::trace::SpanExporter;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Startup failures. Each one has already been logged when it is returned.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tracing(#[from] TracingError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Run the service with the OTLP exporter until `shutdown` resolves.
pub async fn run<F>(config: Config, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()>,
{
    run_with(config, otlp_exporter, shutdown).await
}

/// Run the service with a caller-supplied exporter factory.
pub async fn run_with<E, M, F>(config: Config, make_exporter: M, shutdown: F) -> Result<(), AppError>
where
    E: SpanExporter + 'static,
    M: FnOnce(&TracingConfig) -> Result<E, TracingError>,
    F: Future<Output = ()>,
{
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        return Err(e.into());
    }

    let exporter = match make_exporter(&config.tracing) {
        Ok(exporter) => exporter,
        Err(e) => {
            error!(error = %e, "failed to create exporter");
            return Err(e.into());
        }
    };

    let mut pipeline = TracingPipeline::new(exporter, &config.tracing);
    pipeline.install_global();

    let handler = RollDiceHandler::new(Arc::new(Dice::from_clock()), pipeline.tracer());
    let result = serve(&config, Router::new(handler), shutdown).await;

    // Shutdown errors do not change the outcome of the run.
    if let Err(e) = pipeline.close().await {
        debug!(error = %e, "tracer provider shutdown failed");
    }

    result
}

async fn serve<F>(config: &Config, router: Router, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()>,
{
    info!(port = port_of(&config.server.address), "starting http server");

    let server = match Server::bind(&config.server, router).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "error running server");
            return Err(e.into());
        }
    };

    server.run_until(shutdown).await;
    Ok(())
}

/// Port part of a `host:port` listen address.
fn port_of(address: &str) -> &str {
    address.rsplit_once(':').map_or(address, |(_, port)| port)
}
