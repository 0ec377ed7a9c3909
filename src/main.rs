//! RollDice - dice-rolling HTTP service with distributed tracing
//!
//! Serves `GET /rolldice` on port 8080 and exports spans over OTLP/gRPC.
//! The collector endpoint comes from the standard `OTEL_EXPORTER_OTLP_*`
//! environment variables, defaulting to `http://localhost:4317`.

use rolldice::{app, config::Config};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = Config::default();

    // The logger is not available yet, so report this one directly.
    if let Err(e) = rolldice::tracing::init_subscriber(&config.logging) {
        eprintln!("error creating logger, error: {}", e);
        return;
    }

    info!("Starting RollDice v{}", rolldice::VERSION);

    // Failures are logged where they happen; exit normally either way.
    if let Err(e) = app::run(config, shutdown_signal()).await {
        debug!(error = %e, "exiting after startup failure");
    }
}

/// Resolves on Ctrl-C. If the signal handler cannot be installed the
/// service keeps running until it is killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
