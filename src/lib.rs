//! RollDice Library
//!
//! A small HTTP service that rolls a six-sided die, instrumented with
//! OpenTelemetry distributed tracing and structured logging.
//!
//! # Features
//!
//! - **One endpoint**: `/rolldice` answers with a bare number from 1 to 6
//! - **Tracing**: one server span per roll, batched and exported over OTLP/gRPC
//! - **Propagation**: W3C `traceparent` headers make the span join the caller's trace
//! - **Logging**: `tracing` records on stdout, console or JSON encoded
//!
//! # Example
//!
//! ```no_run
//! use rolldice::{app, config::Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     rolldice::tracing::init_subscriber(&config.logging).expect("logger");
//!     let shutdown = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     let _ = app::run(config, shutdown).await;
//! }
//! ```

pub mod app;
pub mod config;
pub mod dice;
pub mod handler;
pub mod server;
pub mod tracing;

// Re-export commonly used types
pub use config::Config;
pub use dice::Dice;
pub use handler::{RollDiceHandler, Router};
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
