//! Common Test Infrastructure
//!
//! Provides shared utilities for integration tests:
//! - Recording span exporter
//! - Test server management
//! - Free port discovery

#![allow(dead_code)]

use futures::future::BoxFuture;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use parking_lot::Mutex;
use rolldice::config::{BatchConfig, ServerConfig, TracingConfig};
use rolldice::dice::Dice;
use rolldice::handler::{RollDiceHandler, Router};
use rolldice::server::Server;
use rolldice::tracing::TracingPipeline;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Span exporter that keeps every exported span in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the spans exported so far
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().clone()
    }

    pub fn span_count(&self) -> usize {
        self.spans.lock().len()
    }

    /// Number of times the pipeline shut this exporter down
    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// The batch processor acknowledges its final flush before it shuts the
    /// exporter down, so give the shutdown call a moment to land.
    pub async fn wait_for_shutdown(&self) -> usize {
        for _ in 0..50 {
            if self.shutdown_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.shutdown_count()
    }
}

impl SpanExporter for RecordingExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        self.spans.lock().extend(batch);
        Box::pin(std::future::ready(Ok(())))
    }

    fn shutdown(&mut self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Tracing config with a short batch delay so tests see exports quickly.
pub fn test_tracing_config() -> TracingConfig {
    TracingConfig {
        batch: BatchConfig {
            scheduled_delay_millis: 50,
            ..BatchConfig::default()
        },
        ..TracingConfig::default()
    }
}

/// A free local port. The port is released before returning, so a later
/// bind can still race with other processes; good enough for tests.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to find a free port")
}

/// Running server wired to a recording exporter
pub struct TestServer {
    pub addr: SocketAddr,
    pub exporter: RecordingExporter,
    pub pipeline: TracingPipeline,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Bind on an ephemeral port and start serving in the background.
    pub async fn start() -> Self {
        let exporter = RecordingExporter::new();
        let pipeline = TracingPipeline::new(exporter.clone(), &test_tracing_config());
        let handler = RollDiceHandler::new(Arc::new(Dice::from_clock()), pipeline.tracer());

        let config = ServerConfig {
            address: "127.0.0.1:0".into(),
        };
        let server = Server::bind(&config, Router::new(handler))
            .await
            .expect("Failed to bind test server");
        let addr = server.local_addr();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .run_until(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            exporter,
            pipeline,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop accepting connections, then flush and shut down the pipeline.
    pub async fn stop(mut self) -> RecordingExporter {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        let exporter = self.exporter.clone();
        self.pipeline
            .close()
            .await
            .expect("Failed to shut down tracing pipeline");
        exporter
    }
}

/// Poll until something accepts connections on `addr`.
pub async fn wait_for_listener(addr: SocketAddr) -> bool {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// HTTP client that talks to the test server directly, ignoring any
/// proxy settings in the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("Failed to build HTTP client")
}
