//! HTTP server module
//!
//! Accepts TCP connections and serves HTTP/1.1 on each one from its own
//! Tokio task, dispatching every request through the [`Router`].

use crate::config::ServerConfig;
use crate::handler::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Pause after a failed accept before trying again
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),
}

/// HTTP Server
///
/// Binding happens in [`Server::bind`], so the listening address is known
/// (and reachable) before [`Server::run`] is called.
pub struct Server {
    router: Router,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind to the configured address. Port 0 lets the OS pick a port.
    pub async fn bind(config: &ServerConfig, router: Router) -> Result<Self, ServerError> {
        let addr: SocketAddr = config
            .address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        debug!(address = %local_addr, "server bound");

        Ok(Self {
            router,
            listener,
            local_addr,
        })
    }

    /// The address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process is terminated.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` completes.
    ///
    /// Once `shutdown` resolves no new connections are accepted; connections
    /// already accepted finish on their own tasks.
    ///
    /// Accept failures never stop the server: aborted or reset handshakes
    /// are skipped, anything else (such as running out of file descriptors)
    /// is logged and retried after a short pause.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(address = %self.local_addr, "shutting down http server");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            let router = self.router.clone();
                            tokio::spawn(serve_connection(stream, peer_addr, router));
                        }
                        Err(e) if is_connection_error(&e) => {
                            debug!(error = %e, "connection dropped during accept");
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
            }
        }
    }
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

async fn serve_connection(stream: TcpStream, peer_addr: SocketAddr, router: Router) {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req: Request<Incoming>| {
        let response = router.route(&req);
        async move { Ok::<_, Infallible>(response) }
    });

    // Write failures are not reported back to the handler.
    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
        debug!(peer = %peer_addr, error = %e, "error serving connection");
    }
}
