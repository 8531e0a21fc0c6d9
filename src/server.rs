//! Transport: accepts connections and feeds requests to the adapter.
//!
//! The bridge owns no protocol code. hyper parses and writes HTTP/1.1 and
//! HTTP/2; every request on every connection goes through
//! [`Adapter::dispatch`](crate::Adapter::dispatch).
//!
//! # Shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets in-flight
//! connections finish, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::adapter::Adapter;
use crate::error::Error;

/// The HTTP server driving an [`Adapter`].
pub struct Server {
    addr: String,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. The address is parsed there.
    ///
    /// ```rust,no_run
    /// use tsu_bridge::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self { addr: addr.to_owned() }
    }

    /// Starts `adapter` and dispatches every accepted request through it.
    ///
    /// The adapter must already be booted. Returns only after a full graceful
    /// shutdown (SIGTERM or Ctrl-C, followed by all in-flight requests
    /// completing).
    pub async fn serve(self, mut adapter: Adapter) -> Result<(), Error> {
        let addr: SocketAddr = self
            .addr
            .parse()
            .map_err(|_| Error::InvalidAddress(self.addr.clone()))?;
        adapter.start()?;

        let listener = TcpListener::bind(addr).await?;

        // Shared read-only by every connection task; registration is closed.
        let adapter = Arc::new(adapter);

        info!(%addr, adapter = %adapter.name(), "tsu-bridge listening");

        // One task per connection, drained on shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown wins over queued connections.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let adapter = Arc::clone(&adapter);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request, not once per connection.
                        let svc = service_fn(move |req| {
                            let adapter = Arc::clone(&adapter);
                            async move {
                                let res = adapter.dispatch(req, Some(remote_addr)).await;
                                Ok::<_, Infallible>(res.into_inner())
                            }
                        });

                        // HTTP/1.1 or HTTP/2, whichever the client speaks.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, error = %e, "connection failed");
                        }
                    });
                }

                // Reap finished tasks so the set stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("tsu-bridge stopped");
        Ok(())
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. Ctrl-C only on non-Unix targets.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
