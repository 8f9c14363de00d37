//! Connection accept loop.
//!
//! Each connection is served by hyper's HTTP/1 implementation in its own task.
//! When the gateway service fails for a request, hyper drops that connection
//! without writing a response.

use axum::body::Body;
use axum::http::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;
use uuid::Uuid;

use crate::api::Gateway;

/// Serve `gateway` on `listener` until `shutdown` resolves.
///
/// Connections still open at shutdown finish their in-flight request first.
pub async fn serve<F>(listener: TcpListener, gateway: Gateway, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    let service = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        id = %Uuid::new_v4(),
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .service(gateway);

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();
    let mut shutdown = std::pin::pin!(shutdown);

    while let Some((stream, peer)) =
        next_connection(&listener, shutdown.as_mut(), ACCEPT_ERROR_BACKOFF).await
    {
        let service = service.clone();
        let token = token.clone();

        tracker.spawn(async move {
            tracing::debug!(%peer, "Connection accepted");
            let handler = service_fn(move |request: Request<Incoming>| {
                service.clone().oneshot(request.map(Body::new))
            });
            let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), handler);
            let mut conn = std::pin::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = token.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };

            if let Err(e) = result {
                tracing::debug!(%peer, error = %e, "Connection closed with error");
            }
        });
    }

    tracing::info!("Shutting down; draining open connections");
    tracker.close();
    token.cancel();
    tracker.wait().await;
    Ok(())
}

/// Pause after a failed accept. Errors such as descriptor exhaustion persist
/// until open connections close.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

trait Accept {
    type Conn;

    async fn accept(&self) -> io::Result<Self::Conn>;
}

impl Accept for TcpListener {
    type Conn = (TcpStream, SocketAddr);

    async fn accept(&self) -> io::Result<Self::Conn> {
        TcpListener::accept(self).await
    }
}

/// Wait for the next connection, or `None` once `shutdown` resolves.
///
/// A failed accept is logged and retried after `backoff`.
async fn next_connection<A, S>(
    acceptor: &A,
    mut shutdown: Pin<&mut S>,
    backoff: Duration,
) -> Option<A::Conn>
where
    A: Accept,
    S: Future<Output = ()>,
{
    loop {
        tokio::select! {
            accepted = acceptor.accept() => match accepted {
                Ok(conn) => return Some(conn),
                Err(e) => tracing::warn!(error = %e, "Failed to accept connection"),
            },
            _ = &mut shutdown => return None,
        }

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = &mut shutdown => return None,
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
