//! HTTP/1 server.
//!
//! The server owns the listener and connections only. Each request body is
//! read in full (bounded by size and time), the peer address is attached as
//! a [`RemoteAddr`] extension, and the request is handed to a [`Dispatch`]
//! implementation that produces the complete response.
//!
//! ```rust,no_run
//! use switchboard_core::{BoxFuture, Request, Response};
//! use switchboard_server::{Dispatch, Server, ServerConfig};
//!
//! struct Hello;
//!
//! impl Dispatch for Hello {
//!     fn dispatch(&self, _request: Request) -> BoxFuture<'_, Response> {
//!         Box::pin(async { Response::new("hello".into()) })
//!     }
//! }
//!
//! # async fn run() -> Result<(), switchboard_server::ServerError> {
//! let config = ServerConfig::builder().http_addr("127.0.0.1:3000").build();
//! Server::new(config, Hello).run().await
//! # }
//! ```

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use bytes::Bytes;
use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use switchboard_core::{BoxFuture, RemoteAddr, Request, Response};
use tokio::net::{TcpListener, TcpStream};

/// Produces the response for a fully buffered request.
///
/// This is the seam between the transport and routing: the server knows
/// nothing about routes, and a dispatcher nothing about sockets.
pub trait Dispatch: Send + Sync + 'static {
    /// Handles one request.
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Response>;
}

impl<D: Dispatch + ?Sized> Dispatch for Arc<D> {
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Response> {
        (**self).dispatch(request)
    }
}

/// The HTTP server.
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<dyn Dispatch>,
}

impl Server {
    /// Creates a server that sends every request to `dispatcher`.
    pub fn new(config: ServerConfig, dispatcher: impl Dispatch) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and runs until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.resolve_addr().await?;
        let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        self.run_on(listener, shutdown).await
    }

    /// Runs on an already bound listener until `shutdown` fires.
    ///
    /// After the signal the listener is closed, open connections finish
    /// their current request, and the call returns once they are gone or
    /// the shutdown timeout passes.
    pub async fn run_on(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();
        let stop = shutdown.recv();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.serve_connection(stream, remote_addr, shutdown).await {
                                tracing::debug!(remote_addr = %remote_addr, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = &mut stop => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);

        let timeout = server.config.shutdown_timeout();
        tracing::info!(
            active = tracker.active_connections(),
            timeout = ?timeout,
            "waiting for open connections"
        );
        if tokio::time::timeout(timeout, tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn resolve_addr(&self) -> Result<SocketAddr, ServerError> {
        let bind_addr = self.config.bind_addr();
        let invalid = |reason: String| ServerError::InvalidAddress {
            addr: self.config.http_addr().to_string(),
            reason,
        };
        let resolved = tokio::net::lookup_host(bind_addr.as_str())
            .await
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("resolved to no address".to_string()));
        resolved
    }

    async fn serve_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let service = service_fn(move |request: http::Request<Incoming>| {
            let server = Arc::clone(&self);
            async move { Ok::<_, Infallible>(server.handle_request(request, remote_addr).await) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(&self, request: http::Request<Incoming>, remote_addr: SocketAddr) -> Response {
        let (parts, body) = request.into_parts();
        let limited = Limited::new(body, self.config.max_body_bytes());

        let body = match tokio::time::timeout(self.config.request_timeout(), limited.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(path = %parts.uri.path(), limit = self.config.max_body_bytes(), "request body too large");
                return plain_error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
            }
            Ok(Err(e)) => {
                tracing::warn!(path = %parts.uri.path(), error = %e, "failed to read request body");
                return plain_error(StatusCode::BAD_REQUEST, "failed to read request body");
            }
            Err(_) => {
                tracing::warn!(path = %parts.uri.path(), "timed out reading request body");
                return plain_error(StatusCode::REQUEST_TIMEOUT, "timed out reading request body");
            }
        };

        let mut request = Request::from_parts(parts, body);
        request.extensions_mut().insert(RemoteAddr(remote_addr));
        self.dispatcher.dispatch(request).await
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("config", &self.config).finish_non_exhaustive()
    }
}

fn plain_error(status: StatusCode, message: &str) -> Response {
    let mut response = http::Response::new(Full::new(Bytes::from(format!("{message}\n"))));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
