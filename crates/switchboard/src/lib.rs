//! # Switchboard
//!
//! A small HTTP router built around exact `(method, path)` matching,
//! middleware composed once at registration time, and route groups that
//! share a prefix and a middleware list.
//!
//! This crate re-exports the pieces:
//!
//! - [`core`] - [`Context`](core::Context), the handler contract, response sink
//! - [`middleware`] - The middleware trait, [`Chain`](middleware::Chain), `Logger`, `Recovery`
//! - [`router`] - [`Router`](router::Router), [`RouteGroup`](router::RouteGroup), [`RouteTable`](router::RouteTable)
//! - [`server`] - The hyper transport, its config and graceful shutdown
//! - [`telemetry`] - `tracing` subscriber setup
//!
//! ## Example
//!
//! ```rust,no_run
//! use switchboard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ServerError> {
//!     let mut router = Router::new();
//!     router.use_middleware(logger()).use_middleware(recovery());
//!
//!     router.group("/a").get("/b", [handler_fn(|ctx| {
//!         Box::pin(async move { ctx.json(StatusCode::OK, "okok") })
//!     })]);
//!
//!     router.start(":8080").await
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/switchboard/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use http;
pub use switchboard_core as core;
pub use switchboard_middleware as middleware;
pub use switchboard_router as router;
pub use switchboard_server as server;
pub use switchboard_telemetry as telemetry;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use http::{Method, StatusCode};
    pub use switchboard_core::{
        handler_fn, sequence, BoxFuture, Context, EncodingError, FileHeader, Handler, HandlerFunc,
        UploadError,
    };
    pub use switchboard_middleware::{
        logger, middleware_fn, recovery, BoxedMiddleware, Chain, Logger, Middleware, Recovery,
    };
    pub use switchboard_router::{RouteGroup, RouteKey, RouteTable, Router};
    pub use switchboard_server::{ServerConfig, ServerError, ShutdownSignal};
    pub use switchboard_telemetry::{init_logging, LogConfig};
}
