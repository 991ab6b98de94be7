//! # Switchboard Middleware
//!
//! Middleware for Switchboard routes.
//!
//! A middleware is a handler transformer: it takes the next handler and
//! returns a new handler that runs code before and/or after it. A [`Chain`]
//! of middlewares is applied to a route's terminal handler once, at
//! registration time, so nothing is composed per request.
//!
//! ## Ordering
//!
//! The first middleware in a chain is the outermost wrapper. For a chain
//! `[A, B]` around handler `H` the execution order is:
//!
//! ```text
//! A-before → B-before → H → B-after → A-after
//! ```
//!
//! ## Built-ins
//!
//! - [`Logger`] - One access-log event per request
//! - [`Recovery`] - Converts a handler panic into a `500` JSON response
//!
//! ## Example
//!
//! ```
//! use switchboard_core::handler_fn;
//! use switchboard_middleware::{logger, recovery, Chain};
//! use http::StatusCode;
//!
//! let mut chain = Chain::new();
//! chain.push(logger());
//! chain.push(recovery());
//!
//! let handler = chain.then(handler_fn(|ctx| {
//!     Box::pin(async move { ctx.string(StatusCode::OK, "hi") })
//! }));
//! # let _ = handler;
//! ```

#![doc(html_root_url = "https://docs.rs/switchboard-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod logger;
mod middleware;
mod recovery;
#[cfg(test)]
mod test_log;

pub use logger::{logger, Logger, ACCESS_LOG_TARGET};
pub use middleware::{compose, middleware_fn, BoxedMiddleware, Chain, FnMiddleware, Middleware};
pub use recovery::{recovery, Recovery, RECOVERY_BODY};
