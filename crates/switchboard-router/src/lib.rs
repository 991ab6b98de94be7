//! # Switchboard Router
//!
//! Exact-match routing for Switchboard.
//!
//! Routing happens in two phases:
//!
//! 1. **Registration.** A [`Router`] collects global middleware and routes,
//!    directly or through prefixed [`RouteGroup`]s. Every route is composed
//!    with its middleware as it is registered.
//! 2. **Serving.** [`Router::freeze`] yields a [`RouteTable`], an immutable
//!    shared map from [`RouteKey`] to composed handler that implements the
//!    server's `Dispatch` trait.
//!
//! A request matches only a route registered under its exact method and
//! path. Unmatched requests get a plain `404` without running any
//! middleware.
//!
//! ## Example
//!
//! ```rust
//! use switchboard_core::handler_fn;
//! use switchboard_middleware::{logger, recovery};
//! use switchboard_router::Router;
//! use http::{Method, StatusCode};
//!
//! let mut router = Router::new();
//! router.use_middleware(logger()).use_middleware(recovery());
//!
//! router.group("/a").get("/b", [handler_fn(|ctx| {
//!     Box::pin(async move { ctx.json(StatusCode::OK, "okok") })
//! })]);
//!
//! let table = router.freeze();
//! assert!(table.contains(&Method::GET, "/a/b"));
//! assert!(!table.contains(&Method::POST, "/a/b"));
//! ```

#![doc(html_root_url = "https://docs.rs/switchboard-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod group;
mod key;
mod router;
mod table;

pub use group::RouteGroup;
pub use key::RouteKey;
pub use router::Router;
pub use table::RouteTable;
