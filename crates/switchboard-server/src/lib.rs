//! # Switchboard Server
//!
//! HTTP transport for Switchboard.
//!
//! - HTTP/1.1 via Hyper on a Tokio TCP listener, one task per connection
//! - Request bodies buffered up front, bounded by size and time
//! - Graceful shutdown on SIGTERM/SIGINT or a programmatic [`ShutdownSignal`]
//! - [`ServerConfig`] built in code or loaded from TOML
//!
//! Routing is not part of this crate. The server hands every request to a
//! [`Dispatch`] implementation; `switchboard-router` provides one.

#![doc(html_root_url = "https://docs.rs/switchboard-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
mod server;
pub mod shutdown;

pub use config::{ConfigError, ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use server::{Dispatch, Server};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
