//! # Switchboard Telemetry
//!
//! Installs the global `tracing` subscriber for a Switchboard service.
//!
//! Every Switchboard crate logs through `tracing`; nothing is printed until a
//! subscriber is installed. [`init_logging`] installs a `tracing-subscriber`
//! formatter, JSON for production or human-readable for development, behind
//! an `EnvFilter`. `RUST_LOG`, when set, takes precedence over the configured
//! level.
//!
//! ```rust,no_run
//! use switchboard_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).expect("logging");
//! tracing::info!("ready");
//! ```

#![doc(html_root_url = "https://docs.rs/switchboard-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{create_env_filter, init_logging, LogConfig};
