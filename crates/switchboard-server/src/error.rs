//! Transport errors.

use thiserror::Error;

/// Errors that stop the server.
///
/// Per-connection failures are logged and never surface here.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The bind address did not resolve to a socket address.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// Address as configured.
        addr: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was tried.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O error outside of binding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
