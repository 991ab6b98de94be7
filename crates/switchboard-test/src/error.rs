//! Test error types.

use thiserror::Error;

/// Errors raised while building a test request or reading its response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The URI, a header, or the method could not be used.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(String),

    /// The response body could not be collected.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The response body is not valid UTF-8.
    #[error("response body is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
