//! Recoverable errors surfaced to handlers.

use thiserror::Error;

/// A structured response payload could not be serialized.
///
/// [`Context::json`](crate::Context::json) logs this and substitutes a
/// `500 Internal Server Error` response.
#[derive(Debug, Error)]
#[error("failed to encode response body: {0}")]
pub struct EncodingError(#[from] serde_json::Error);

/// A requested upload could not be read from the request body.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request is not `multipart/form-data` or has no boundary.
    #[error("request Content-Type isn't multipart/form-data")]
    NotMultipart,

    /// No file part with the requested field name exists.
    #[error("no such file: {0}")]
    MissingFile(String),

    /// The multipart body could not be parsed.
    #[error("malformed multipart body: {0}")]
    Malformed(String),
}

impl UploadError {
    /// Returns `true` if the field was simply absent.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingFile(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_display() {
        let err = UploadError::MissingFile("avatar".to_string());
        assert_eq!(err.to_string(), "no such file: avatar");
        assert!(err.is_missing());

        assert!(!UploadError::NotMultipart.is_missing());
    }

    #[test]
    fn test_encoding_error_from_serde() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err = EncodingError::from(source);
        assert!(err.to_string().starts_with("failed to encode response body"));
    }
}
