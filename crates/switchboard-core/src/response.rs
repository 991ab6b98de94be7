//! Buffered response sink.
//!
//! [`ResponseWriter`] follows the write discipline of a streaming HTTP
//! response even though it buffers: the status is written once, headers are
//! frozen when it is, and body bytes written before any status imply
//! `200 OK`. Unlike a socket-backed writer it can report what was written,
//! which is how middleware observes the status a handler produced.

use crate::types::Response;
use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;

/// Body of the response produced for unmatched routes.
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Response sink owned by a request [`Context`](crate::Context).
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the headers set so far.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a response header, replacing any previous value.
    ///
    /// Ignored once the status has been written.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.status.is_some() {
            tracing::debug!(header = %name, "header set after status was written, ignoring");
            return;
        }
        self.headers.insert(name, value);
    }

    /// Writes the status line.
    ///
    /// Only the first call takes effect.
    pub fn write_status(&mut self, status: StatusCode) {
        if let Some(current) = self.status {
            tracing::warn!(
                current = current.as_u16(),
                attempted = status.as_u16(),
                "superfluous status write ignored"
            );
            return;
        }
        self.status = Some(status);
    }

    /// Appends bytes to the body, writing `200 OK` first if no status was written.
    ///
    /// Returns the number of bytes written.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
        bytes.len()
    }

    /// Returns the status written so far, if any.
    #[must_use]
    pub fn written_status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns `true` once a status (explicit or implied) has been written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.status.is_some()
    }

    /// Returns the body written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Discards the status, headers and body written so far.
    pub fn reset(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body.clear();
    }

    /// Converts the buffered output into a transport response.
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

/// The fixed response for requests that match no route.
pub fn not_found_response() -> Response {
    let mut response = http::Response::new(Full::new(Bytes::from_static(NOT_FOUND_BODY.as_bytes())));
    *response.status_mut() = StatusCode::NOT_FOUND;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
