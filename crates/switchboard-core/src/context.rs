//! Per-request context.
//!
//! A [`Context`] is created by the dispatcher for every matched request,
//! handed by mutable reference through the composed middleware chain, and
//! turned into the transport response once the chain returns. It is never
//! pooled or shared between requests.

use crate::error::{EncodingError, UploadError};
use crate::params::Params;
use crate::response::ResponseWriter;
use crate::types::{RemoteAddr, Request, Response};
use crate::upload::{self, FileHeader, DEFAULT_MAX_MULTIPART_BYTES};
use http::header::{AsHeaderName, CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderName, HeaderValue, Method, StatusCode, Version};
use serde::Serialize;
use std::fmt::Display;
use std::net::SocketAddr;

const APPLICATION_JSON: &str = "application/json";
const TEXT_HTML: &str = "text/html";
const TEXT_PLAIN: &str = "text/plain";
const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
const TEXT_HTML_UTF8: &str = "text/html; charset=utf-8";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Per-request state and response-writing helpers.
///
/// # Example
///
/// ```
/// use switchboard_core::Context;
/// use bytes::Bytes;
/// use http::StatusCode;
///
/// let request = http::Request::builder()
///     .uri("/greet?name=ada")
///     .body(Bytes::new())
///     .unwrap();
/// let mut ctx = Context::new(request);
///
/// let name = ctx.query("name").unwrap_or_default();
/// ctx.string(StatusCode::OK, format_args!("hello {name}"));
///
/// assert_eq!(ctx.writer().body(), b"hello ada");
/// ```
#[derive(Debug)]
pub struct Context {
    writer: ResponseWriter,
    request: Request,
    params: Params,
    status: Option<StatusCode>,
    aborted: bool,
}

impl Context {
    /// Creates a context for `request` with an empty response.
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self {
            writer: ResponseWriter::new(),
            request,
            params: Params::new(),
            status: None,
            aborted: false,
        }
    }

    /// Returns the inbound request.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// Returns the HTTP version of the request.
    #[must_use]
    pub fn protocol(&self) -> Version {
        self.request.version()
    }

    /// Returns the peer address, when the transport recorded one.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.request.extensions().get::<RemoteAddr>().map(|addr| addr.0)
    }

    /// Returns a request header as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the response sink.
    #[must_use]
    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    /// Returns the response sink for direct writes.
    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Records `status` and writes it to the response sink.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
        self.writer.write_status(status);
    }

    /// Returns the last status recorded through [`set_status`](Self::set_status).
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the status the client will receive.
    ///
    /// Reads the sink rather than the recorded status, so writes made through
    /// [`writer_mut`](Self::writer_mut) are reflected too.
    #[must_use]
    pub fn response_status(&self) -> StatusCode {
        self.writer.written_status().unwrap_or(StatusCode::OK)
    }

    /// Sets a response header.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.writer.set_header(name, value);
    }

    /// Writes `value` as a JSON response.
    ///
    /// The value is serialized before anything is written; if that fails the
    /// error is logged and a `500` plain-text response is written instead.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        match serde_json::to_vec(value).map_err(EncodingError::from) {
            Ok(body) => {
                self.set_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
                self.set_status(status);
                self.writer.write(&body);
            }
            Err(err) => {
                tracing::error!(path = %self.path(), error = %err, "JSON response encoding failed");
                self.error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
            }
        }
    }

    /// Writes an HTML response.
    pub fn html(&mut self, status: StatusCode, html: impl AsRef<str>) {
        self.set_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
        self.set_status(status);
        self.writer.write(html.as_ref().as_bytes());
    }

    /// Writes a plain-text response.
    ///
    /// Accepts anything displayable, including `format_args!`.
    pub fn string(&mut self, status: StatusCode, text: impl Display) {
        self.set_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        self.set_status(status);
        self.writer.write(text.to_string().as_bytes());
    }

    /// Redirects the client to `location` with the given status.
    ///
    /// Relative targets resolve against the request path. `GET` and `HEAD`
    /// requests get an HTML content type, and `GET` a short anchor body.
    pub fn redirect(&mut self, status: StatusCode, location: &str) {
        let target = resolve_location(self.path(), location);
        match HeaderValue::try_from(target.as_str()) {
            Ok(value) => self.set_header(LOCATION, value),
            Err(_) => tracing::warn!(location = %target, "redirect target is not a valid header value"),
        }

        let has_content_type = self.writer.headers().contains_key(CONTENT_TYPE);
        let method = self.method().clone();
        if !has_content_type && (method == Method::GET || method == Method::HEAD) {
            self.set_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML_UTF8));
        }
        self.set_status(status);

        if !has_content_type && method == Method::GET {
            let body = format!(
                "<a href=\"{}\">{}</a>.\n",
                html_escape(&target),
                status.canonical_reason().unwrap_or_default()
            );
            self.writer.write(body.as_bytes());
        }
    }

    /// Returns the first value of `key` in the URL query string.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.request.uri().query()?;
        first_value(query.as_bytes(), key)
    }

    /// Returns the first form value for `key`.
    ///
    /// For `POST`, `PUT` and `PATCH` requests the body is searched first:
    /// URL-encoded pairs, or the non-file parts of a `multipart/form-data`
    /// body. The query string is the fallback. A malformed multipart body is
    /// logged and treated as carrying no values.
    pub async fn post_form(&self, key: &str) -> Option<String> {
        let method = self.method();
        let carries_form = *method == Method::POST || *method == Method::PUT || *method == Method::PATCH;

        if carries_form {
            let media_type = self
                .header(CONTENT_TYPE)
                .and_then(|ct| ct.split(';').next())
                .map(str::trim);

            let from_body = match media_type {
                Some(FORM_URLENCODED) => first_value(self.request.body(), key),
                Some(MULTIPART_FORM_DATA) => self.multipart_value(key).await,
                _ => None,
            };
            if from_body.is_some() {
                return from_body;
            }
        }
        self.query(key)
    }

    /// Returns the named path parameter.
    ///
    /// Always `None` under exact-match routing unless a middleware set it.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    /// Binds a path parameter.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.set(key, value);
    }

    /// Returns all bound path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Looks up the uploaded file in multipart field `key`.
    pub async fn form_file(&self, key: &str) -> Result<FileHeader, UploadError> {
        upload::find_file(
            self.request.headers(),
            self.request.body().clone(),
            key,
            DEFAULT_MAX_MULTIPART_BYTES,
        )
        .await
    }

    /// Writes `status` and a literal message body and marks the context aborted.
    ///
    /// This does not unwind: the caller must return from its handler, and
    /// sibling handlers registered on the same route still run.
    pub fn abort(&mut self, status: StatusCode, message: impl AsRef<str>) {
        self.aborted = true;
        self.set_status(status);
        self.writer.write(message.as_ref().as_bytes());
    }

    /// Returns `true` once [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Consumes the context, producing the transport response.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.writer.into_response()
    }

    async fn multipart_value(&self, key: &str) -> Option<String> {
        let found = upload::find_value(
            self.request.headers(),
            self.request.body().clone(),
            key,
            DEFAULT_MAX_MULTIPART_BYTES,
        )
        .await;
        match found {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(path = %self.path(), error = %err, "multipart form not readable");
                None
            }
        }
    }

    fn error(&mut self, status: StatusCode, message: &str) {
        self.set_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8));
        self.set_header(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        self.set_status(status);
        self.writer.write(message.as_bytes());
        self.writer.write(b"\n");
    }
}

fn first_value(encoded: &[u8], key: &str) -> Option<String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(encoded)
        .ok()?
        .into_iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
}

/// Resolves a redirect target against the current request path.
fn resolve_location(current: &str, location: &str) -> String {
    if location.contains("://") || location.starts_with("//") {
        return location.to_owned();
    }

    let (path, query) = match location.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (location, None),
    };

    let joined = if path.is_empty() {
        current.to_owned()
    } else if path.starts_with('/') {
        path.to_owned()
    } else {
        let dir = current.rfind('/').map_or("/", |idx| &current[..=idx]);
        format!("{dir}{path}")
    };

    let mut resolved = clean_path(&joined);
    if let Some(query) = query {
        resolved.push('?');
        resolved.push_str(query);
    }
    resolved
}

/// Collapses `.` and `..` segments and duplicate slashes, keeping a trailing slash.
fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut cleaned = format!("/{}", segments.join("/"));
    let wants_trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    if wants_trailing && !cleaned.ends_with('/') {
        cleaned.push('/');
    }
    cleaned
}

fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
