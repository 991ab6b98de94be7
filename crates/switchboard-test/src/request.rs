//! Test request building.

use crate::error::TestError;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use serde::Serialize;
use std::net::SocketAddr;
use switchboard_core::{RemoteAddr, Request};

const MULTIPART_BOUNDARY: &str = "switchboard-test-boundary";

/// A request under construction.
///
/// Builder methods never panic: the first problem (an invalid header, a body
/// that fails to encode) is remembered and reported by [`build`](Self::build).
///
/// ```rust
/// use switchboard_test::TestRequest;
/// use http::Method;
///
/// let request = TestRequest::post("/login?next=/home")
///     .form(&[("user", "ada"), ("pass", "secret")])
///     .build()
///     .unwrap();
///
/// assert_eq!(request.method(), Method::POST);
/// assert_eq!(request.body().as_ref(), b"user=ada&pass=secret");
/// ```
#[must_use]
#[derive(Debug)]
pub struct TestRequest {
    method: Method,
    uri: String,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    error: Option<TestError>,
}

impl TestRequest {
    /// Starts a request with an arbitrary method.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_owned(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            error: None,
        }
    }

    /// Starts a `GET` request.
    pub fn get(uri: impl AsRef<str>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Starts a `POST` request.
    pub fn post(uri: impl AsRef<str>) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    pub fn put(uri: impl AsRef<str>) -> Self {
        Self::new(Method::PUT, uri)
    }

    /// Starts a `PATCH` request.
    pub fn patch(uri: impl AsRef<str>) -> Self {
        Self::new(Method::PATCH, uri)
    }

    /// Starts a `DELETE` request.
    pub fn delete(uri: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// Sets a header, replacing any earlier value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.fail(TestError::InvalidRequest(format!("invalid header `{name}`"))),
        }
        self
    }

    /// Sets `Content-Type`.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the HTTP version reported to handlers.
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Sets the peer address the transport would have recorded.
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Bytes::from(bytes);
                self.content_type("application/json")
            }
            Err(e) => {
                self.fail(TestError::Json(e));
                self
            }
        }
    }

    /// Sets a URL-encoded form body.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => {
                self.body = Bytes::from(encoded);
                self.content_type("application/x-www-form-urlencoded")
            }
            Err(e) => {
                self.fail(TestError::Encode(e.to_string()));
                self
            }
        }
    }

    /// Sets a `multipart/form-data` body.
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = form.encode();
        self.content_type(format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"))
    }

    /// Adds `defaults` for every header not already set.
    pub(crate) fn with_defaults(mut self, defaults: &HeaderMap) -> Self {
        for (name, value) in defaults {
            if !self.headers.contains_key(name) {
                self.headers.insert(name.clone(), value.clone());
            }
        }
        self
    }

    /// Produces the request a [`RouteTable`](switchboard_router::RouteTable) accepts.
    pub fn build(self) -> Result<Request, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::InvalidRequest(format!("invalid URI `{}`: {e}", self.uri)))?;

        let mut builder = http::Request::builder()
            .method(self.method)
            .uri(uri)
            .version(self.version);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
            if !headers.contains_key(HOST) {
                headers.insert(HOST, HeaderValue::from_static("localhost"));
            }
        }

        let mut request = builder
            .body(self.body)
            .map_err(|e| TestError::InvalidRequest(e.to_string()))?;
        if let Some(addr) = self.remote_addr {
            request.extensions_mut().insert(RemoteAddr(addr));
        }
        Ok(request)
    }

    fn fail(&mut self, error: TestError) {
        self.error.get_or_insert(error);
    }
}

/// A `multipart/form-data` body with text fields and files.
#[derive(Debug, Default, Clone)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    file: Option<(String, String)>,
    content: Bytes,
}

impl MultipartForm {
    /// Creates an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file: None,
            content: Bytes::from(value.into()),
        });
        self
    }

    /// Adds a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file: Some((file_name.into(), content_type.into())),
            content: content.into(),
        });
        self
    }

    fn encode(&self) -> Bytes {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
            match &part.file {
                Some((file_name, content_type)) => out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n",
                        part.name
                    )
                    .as_bytes(),
                ),
                None => out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
                ),
            }
            out.extend_from_slice(&part.content);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
        Bytes::from(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_request() {
        let request = TestRequest::get("/users?page=2").build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/users");
        assert_eq!(request.uri().query(), Some("page=2"));
        assert_eq!(request.headers().get(HOST).unwrap(), "localhost");
        assert!(request.extensions().get::<RemoteAddr>().is_none());
    }

    #[test]
    fn test_method_constructors() {
        assert_eq!(TestRequest::post("/").build().unwrap().method(), Method::POST);
        assert_eq!(TestRequest::put("/").build().unwrap().method(), Method::PUT);
        assert_eq!(TestRequest::patch("/").build().unwrap().method(), Method::PATCH);
        assert_eq!(TestRequest::delete("/").build().unwrap().method(), Method::DELETE);
    }

    #[test]
    fn test_json_body() {
        let request = TestRequest::post("/users")
            .json(&json!({"name": "Ada"}))
            .build()
            .unwrap();
        assert_eq!(request.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(request.body().as_ref(), br#"{"name":"Ada"}"#);
    }

    #[test]
    fn test_invalid_header_is_reported_on_build() {
        let err = TestRequest::get("/")
            .header("bad header", "x")
            .header("x-ok", "1")
            .build()
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidRequest(_)), "{err}");
    }

    #[test]
    fn test_invalid_uri() {
        let err = TestRequest::get("http://[::1").build().unwrap_err();
        assert!(matches!(err, TestError::InvalidRequest(_)));
    }

    #[test]
    fn test_remote_addr_and_version() {
        let addr: SocketAddr = "10.0.0.7:5000".parse().unwrap();
        let request = TestRequest::get("/")
            .remote_addr(addr)
            .version(Version::HTTP_10)
            .build()
            .unwrap();
        assert_eq!(request.extensions().get::<RemoteAddr>(), Some(&RemoteAddr(addr)));
        assert_eq!(request.version(), Version::HTTP_10);
    }

    #[test]
    fn test_defaults_do_not_override() {
        let mut defaults = HeaderMap::new();
        defaults.insert("x-team", HeaderValue::from_static("core"));
        defaults.insert("x-trace", HeaderValue::from_static("default"));

        let request = TestRequest::get("/")
            .header("x-trace", "explicit")
            .with_defaults(&defaults)
            .build()
            .unwrap();
        assert_eq!(request.headers().get("x-team").unwrap(), "core");
        assert_eq!(request.headers().get("x-trace").unwrap(), "explicit");
    }

    #[test]
    fn test_multipart_encoding() {
        let request = TestRequest::post("/upload")
            .multipart(
                MultipartForm::new()
                    .text("title", "notes")
                    .file("doc", "a.txt", "text/plain", "hello"),
            )
            .build()
            .unwrap();

        let content_type = request.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));

        let body = std::str::from_utf8(request.body()).unwrap();
        assert!(body.contains("name=\"title\"\r\n\r\nnotes\r\n"));
        assert!(body.contains("filename=\"a.txt\"\r\nContent-Type: text/plain\r\n\r\nhello\r\n"));
        assert!(body.ends_with(&format!("--{MULTIPART_BOUNDARY}--\r\n")));
    }
}
