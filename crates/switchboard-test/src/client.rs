//! In-memory test client.

use crate::error::TestError;
use crate::request::{MultipartForm, TestRequest};
use crate::response::TestResponse;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::net::{Ipv4Addr, SocketAddr};
use switchboard_router::{RouteTable, Router};

/// Peer address given to requests that do not set one.
const DEFAULT_PEER: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 40000);

/// Sends requests into a [`RouteTable`] without a network.
///
/// Every request gets a loopback peer address unless it sets its own, so
/// handlers and the access logger see the same extensions the server
/// would insert.
#[derive(Debug, Clone)]
pub struct TestClient {
    table: RouteTable,
    default_headers: HeaderMap,
}

impl TestClient {
    /// Wraps a frozen table.
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            default_headers: HeaderMap::new(),
        }
    }

    /// Freezes `router` and wraps the result.
    pub fn from_router(router: Router) -> Self {
        Self::new(router.freeze())
    }

    /// Adds a header sent with every request unless the request overrides it.
    ///
    /// Invalid names or values are ignored.
    #[must_use]
    pub fn with_default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.default_headers.insert(name, value);
        }
        self
    }

    /// Returns the table requests are dispatched to.
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Starts a `GET` request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a `POST` request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a `PATCH` request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a `DELETE` request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest {
            client: self,
            request: TestRequest::new(method, uri).remote_addr(DEFAULT_PEER),
        }
    }

    /// Dispatches a prepared request.
    pub async fn send(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let request = request.with_defaults(&self.default_headers).build()?;
        TestResponse::from_response(self.table.serve(request).await).await
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    request: TestRequest,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.request = self.request.header(name, value);
        self
    }

    /// Sets `Content-Type`.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.request = self.request.content_type(content_type);
        self
    }

    /// Overrides the peer address.
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.request = self.request.remote_addr(addr);
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.request = self.request.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.request = self.request.json(value);
        self
    }

    /// Sets a URL-encoded form body.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.request = self.request.form(value);
        self
    }

    /// Sets a multipart body.
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.request = self.request.multipart(form);
        self
    }

    /// Dispatches the request and collects the response.
    pub async fn send(self) -> Result<TestResponse, TestError> {
        self.client.send(self.request).await
    }
}
