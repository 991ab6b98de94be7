//! HTTP types exchanged with the transport.

use bytes::Bytes;
use http_body_util::Full;
use std::net::SocketAddr;

/// The inbound request as seen by the dispatcher.
///
/// The transport collects the body before dispatch, so handlers can read
/// form and multipart data without touching the connection.
pub type Request = http::Request<Bytes>;

/// The outbound response handed back to the transport.
pub type Response = http::Response<Full<Bytes>>;

/// Peer address of the connection a request arrived on.
///
/// Inserted into the request extensions by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteAddr(pub SocketAddr);
