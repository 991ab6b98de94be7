//! # Switchboard Test
//!
//! In-memory testing for Switchboard applications. Requests go straight
//! into a frozen [`RouteTable`](switchboard_router::RouteTable) through the
//! same dispatch path the server uses, so routing, middleware and handlers
//! all run, but no socket is bound.
//!
//! ```rust
//! use switchboard_core::handler_fn;
//! use switchboard_router::Router;
//! use switchboard_test::TestClient;
//! use http::StatusCode;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut router = Router::new();
//! router.get("/ping", [handler_fn(|ctx| {
//!     Box::pin(async move { ctx.string(StatusCode::OK, "pong") })
//! })]);
//!
//! let client = TestClient::from_router(router);
//! let response = client.get("/ping").send().await.unwrap();
//! response.assert_status(StatusCode::OK).assert_body_eq("pong");
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/switchboard-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{MultipartForm, TestRequest};
pub use response::TestResponse;
