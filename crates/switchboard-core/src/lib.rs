//! # Switchboard Core
//!
//! Core types shared by every Switchboard crate:
//!
//! - [`Context`] - Per-request state and response-writing helpers
//! - [`ResponseWriter`] - Buffered response sink owned by the context
//! - [`Handler`] / [`HandlerFunc`] - The handler contract
//! - [`Params`] - Named path parameters (reserved for pattern routing)
//! - [`FileHeader`] - Descriptor of an uploaded multipart file
//! - [`EncodingError`] / [`UploadError`] - Recoverable failures surfaced to handlers

#![doc(html_root_url = "https://docs.rs/switchboard-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod handler;
mod params;
mod response;
mod types;
pub mod upload;

pub use context::Context;
pub use error::{EncodingError, UploadError};
pub use handler::{handler_fn, sequence, BoxFuture, FnHandler, Handler, HandlerFunc};
pub use params::Params;
pub use response::{not_found_response, ResponseWriter};
pub use types::{RemoteAddr, Request, Response};
pub use upload::FileHeader;
