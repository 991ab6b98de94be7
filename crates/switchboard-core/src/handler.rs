//! Handler contract.
//!
//! A handler is a unit of work that receives the request [`Context`] and
//! produces its effect by writing to the response sink the context owns.
//! Handlers return nothing: completion is signalled by the returned future
//! resolving.
//!
//! # Example
//!
//! ```
//! use switchboard_core::{handler_fn, HandlerFunc};
//! use http::StatusCode;
//!
//! let hello: HandlerFunc = handler_fn(|ctx| {
//!     Box::pin(async move {
//!         ctx.string(StatusCode::OK, "hello");
//!     })
//! });
//! ```

use crate::Context;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed `Send` future borrowing for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The handler trait.
///
/// Implemented by application handlers and by the wrappers middleware
/// produces around them. The future may borrow both the handler and the
/// context for the duration of the call.
pub trait Handler: Send + Sync + 'static {
    /// Runs the handler against the request context.
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()>;
}

/// A shared, type-erased handler.
///
/// Composed chains hold their inner handlers through this type, so one
/// handler may be referenced from several routes.
pub type HandlerFunc = Arc<dyn Handler>;

/// A handler backed by a closure.
///
/// Created through [`handler_fn`].
pub struct FnHandler<F> {
    func: F,
}

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        (self.func)(ctx)
    }
}

/// Lifts a closure into a [`HandlerFunc`].
///
/// The closure returns a boxed future, usually `Box::pin(async move { .. })`.
pub fn handler_fn<F>(func: F) -> HandlerFunc
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    Arc::new(FnHandler { func })
}

/// Runs a flat list of handlers one after another.
struct Sequence {
    handlers: Vec<HandlerFunc>,
}

impl Handler for Sequence {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            for handler in &self.handlers {
                handler.call(ctx).await;
            }
        })
    }
}

/// Builds the terminal handler for a route registered with several handlers.
///
/// Every handler runs in argument order against the same context. None of
/// them receives a `next` callback and nothing stops the sequence early: a
/// handler that wrote a response and wants its siblings skipped has to be
/// the last one registered.
pub fn sequence(handlers: impl IntoIterator<Item = HandlerFunc>) -> HandlerFunc {
    Arc::new(Sequence {
        handlers: handlers.into_iter().collect(),
    })
}
