//! Middleware contract and chain composition.
//!
//! Unlike a per-request pipeline, composition here happens once: each
//! middleware's [`wrap`](Middleware::wrap) is called with the handler it
//! guards and returns the handler that replaces it. The resulting handler is
//! what a route stores.

use std::fmt;
use std::sync::Arc;
use switchboard_core::HandlerFunc;

/// The core middleware trait.
///
/// # Example
///
/// ```
/// use switchboard_core::{BoxFuture, Context, Handler, HandlerFunc};
/// use switchboard_middleware::Middleware;
/// use http::{HeaderName, HeaderValue};
/// use std::sync::Arc;
///
/// struct PoweredBy;
///
/// struct PoweredByHandler {
///     next: HandlerFunc,
/// }
///
/// impl Handler for PoweredByHandler {
///     fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
///         Box::pin(async move {
///             ctx.set_header(
///                 HeaderName::from_static("x-powered-by"),
///                 HeaderValue::from_static("switchboard"),
///             );
///             self.next.call(ctx).await;
///         })
///     }
/// }
///
/// impl Middleware for PoweredBy {
///     fn name(&self) -> &'static str {
///         "powered-by"
///     }
///
///     fn wrap(&self, next: HandlerFunc) -> HandlerFunc {
///         Arc::new(PoweredByHandler { next })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str;

    /// Wraps `next`, returning the handler that runs in its place.
    ///
    /// The returned handler decides whether and when `next` runs. Calling it
    /// zero times short-circuits the route.
    fn wrap(&self, next: HandlerFunc) -> HandlerFunc;
}

/// A shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A middleware backed by a closure.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn wrap(&self, next: HandlerFunc) -> HandlerFunc {
        (self.func)(next)
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").field("name", &self.name).finish()
    }
}

/// Lifts a handler transformer into a [`BoxedMiddleware`].
///
/// # Example
///
/// ```
/// use switchboard_core::handler_fn;
/// use switchboard_middleware::middleware_fn;
/// use http::StatusCode;
/// use std::sync::Arc;
///
/// let teapot = middleware_fn("teapot", |next| {
///     handler_fn(move |ctx| {
///         let next = Arc::clone(&next);
///         Box::pin(async move {
///             next.call(ctx).await;
///             if !ctx.writer().is_written() {
///                 ctx.string(StatusCode::IM_A_TEAPOT, "short and stout");
///             }
///         })
///     })
/// });
/// assert_eq!(teapot.name(), "teapot");
/// ```
pub fn middleware_fn<F>(name: &'static str, func: F) -> BoxedMiddleware
where
    F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
{
    Arc::new(FnMiddleware::new(name, func))
}

/// Wraps `handler` in `middlewares`, first element outermost.
pub fn compose(middlewares: &[BoxedMiddleware], handler: HandlerFunc) -> HandlerFunc {
    middlewares
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware.wrap(next))
}

/// An ordered list of middlewares.
#[derive(Clone, Default)]
pub struct Chain {
    middlewares: Vec<BoxedMiddleware>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware; it runs inside every middleware already present.
    pub fn push(&mut self, middleware: BoxedMiddleware) {
        self.middlewares.push(middleware);
    }

    /// Appends every middleware of `other`, keeping their order.
    pub fn extend(&mut self, other: &Self) {
        self.middlewares.extend(other.middlewares.iter().cloned());
    }

    /// Returns the number of middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if the chain has no middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Returns the middleware names, outermost first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Returns the middlewares, outermost first.
    #[must_use]
    pub fn as_slice(&self) -> &[BoxedMiddleware] {
        &self.middlewares
    }

    /// Composes the chain around `handler`.
    #[must_use]
    pub fn then(&self, handler: HandlerFunc) -> HandlerFunc {
        compose(&self.middlewares, handler)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FromIterator<BoxedMiddleware> for Chain {
    fn from_iter<I: IntoIterator<Item = BoxedMiddleware>>(iter: I) -> Self {
        Self {
            middlewares: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use std::sync::Mutex;
    use switchboard_core::{handler_fn, Context};

    type Log = Arc<Mutex<Vec<String>>>;

    fn context() -> Context {
        Context::new(http::Request::builder().uri("/").body(Bytes::new()).unwrap())
    }

    fn tracing_middleware(log: &Log, label: &'static str) -> BoxedMiddleware {
        let log = Arc::clone(log);
        middleware_fn(label, move |next| {
            let log = Arc::clone(&log);
            handler_fn(move |ctx| {
                let log = Arc::clone(&log);
                let next = Arc::clone(&next);
                Box::pin(async move {
                    log.lock().unwrap().push(format!("{label}-before"));
                    next.call(ctx).await;
                    log.lock().unwrap().push(format!("{label}-after"));
                })
            })
        })
    }

    fn terminal(log: &Log) -> HandlerFunc {
        let log = Arc::clone(log);
        handler_fn(move |ctx| {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().unwrap().push("H".to_string());
                ctx.string(StatusCode::OK, "done");
            })
        })
    }

    #[tokio::test]
    async fn test_first_middleware_is_outermost() {
        let log = Log::default();
        let chain: Chain = [tracing_middleware(&log, "A"), tracing_middleware(&log, "B")]
            .into_iter()
            .collect();

        let handler = chain.then(terminal(&log));
        handler.call(&mut context()).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["A-before", "B-before", "H", "B-after", "A-after"]
        );
    }

    #[tokio::test]
    async fn test_empty_chain_is_identity() {
        let log = Log::default();
        let handler = Chain::new().then(terminal(&log));

        let mut ctx = context();
        handler.call(&mut ctx).await;

        assert_eq!(*log.lock().unwrap(), vec!["H"]);
        assert_eq!(ctx.writer().body(), b"done");
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let log = Log::default();
        let deny = middleware_fn("deny", |_next| {
            handler_fn(|ctx| {
                Box::pin(async move {
                    ctx.abort(StatusCode::FORBIDDEN, "forbidden");
                })
            })
        });

        let handler = compose(&[deny], terminal(&log));
        let mut ctx = context();
        handler.call(&mut ctx).await;

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(ctx.response_status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_chain_names_and_extend() {
        let log = Log::default();
        let mut outer = Chain::new();
        outer.push(tracing_middleware(&log, "logger"));

        let mut inner = Chain::new();
        inner.push(tracing_middleware(&log, "auth"));
        inner.push(tracing_middleware(&log, "recovery"));

        outer.extend(&inner);

        assert_eq!(outer.len(), 3);
        assert_eq!(outer.names(), vec!["logger", "auth", "recovery"]);
        assert_eq!(inner.len(), 2);
        assert_eq!(format!("{outer:?}"), r#"["logger", "auth", "recovery"]"#);
    }

    #[tokio::test]
    async fn test_wrap_happens_once_per_compose() {
        let wraps = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&wraps);
        let counting = middleware_fn("counting", move |next| {
            *counter.lock().unwrap() += 1;
            next
        });

        let handler = compose(&[counting], terminal(&Log::default()));
        for _ in 0..3 {
            handler.call(&mut context()).await;
        }

        assert_eq!(*wraps.lock().unwrap(), 1);
    }
}
