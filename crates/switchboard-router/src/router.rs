//! The registration-phase router.

use crate::group::RouteGroup;
use crate::key::RouteKey;
use crate::table::RouteTable;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use switchboard_core::{sequence, HandlerFunc};
use switchboard_middleware::{BoxedMiddleware, Chain};
use switchboard_server::{Server, ServerConfig, ServerError, ShutdownSignal};

/// Collects routes and global middleware.
///
/// Handlers are composed with their middleware when they are registered,
/// so the order of calls matters: [`use_middleware`](Self::use_middleware)
/// affects only routes registered after it. When registration is done,
/// [`freeze`](Self::freeze) turns the router into a [`RouteTable`], or one
/// of the `start`/`serve` methods does that and runs the server.
///
/// ```rust
/// use switchboard_core::handler_fn;
/// use switchboard_middleware::{logger, recovery};
/// use switchboard_router::Router;
/// use http::{Method, StatusCode};
///
/// let mut router = Router::new();
/// router.use_middleware(logger()).use_middleware(recovery());
/// router.get("/ping", [handler_fn(|ctx| {
///     Box::pin(async move { ctx.string(StatusCode::OK, "pong") })
/// })]);
///
/// let table = router.freeze();
/// assert!(table.contains(&Method::GET, "/ping"));
/// ```
#[derive(Default)]
pub struct Router {
    middlewares: Chain,
    routes: HashMap<RouteKey, HandlerFunc>,
}

impl Router {
    /// Creates a router with no routes and no middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a global middleware.
    ///
    /// Global middleware wraps every route registered after this call,
    /// outside any group middleware. Routes already registered keep the
    /// chain they were composed with.
    pub fn use_middleware(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Appends several global middlewares, keeping their order.
    pub fn use_middlewares(&mut self, middlewares: impl IntoIterator<Item = BoxedMiddleware>) -> &mut Self {
        for middleware in middlewares {
            self.middlewares.push(middleware);
        }
        self
    }

    /// Names of the global middleware, outermost first.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middlewares.names()
    }

    /// Derives a group with `prefix` and no local middleware.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup::new(self, prefix.to_owned(), Chain::new())
    }

    /// Stores `handler` under `(method, path)` wrapped only in the global middleware.
    pub fn add_route(&mut self, method: Method, path: &str, handler: HandlerFunc) -> &mut Self {
        let composed = self.middlewares.then(handler);
        let names = self.middlewares.names();
        self.insert(RouteKey::new(method, path), composed, &names);
        self
    }

    /// Registers a route on the root group.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoIterator<Item = HandlerFunc>,
    ) -> &mut Self {
        self.register(method, path.to_owned(), handlers.into_iter().collect(), &Chain::new());
        self
    }

    /// Registers a `GET` route on the root group.
    pub fn get(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::GET, path, handlers)
    }

    /// Registers a `POST` route on the root group.
    pub fn post(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::POST, path, handlers)
    }

    /// Registers a `PUT` route on the root group.
    pub fn put(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::PUT, path, handlers)
    }

    /// Registers a `PATCH` route on the root group.
    pub fn patch(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::PATCH, path, handlers)
    }

    /// Registers a `DELETE` route on the root group.
    pub fn delete(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::DELETE, path, handlers)
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if `(method, path)` is registered.
    #[must_use]
    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        self.routes.contains_key(&RouteKey::new(method.clone(), path))
    }

    /// Ends the registration phase.
    #[must_use]
    pub fn freeze(self) -> RouteTable {
        tracing::debug!(routes = self.routes.len(), "route table frozen");
        RouteTable::new(self.routes)
    }

    /// Serves on `addr` until SIGTERM or SIGINT.
    ///
    /// `addr` may omit the host (`":8080"`) to listen on every interface.
    /// Fails only if the address is invalid or cannot be bound.
    pub async fn start(self, addr: &str) -> Result<(), ServerError> {
        self.serve(ServerConfig::builder().http_addr(addr).build()).await
    }

    /// Serves with `config` until SIGTERM or SIGINT.
    pub async fn serve(self, config: ServerConfig) -> Result<(), ServerError> {
        Server::new(config, self.freeze()).run().await
    }

    /// Serves with `config` until `shutdown` fires.
    pub async fn serve_with_shutdown(self, config: ServerConfig, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        Server::new(config, self.freeze()).run_with_shutdown(shutdown).await
    }

    pub(crate) fn register(&mut self, method: Method, path: String, handlers: Vec<HandlerFunc>, local: &Chain) {
        let mut effective = self.middlewares.clone();
        effective.extend(local);

        let composed = effective.then(sequence(handlers));
        self.insert(RouteKey::new(method, path), composed, &effective.names());
    }

    fn insert(&mut self, key: RouteKey, handler: HandlerFunc, middlewares: &[&'static str]) {
        tracing::debug!(
            method = %key.method(),
            path = %key.path(),
            middlewares = ?middlewares,
            "route registered"
        );
        if self.routes.insert(key.clone(), handler).is_some() {
            tracing::warn!(route = %key, "route registered twice, previous handler replaced");
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<String> = self.routes.keys().map(ToString::to_string).collect();
        routes.sort();
        f.debug_struct("Router")
            .field("middlewares", &self.middlewares)
            .field("routes", &routes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use std::sync::{Arc, Mutex};
    use switchboard_core::{handler_fn, Request};
    use switchboard_middleware::middleware_fn;

    type Log = Arc<Mutex<Vec<String>>>;

    fn tag(log: &Log, label: &'static str) -> BoxedMiddleware {
        let log = Arc::clone(log);
        middleware_fn(label, move |next| {
            let log = Arc::clone(&log);
            handler_fn(move |ctx| {
                let log = Arc::clone(&log);
                let next = Arc::clone(&next);
                Box::pin(async move {
                    log.lock().unwrap().push(label.to_string());
                    next.call(ctx).await;
                })
            })
        })
    }

    fn text(body: &'static str) -> HandlerFunc {
        handler_fn(move |ctx| Box::pin(async move { ctx.string(StatusCode::OK, body) }))
    }

    fn request(method: Method, path: &str) -> Request {
        http::Request::builder().method(method).uri(path).body(Bytes::new()).unwrap()
    }

    async fn body(table: &RouteTable, method: Method, path: &str) -> (StatusCode, Bytes) {
        let response = table.serve(request(method, path)).await;
        let status = response.status();
        (status, response.into_body().collect().await.unwrap().to_bytes())
    }

    #[tokio::test]
    async fn test_reregistration_overwrites() {
        let mut router = Router::new();
        router.get("/dup", [text("first")]);
        router.get("/dup", [text("second")]);
        assert_eq!(router.route_count(), 1);

        let table = router.freeze();
        let (_, bytes) = body(&table, Method::GET, "/dup").await;
        assert_eq!(bytes, Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_global_middleware_is_not_retroactive() {
        let log = Log::default();
        let mut router = Router::new();
        router.get("/before", [text("before")]);
        router.use_middleware(tag(&log, "late"));
        router.get("/after", [text("after")]);

        let table = router.freeze();
        body(&table, Method::GET, "/before").await;
        assert!(log.lock().unwrap().is_empty());

        body(&table, Method::GET, "/after").await;
        assert_eq!(*log.lock().unwrap(), vec!["late"]);
    }

    #[tokio::test]
    async fn test_add_route_uses_global_middleware_only() {
        let log = Log::default();
        let mut router = Router::new();
        router.use_middleware(tag(&log, "global"));
        router.add_route(Method::GET, "/raw", text("raw"));

        let table = router.freeze();
        let (status, bytes) = body(&table, Method::GET, "/raw").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, Bytes::from_static(b"raw"));
        assert_eq!(*log.lock().unwrap(), vec!["global"]);
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let mut router = Router::new();
        router.post(
            "/multi",
            [
                handler_fn(|ctx| Box::pin(async move { ctx.set_param("step", "one") })),
                handler_fn(|ctx| {
                    Box::pin(async move {
                        let step = ctx.param("step").unwrap_or("none").to_owned();
                        ctx.string(StatusCode::CREATED, step);
                    })
                }),
            ],
        );

        let table = router.freeze();
        let (status, bytes) = body(&table, Method::POST, "/multi").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(bytes, Bytes::from_static(b"one"));
    }

    #[test]
    fn test_middleware_names_and_debug() {
        let log = Log::default();
        let mut router = Router::new();
        router.use_middlewares([tag(&log, "a"), tag(&log, "b")]);
        router.get("/z", [text("z")]).delete("/a", [text("a")]);

        assert_eq!(router.middleware_names(), vec!["a", "b"]);
        assert_eq!(
            format!("{router:?}"),
            r#"Router { middlewares: ["a", "b"], routes: ["DELETE /a", "GET /z"] }"#
        );
    }

    #[tokio::test]
    async fn test_start_reports_invalid_address() {
        let err = Router::new().start("no-port-here").await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { .. }), "{err}");
    }
}
