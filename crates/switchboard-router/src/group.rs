//! Route groups.

use crate::router::Router;
use http::Method;
use switchboard_core::HandlerFunc;
use switchboard_middleware::{BoxedMiddleware, Chain};

/// A path prefix plus local middleware, registering into a [`Router`].
///
/// A group borrows its router mutably, so it lives only for the
/// registration phase. Routes registered through it are wrapped in the
/// router's global middleware (outermost) followed by the group's own.
///
/// Groups derived with [`group`](Self::group) concatenate prefixes and start
/// with a copy of their parent's middleware, so middleware accumulates down
/// the nesting chain. Middleware added to a parent after a child was derived
/// does not reach the child.
///
/// ```rust
/// use switchboard_core::handler_fn;
/// use switchboard_middleware::recovery;
/// use switchboard_router::Router;
/// use http::{Method, StatusCode};
///
/// let mut router = Router::new();
/// {
///     let mut api = router.group("/api");
///     api.use_middleware(recovery());
///     api.get("/health", [handler_fn(|ctx| {
///         Box::pin(async move { ctx.string(StatusCode::OK, "ok") })
///     })]);
/// }
///
/// assert!(router.has_route(&Method::GET, "/api/health"));
/// ```
pub struct RouteGroup<'r> {
    router: &'r mut Router,
    prefix: String,
    middlewares: Chain,
}

impl<'r> RouteGroup<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: String, middlewares: Chain) -> Self {
        Self {
            router,
            prefix,
            middlewares,
        }
    }

    /// The group's full prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Names of the group's local middleware, outermost first.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middlewares.names()
    }

    /// Appends a middleware for routes registered on this group from now on.
    pub fn use_middleware(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Appends several middlewares, keeping their order.
    pub fn use_middlewares(&mut self, middlewares: impl IntoIterator<Item = BoxedMiddleware>) -> &mut Self {
        for middleware in middlewares {
            self.middlewares.push(middleware);
        }
        self
    }

    /// Derives a child group. The prefix is appended verbatim.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup::new(
            self.router,
            format!("{}{prefix}", self.prefix),
            self.middlewares.clone(),
        )
    }

    /// Registers `handlers` for `method` at the group prefix followed by `path`.
    ///
    /// The handlers run in order inside one context. Registering the same
    /// method and full path again replaces the earlier route.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handlers: impl IntoIterator<Item = HandlerFunc>,
    ) -> &mut Self {
        let full_path = format!("{}{path}", self.prefix);
        self.router
            .register(method, full_path, handlers.into_iter().collect(), &self.middlewares);
        self
    }

    /// Registers a `GET` route.
    pub fn get(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::GET, path, handlers)
    }

    /// Registers a `POST` route.
    pub fn post(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::POST, path, handlers)
    }

    /// Registers a `PUT` route.
    pub fn put(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::PUT, path, handlers)
    }

    /// Registers a `PATCH` route.
    pub fn patch(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::PATCH, path, handlers)
    }

    /// Registers a `DELETE` route.
    pub fn delete(&mut self, path: &str, handlers: impl IntoIterator<Item = HandlerFunc>) -> &mut Self {
        self.handle(Method::DELETE, path, handlers)
    }
}

impl std::fmt::Debug for RouteGroup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGroup")
            .field("prefix", &self.prefix)
            .field("middlewares", &self.middlewares)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
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

    fn ok() -> HandlerFunc {
        handler_fn(|ctx| Box::pin(async move { ctx.string(StatusCode::OK, "ok") }))
    }

    fn get(path: &str) -> Request {
        http::Request::builder().uri(path).body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_prefix_concatenation_is_verbatim() {
        let mut router = Router::new();
        let mut api = router.group("/api");
        assert_eq!(api.prefix(), "/api");

        let mut v1 = api.group("/v1");
        assert_eq!(v1.prefix(), "/api/v1");
        v1.get("/users", [ok()]);

        let mut sloppy = v1.group("/");
        sloppy.get("/x", [ok()]);

        assert!(router.has_route(&Method::GET, "/api/v1/users"));
        assert!(router.has_route(&Method::GET, "/api/v1//x"));
        assert_eq!(router.route_count(), 2);
    }

    #[test]
    fn test_group_prefix_matches_exactly() {
        let mut router = Router::new();
        router.group("/a").get("/b", [ok()]);

        assert!(router.has_route(&Method::GET, "/a/b"));
        assert!(!router.has_route(&Method::GET, "/b"));
        assert!(!router.has_route(&Method::GET, "/a"));
        assert!(!router.has_route(&Method::POST, "/a/b"));
    }

    #[tokio::test]
    async fn test_nested_group_accumulates_middleware() {
        let log = Log::default();
        let mut router = Router::new();
        router.use_middleware(tag(&log, "global"));
        {
            let mut outer = router.group("/outer");
            outer.use_middleware(tag(&log, "outer"));

            let mut inner = outer.group("/inner");
            inner.use_middleware(tag(&log, "inner"));
            assert_eq!(inner.middleware_names(), vec!["outer", "inner"]);
            inner.get("/leaf", [ok()]);
        }

        let table = router.freeze();
        let response = table.serve(get("/outer/inner/leaf")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["global", "outer", "inner"]);
    }

    #[tokio::test]
    async fn test_parent_middleware_added_later_does_not_reach_child() {
        let log = Log::default();
        let mut router = Router::new();
        {
            let mut parent = router.group("/p");
            {
                let mut child = parent.group("/c");
                child.get("/x", [ok()]);
            }
            parent.use_middleware(tag(&log, "late"));
            parent.get("/y", [ok()]);
        }

        let table = router.freeze();
        table.serve(get("/p/c/x")).await;
        assert!(log.lock().unwrap().is_empty());

        table.serve(get("/p/y")).await;
        assert_eq!(*log.lock().unwrap(), vec!["late"]);
    }

    #[test]
    fn test_each_method_registers_its_own_key() {
        let mut router = Router::new();
        router
            .group("/r")
            .get("", [ok()])
            .post("", [ok()])
            .put("", [ok()])
            .patch("", [ok()])
            .delete("", [ok()])
            .handle(Method::OPTIONS, "", [ok()]);

        for method in [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ] {
            assert!(router.has_route(&method, "/r"), "{method}");
        }
        assert_eq!(router.route_count(), 6);
    }

    #[test]
    fn test_use_middlewares_keeps_order() {
        let log = Log::default();
        let mut router = Router::new();
        let mut group = router.group("/g");
        group.use_middlewares([tag(&log, "first"), tag(&log, "second")]);
        assert_eq!(group.middleware_names(), vec!["first", "second"]);
        assert!(format!("{group:?}").contains(r#"prefix: "/g""#));
    }
}
