//! The serving-phase route table.

use crate::key::RouteKey;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use switchboard_core::{not_found_response, BoxFuture, Context, HandlerFunc, Request, Response};
use switchboard_server::Dispatch;

/// Immutable mapping from [`RouteKey`] to composed handler.
///
/// Produced by [`Router::freeze`](crate::Router::freeze). Cloning is cheap
/// and every clone shares the same table, so it can be handed to any number
/// of connection tasks. There is no way to add a route to it.
#[derive(Clone)]
pub struct RouteTable {
    routes: Arc<HashMap<RouteKey, HandlerFunc>>,
}

impl RouteTable {
    pub(crate) fn new(routes: HashMap<RouteKey, HandlerFunc>) -> Self {
        Self {
            routes: Arc::new(routes),
        }
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns the composed handler for an exact `(method, path)` match.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<&HandlerFunc> {
        self.routes.get(&RouteKey::new(method.clone(), path))
    }

    /// Returns `true` if `(method, path)` is registered.
    #[must_use]
    pub fn contains(&self, method: &Method, path: &str) -> bool {
        self.route(method, path).is_some()
    }

    /// Returns the registered keys, sorted by path then method.
    #[must_use]
    pub fn keys(&self) -> Vec<&RouteKey> {
        let mut keys: Vec<_> = self.routes.keys().collect();
        keys.sort_by(|a, b| (a.path(), a.method().as_str()).cmp(&(b.path(), b.method().as_str())));
        keys
    }

    /// Dispatches one request.
    ///
    /// On a match a fresh [`Context`] is built and the composed handler runs
    /// to completion; the context then becomes the response. On a miss the
    /// fixed not-found response is returned without building a context or
    /// running any middleware.
    pub async fn serve(&self, request: Request) -> Response {
        let Some(handler) = self.route(request.method(), request.uri().path()) else {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "no route matched"
            );
            return not_found_response();
        };

        let mut ctx = Context::new(request);
        handler.call(&mut ctx).await;
        ctx.into_response()
    }
}

impl Dispatch for RouteTable {
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(self.serve(request))
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.keys().iter().map(ToString::to_string).collect::<Vec<_>>())
            .finish()
    }
}
