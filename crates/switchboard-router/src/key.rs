//! Route keys.

use http::Method;
use std::fmt;

/// The `(method, full path)` pair a route is stored under.
///
/// Paths are compared byte for byte: `/a/b`, `/a/b/` and `/a//b` are three
/// different keys.
///
/// ```rust
/// use switchboard_router::RouteKey;
/// use http::Method;
///
/// let key = RouteKey::new(Method::GET, "/a/b");
/// assert_eq!(key.to_string(), "GET /a/b");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    method: Method,
    path: String,
}

impl RouteKey {
    /// Creates a key.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The fully resolved path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
