//! Access logging.
//!
//! [`Logger`] emits one `info` event per request after the wrapped handler
//! returns. The status it reports is read from the context's response sink,
//! so it is the status the handler actually wrote.
//!
//! # Fields
//!
//! | Field | Example |
//! |-------|---------|
//! | `client_addr` | `127.0.0.1:53012` (`-` when unknown) |
//! | `timestamp` | `2024-05-01 13:37:00` (local time at request start) |
//! | `method` | `GET` |
//! | `path` | `/a/b` |
//! | `protocol` | `HTTP/1.1` |
//! | `status` | `200` |
//! | `duration` | `1.204ms` |

use crate::middleware::{BoxedMiddleware, Middleware};
use chrono::Local;
use std::sync::Arc;
use std::time::Instant;
use switchboard_core::{BoxFuture, Context, Handler, HandlerFunc};

/// Target of access-log events, for filtering.
pub const ACCESS_LOG_TARGET: &str = "switchboard::access";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Access-log middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Logger {
    /// Creates the access logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for Logger {
    fn name(&self) -> &'static str {
        "logger"
    }

    fn wrap(&self, next: HandlerFunc) -> HandlerFunc {
        Arc::new(LoggerHandler { next })
    }
}

struct LoggerHandler {
    next: HandlerFunc,
}

impl Handler for LoggerHandler {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let start = Instant::now();
            let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();

            self.next.call(ctx).await;

            let duration = start.elapsed();
            let client_addr = ctx
                .remote_addr()
                .map_or_else(|| "-".to_string(), |addr| addr.to_string());

            tracing::info!(
                target: ACCESS_LOG_TARGET,
                client_addr = %client_addr,
                timestamp = %timestamp,
                method = %ctx.method(),
                path = %ctx.path(),
                protocol = ?ctx.protocol(),
                status = ctx.response_status().as_u16(),
                duration = ?duration,
                "{} {} {:?} {}",
                ctx.method(),
                ctx.path(),
                ctx.protocol(),
                ctx.response_status().as_u16()
            );
        })
    }
}

/// Returns the access logger as a [`BoxedMiddleware`].
#[must_use]
pub fn logger() -> BoxedMiddleware {
    Arc::new(Logger::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use switchboard_core::handler_fn;

    fn context(uri: &str) -> Context {
        Context::new(http::Request::builder().uri(uri).body(Bytes::new()).unwrap())
    }

    #[tokio::test]
    async fn test_logger_passes_response_through() {
        let handler = Logger::new().wrap(handler_fn(|ctx| {
            Box::pin(async move {
                ctx.json(StatusCode::CREATED, &serde_json::json!({"id": 1}));
            })
        }));

        let mut ctx = context("/items");
        handler.call(&mut ctx).await;

        assert_eq!(ctx.response_status(), StatusCode::CREATED);
        assert_eq!(ctx.writer().body(), br#"{"id":1}"#);
    }

    #[tokio::test]
    async fn test_logger_with_silent_handler() {
        let handler = logger().wrap(handler_fn(|_ctx| Box::pin(async {})));

        let mut ctx = context("/quiet");
        handler.call(&mut ctx).await;

        assert!(!ctx.writer().is_written());
        assert_eq!(ctx.response_status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_access_event_reports_written_status() {
        let (logs, _guard) = crate::test_log::capture();
        let handler = logger().wrap(handler_fn(|ctx| {
            Box::pin(async move { ctx.string(StatusCode::CREATED, "made") })
        }));

        let mut ctx = context("/items");
        handler.call(&mut ctx).await;

        let lines = logs.lines_for(ACCESS_LOG_TARGET);
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("status=201"), "{}", lines[0]);
        assert!(lines[0].contains("path=/items"), "{}", lines[0]);
        assert!(lines[0].contains("method=GET"), "{}", lines[0]);
    }

    #[tokio::test]
    async fn test_access_event_reports_recovered_500() {
        let (logs, _guard) = crate::test_log::capture();
        let mut chain = crate::Chain::new();
        chain.push(logger());
        chain.push(crate::recovery());
        let handler = chain.then(handler_fn(|ctx| {
            Box::pin(async move {
                ctx.string(StatusCode::OK, "partial");
                panic!("fault under the logger");
            })
        }));

        let mut ctx = context("/explode");
        handler.call(&mut ctx).await;

        let lines = logs.lines_for(ACCESS_LOG_TARGET);
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("status=500"), "{}", lines[0]);
        assert!(!lines[0].contains("status=200"), "{}", lines[0]);
    }

    #[test]
    fn test_name() {
        assert_eq!(logger().name(), "logger");
    }
}
