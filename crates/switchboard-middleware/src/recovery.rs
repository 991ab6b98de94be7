//! Panic recovery.
//!
//! [`Recovery`] runs the wrapped handler under `catch_unwind`. A panic is
//! logged at `error` level and turned into a fixed `500` JSON response; the
//! worker task and the server keep running.
//!
//! Anything the handler wrote before panicking is discarded, including
//! headers and status.
//!
//! The backtrace has to be taken while the panicking frames are still on the
//! stack, so the first [`Recovery`] to wrap a handler installs a process-wide
//! panic hook. While a recovery handler is polling its inner future the hook
//! records the panic location and backtrace for the current thread and skips
//! the default `thread '..' panicked at` report. Panics anywhere else go to the
//! previously installed hook unchanged.

use crate::middleware::{BoxedMiddleware, Middleware};
use futures_util::FutureExt;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context as TaskContext, Poll};
use switchboard_core::{BoxFuture, Context, Handler, HandlerFunc};

/// Body written when a handler panics.
pub const RECOVERY_BODY: &str =
    r#"{"error": "Internal Server Error", "message": "Something went wrong!"}"#;

/// Panic-to-500 middleware.
#[derive(Debug, Clone, Copy)]
pub struct Recovery {
    capture_backtrace: bool,
}

impl Recovery {
    /// Creates a recovery middleware that logs a backtrace with each panic.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            capture_backtrace: true,
        }
    }

    /// Creates a recovery middleware that logs only the panic message.
    #[must_use]
    pub const fn without_backtrace() -> Self {
        Self {
            capture_backtrace: false,
        }
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for Recovery {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn wrap(&self, next: HandlerFunc) -> HandlerFunc {
        install_panic_hook();
        Arc::new(RecoveryHandler {
            next,
            capture_backtrace: self.capture_backtrace,
        })
    }
}

struct RecoveryHandler {
    next: HandlerFunc,
    capture_backtrace: bool,
}

impl Handler for RecoveryHandler {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let inner = RecoveryScope {
                inner: self.next.call(ctx),
                capture_backtrace: self.capture_backtrace,
            };
            let outcome = AssertUnwindSafe(inner).catch_unwind().await;
            let Err(payload) = outcome else {
                return;
            };

            let message = panic_message(payload.as_ref());
            let captured = take_captured();
            let location = captured
                .as_ref()
                .map_or_else(|| "<unknown>".to_owned(), |c| c.location.clone());
            match captured.and_then(|c| c.backtrace) {
                Some(backtrace) => tracing::error!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    panic = %message,
                    location = %location,
                    "panic recovered\n{backtrace}"
                ),
                None => tracing::error!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    panic = %message,
                    location = %location,
                    "panic recovered"
                ),
            }

            let writer = ctx.writer_mut();
            writer.reset();
            writer.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            writer.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            writer.write(RECOVERY_BODY.as_bytes());
        })
    }
}

/// What the panic hook saw for the last panic inside a recovery scope.
struct Captured {
    location: String,
    backtrace: Option<Backtrace>,
}

thread_local! {
    /// `Some(capture_backtrace)` while a recovery handler polls its inner future.
    static SCOPE: Cell<Option<bool>> = const { Cell::new(None) };
    static CAPTURED: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

static HOOK: OnceLock<()> = OnceLock::new();

fn install_panic_hook() {
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let Some(capture_backtrace) = SCOPE.try_with(Cell::get).ok().flatten() else {
                previous(info);
                return;
            };
            let location = info
                .location()
                .map_or_else(|| "<unknown>".to_owned(), ToString::to_string);
            let backtrace = capture_backtrace.then(Backtrace::force_capture);
            let _ = CAPTURED.try_with(|slot| {
                *slot.borrow_mut() = Some(Captured { location, backtrace });
            });
        }));
    });
}

fn take_captured() -> Option<Captured> {
    CAPTURED.try_with(|slot| slot.borrow_mut().take()).ok().flatten()
}

/// Marks the current thread as inside a recovery scope for each poll of the
/// wrapped future.
struct RecoveryScope<F> {
    inner: F,
    capture_backtrace: bool,
}

impl<F: Future + Unpin> Future for RecoveryScope<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let _scope = ScopeGuard::enter(self.capture_backtrace);
        Pin::new(&mut self.inner).poll(cx)
    }
}

/// Restores the enclosing scope on drop, including while unwinding.
struct ScopeGuard {
    previous: Option<bool>,
}

impl ScopeGuard {
    fn enter(capture_backtrace: bool) -> Self {
        let _ = CAPTURED.try_with(|slot| slot.borrow_mut().take());
        let previous = SCOPE.with(|scope| scope.replace(Some(capture_backtrace)));
        Self { previous }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let _ = SCOPE.try_with(|scope| scope.set(self.previous));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "Box<dyn Any>"
    }
}

/// Returns the recovery middleware as a [`BoxedMiddleware`].
#[must_use]
pub fn recovery() -> BoxedMiddleware {
    Arc::new(Recovery::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use switchboard_core::handler_fn;

    fn context() -> Context {
        Context::new(http::Request::builder().uri("/boom").body(Bytes::new()).unwrap())
    }

    fn panicking() -> HandlerFunc {
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.string(StatusCode::OK, "partial");
                panic!("handler exploded");
            })
        })
    }

    #[tokio::test]
    async fn test_panic_becomes_json_500() {
        let handler = recovery().wrap(panicking());

        let mut ctx = context();
        handler.call(&mut ctx).await;

        assert_eq!(ctx.response_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ctx.writer().headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(ctx.writer().body(), RECOVERY_BODY.as_bytes());
    }

    #[inline(never)]
    fn explode_in_fault_site() {
        panic!("fault site reached");
    }

    fn faulting() -> HandlerFunc {
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.set_status(StatusCode::ACCEPTED);
                explode_in_fault_site();
            })
        })
    }

    #[tokio::test]
    async fn test_backtrace_points_at_fault_site() {
        let (logs, _guard) = crate::test_log::capture();
        let handler = recovery().wrap(faulting());

        let mut ctx = context();
        handler.call(&mut ctx).await;

        let output = logs.contents();
        assert!(output.contains("panic recovered"), "{output}");
        assert!(output.contains("fault site reached"), "{output}");
        assert!(output.contains("explode_in_fault_site"), "{output}");
        assert!(output.contains("recovery.rs:"), "{output}");
        assert_eq!(ctx.response_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_without_backtrace_variant() {
        let (logs, _guard) = crate::test_log::capture();
        let handler = Recovery::without_backtrace().wrap(faulting());

        let mut ctx = context();
        handler.call(&mut ctx).await;

        assert_eq!(ctx.response_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ctx.writer().body(), RECOVERY_BODY.as_bytes());

        let output = logs.contents();
        assert!(output.contains("location="), "{output}");
        assert!(!output.contains("explode_in_fault_site"), "{output}");
    }

    #[tokio::test]
    async fn test_nested_recovery_restores_outer_scope() {
        let handler = recovery().wrap(Recovery::without_backtrace().wrap(panicking()));

        let mut ctx = context();
        handler.call(&mut ctx).await;

        assert_eq!(ctx.response_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(SCOPE.with(Cell::get), None);
        assert!(take_captured().is_none());
    }

    #[tokio::test]
    async fn test_no_panic_leaves_response_alone() {
        let handler = recovery().wrap(handler_fn(|ctx| {
            Box::pin(async move {
                ctx.string(StatusCode::ACCEPTED, "fine");
            })
        }));

        let mut ctx = context();
        handler.call(&mut ctx).await;

        assert_eq!(ctx.response_status(), StatusCode::ACCEPTED);
        assert_eq!(ctx.writer().body(), b"fine");
    }

    #[tokio::test]
    async fn test_handler_is_reusable_after_panic() {
        let handler = recovery().wrap(panicking());

        for _ in 0..2 {
            let mut ctx = context();
            handler.call(&mut ctx).await;
            assert_eq!(ctx.response_status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_panic_message() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "Box<dyn Any>");
    }
}
