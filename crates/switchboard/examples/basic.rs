//! Minimal service: one JSON route under `/a`, with access logging and
//! panic recovery.
//!
//! ```text
//! cargo run -p switchboard --example basic
//! curl -i http://localhost:8080/a/b
//! ```

use switchboard::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LogConfig::development())?;

    let mut router = Router::new();
    router.use_middleware(logger()).use_middleware(recovery());

    let mut a = router.group("/a");
    a.get(
        "/b",
        [handler_fn(|ctx| {
            Box::pin(async move { ctx.json(StatusCode::OK, "okok") })
        })],
    );

    router.start("0.0.0.0:8080").await?;
    Ok(())
}
