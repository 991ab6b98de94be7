//! The demo service served over a real socket.

use std::net::SocketAddr;
use std::time::Duration;
use switchboard::prelude::*;
use switchboard::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn demo_router() -> Router {
    let mut router = Router::new();
    router.use_middleware(logger()).use_middleware(recovery());

    let mut a = router.group("/a");
    a.get(
        "/b",
        [handler_fn(|ctx| Box::pin(async move { ctx.json(StatusCode::OK, "okok") }))],
    );
    a.get(
        "/boom",
        [handler_fn(|ctx| {
            Box::pin(async move {
                let id = ctx.query("id").expect("id is required");
                ctx.string(StatusCode::OK, id);
            })
        })],
    );
    router
}

async fn start() -> (SocketAddr, ShutdownSignal, JoinHandle<Result<(), ServerError>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let config = ServerConfig::builder()
        .shutdown_timeout(Duration::from_secs(1))
        .build();
    let server = Server::new(config, demo_router().freeze());
    let handle = tokio::spawn(server.run_on(listener, shutdown.clone()));
    (addr, shutdown, handle)
}

async fn get(addr: SocketAddr, method: &str, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let raw = format!("{method} {path} HTTP/1.1\r\nHost: test\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_demo_over_http() {
    let (addr, shutdown, handle) = start().await;

    let ok = get(addr, "GET", "/a/b").await;
    assert!(ok.starts_with("HTTP/1.1 200 OK"), "{ok}");
    assert!(ok.to_ascii_lowercase().contains("content-type: application/json\r\n"), "{ok}");
    assert!(ok.ends_with("\r\n\r\n\"okok\""), "{ok}");

    let missing = get(addr, "GET", "/a/c").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found"), "{missing}");
    assert!(missing.ends_with("404 page not found\n"), "{missing}");

    let wrong_method = get(addr, "POST", "/a/b").await;
    assert!(wrong_method.starts_with("HTTP/1.1 404"), "{wrong_method}");

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_fault_does_not_stop_the_server() {
    let (addr, shutdown, handle) = start().await;

    let fault = get(addr, "GET", "/a/boom").await;
    assert!(fault.starts_with("HTTP/1.1 500"), "{fault}");
    assert!(fault.contains("Something went wrong!"), "{fault}");

    let ok = get(addr, "GET", "/a/b").await;
    assert!(ok.starts_with("HTTP/1.1 200 OK"), "{ok}");

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}
