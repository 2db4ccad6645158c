// tests/inspector_poll.rs

//! Polling tests against a minimal local HTTP responder standing in for
//! the inspector discovery endpoint.

mod common;
use crate::common::init_tracing;

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use runwatch::debug::poll_inspector_ready;
use runwatch::errors::RunwatchError;

const WS_URL: &str = "ws://127.0.0.1:9229/abc123";

/// Accept connections and answer every request with the given body.
async fn serve_body(listener: TcpListener, body: String) {
    loop {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let body = body.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
    }
}

async fn bound_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

#[tokio::test]
async fn resolves_once_a_target_is_connectable() {
    init_tracing();

    let (listener, port) = bound_listener().await;
    let body = format!(r#"[{{"webSocketDebuggerUrl":"{WS_URL}","title":"main"}}]"#);
    tokio::spawn(serve_body(listener, body));

    let client = reqwest::Client::new();
    let url = poll_inspector_ready(
        &client,
        port,
        Duration::from_secs(5),
        Duration::from_millis(50),
    )
    .await
    .expect("inspector ready");

    assert_eq!(url, WS_URL);
}

/// Connection refused means "not ready yet": the endpoint coming up late
/// is still found.
#[tokio::test]
async fn retries_until_the_endpoint_appears() {
    init_tracing();

    // Reserve a port, free it, and only start serving 300ms later.
    let (listener, port) = bound_listener().await;
    drop(listener);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.expect("rebind");
        serve_body(
            listener,
            format!(r#"[{{"webSocketDebuggerUrl":"{WS_URL}"}}]"#),
        )
        .await;
    });

    let client = reqwest::Client::new();
    let url = poll_inspector_ready(
        &client,
        port,
        Duration::from_secs(5),
        Duration::from_millis(50),
    )
    .await
    .expect("inspector eventually ready");

    assert_eq!(url, WS_URL);
}

#[tokio::test]
async fn times_out_when_nothing_listens() {
    init_tracing();

    let (listener, port) = bound_listener().await;
    drop(listener);

    let client = reqwest::Client::new();
    let err = poll_inspector_ready(
        &client,
        port,
        Duration::from_millis(300),
        Duration::from_millis(50),
    )
    .await
    .expect_err("nothing is listening");

    assert!(matches!(err, RunwatchError::Timeout(_)));
}

/// Malformed JSON and target lists without a connectable URL are both
/// treated as "not ready yet", not as hard failures.
#[tokio::test]
async fn malformed_and_unconnectable_responses_are_retried() {
    init_tracing();

    let (listener, port) = bound_listener().await;
    tokio::spawn(serve_body(listener, "[{\"title\": \"booting\"}".to_string()));

    let client = reqwest::Client::new();
    let err = poll_inspector_ready(
        &client,
        port,
        Duration::from_millis(300),
        Duration::from_millis(50),
    )
    .await
    .expect_err("never becomes connectable");

    assert!(matches!(err, RunwatchError::Timeout(_)));
}
