//! Behavior tests for request dispatch and the accept loop.
//!
//! Dispatch-level tests drive `handle_request` directly with buffered
//! bodies; the socket tests run the real server on an ephemeral port.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Request;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Notify;

use postlog::config::{AppState, Config, LoggingConfig, ServerConfig, StaticFilesConfig};
use postlog::handler::handle_request;
use postlog::server::Server;

fn test_config(root: &Path) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: None,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            access_log: false,
            show_headers: false,
            access_log_format: "combined".to_string(),
            access_log_file: None,
            error_log_file: None,
        },
        static_files: StaticFilesConfig {
            root: root.to_string_lossy().into_owned(),
            index_files: vec!["index.html".to_string()],
        },
    }
}

fn temp_root(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("postlog-behavior-{}-{tag}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn test_state(root: &Path) -> Arc<AppState> {
    Arc::new(AppState::new(&test_config(root)))
}

fn peer() -> SocketAddr {
    "127.0.0.1:45678".parse().unwrap()
}

async fn body_bytes(resp: hyper::Response<Full<Bytes>>) -> Bytes {
    resp.into_body().collect().await.unwrap().to_bytes()
}

#[tokio::test]
async fn post_is_acknowledged_with_fixed_body() {
    let root = temp_root("post-ack");
    let req = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-length", "5")
        .body(Full::new(Bytes::from_static(b"hello")))
        .unwrap();

    let resp = handle_request(req, peer(), test_state(&root)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["Content-Type"], "text/plain");
    assert_eq!(&body_bytes(resp).await[..], b"POST request received");
}

#[tokio::test]
async fn post_with_empty_body_is_acknowledged() {
    let root = temp_root("post-empty");
    let req = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-length", "0")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let resp = handle_request(req, peer(), test_state(&root)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(&body_bytes(resp).await[..], b"POST request received");
}

#[tokio::test]
async fn post_without_content_length_is_rejected() {
    let root = temp_root("post-no-length");
    let req = Request::builder()
        .method("POST")
        .uri("/")
        .body(Full::new(Bytes::from_static(b"hello")))
        .unwrap();

    let resp = handle_request(req, peer(), test_state(&root)).await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn post_with_non_numeric_content_length_is_rejected() {
    let root = temp_root("post-bad-length");
    let req = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-length", "five")
        .body(Full::new(Bytes::from_static(b"hello")))
        .unwrap();

    let resp = handle_request(req, peer(), test_state(&root)).await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn get_serves_file_bytes() {
    let root = temp_root("get-file");
    std::fs::write(root.join("page.txt"), b"file contents here").unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/page.txt")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let resp = handle_request(req, peer(), test_state(&root)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["Content-Type"], "text/plain; charset=utf-8");
    assert_eq!(&body_bytes(resp).await[..], b"file contents here");
}

#[tokio::test]
async fn get_missing_path_is_404() {
    let root = temp_root("get-missing");
    let req = Request::builder()
        .method("GET")
        .uri("/no-such-file.txt")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let resp = handle_request(req, peer(), test_state(&root)).await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn head_keeps_headers_drops_body() {
    let root = temp_root("head");
    std::fs::write(root.join("data.json"), b"{\"k\":1}").unwrap();

    let req = Request::builder()
        .method("HEAD")
        .uri("/data.json")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let resp = handle_request(req, peer(), test_state(&root)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["Content-Type"], "application/json");
    assert_eq!(resp.headers()["Content-Length"], "7");
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn conditional_get_returns_304_on_matching_etag() {
    let root = temp_root("etag");
    std::fs::write(root.join("cached.css"), b"body{}").unwrap();
    let state = test_state(&root);

    let first = Request::builder()
        .method("GET")
        .uri("/cached.css")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let resp = handle_request(first, peer(), Arc::clone(&state)).await.unwrap();
    let etag = resp.headers()["ETag"].to_str().unwrap().to_string();

    let second = Request::builder()
        .method("GET")
        .uri("/cached.css")
        .header("if-none-match", etag.as_str())
        .body(Full::new(Bytes::new()))
        .unwrap();
    let resp = handle_request(second, peer(), state).await.unwrap();
    assert_eq!(resp.status(), 304);
}

#[tokio::test]
async fn index_file_is_served_for_directory() {
    let root = temp_root("index");
    std::fs::write(root.join("index.html"), b"<html>home</html>").unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let resp = handle_request(req, peer(), test_state(&root)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(&body_bytes(resp).await[..], b"<html>home</html>");
}

#[tokio::test]
async fn directory_without_index_is_listed() {
    let root = temp_root("listing");
    std::fs::write(root.join("report.csv"), b"a,b").unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let resp = handle_request(req, peer(), test_state(&root)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["Content-Type"],
        "text/html; charset=utf-8"
    );
    let html = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(html.contains("report.csv"));
}

/// Run the real server on an ephemeral port, returning its address, the
/// shutdown handle and the loop's join handle.
fn spawn_server(root: &Path) -> (SocketAddr, Arc<Notify>, tokio::task::JoinHandle<()>) {
    let state = test_state(root);
    let server = Server::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = Arc::new(Notify::new());

    let loop_shutdown = Arc::clone(&shutdown);
    let handle = tokio::spawn(async move {
        server.run(state, loop_shutdown).await.unwrap();
    });

    (addr, shutdown, handle)
}

async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn real_socket_post_round_trip() {
    let root = temp_root("socket-post");
    let (addr, shutdown, handle) = spawn_server(&root);

    let response = raw_exchange(
        addr,
        b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("POST request received"));

    shutdown.notify_waiters();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn real_socket_serves_connections_in_accept_order() {
    let root = temp_root("socket-order");
    std::fs::write(root.join("f.txt"), b"x").unwrap();
    let (addr, shutdown, handle) = spawn_server(&root);

    // Each exchange completes before the next connection is serviced, so
    // successive requests are answered in order
    for i in 0..3 {
        let body = format!("msg{i}");
        let request = format!(
            "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let response = raw_exchange(addr, request.as_bytes()).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "request {i} failed");
    }

    let response =
        raw_exchange(addr, b"GET /missing HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404"));

    shutdown.notify_waiters();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn shutdown_notification_stops_accept_loop() {
    let root = temp_root("shutdown");
    let (_addr, shutdown, handle) = spawn_server(&root);

    // Give the loop a tick to reach the select before notifying
    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.notify_waiters();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("accept loop did not stop after shutdown")
        .unwrap();
}
