use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use httpstream::http::connection::Connection;
use httpstream::diag::Diagnostics;
use httpstream::options::Options;
use httpstream::http::request::Method;
use httpstream::http::response::Reply;
use httpstream::router::{Router, handler};

fn demo_router() -> Arc<Router> {
    let mut router = Router::new();
    router.route(
        "*",
        Method::GET,
        "/",
        handler(|_req| async { Reply::text("hello") }),
    );
    router.route(
        "*",
        Method::POST,
        "/echo",
        handler(|req| async move {
            let mut pairs: Vec<String> = req
                .attach
                .query
                .iter()
                .map(|(k, vs)| format!("{k}={}", vs.join(",")))
                .collect();
            pairs.sort();
            Reply::text(pairs.join("&"))
        }),
    );
    Arc::new(router)
}

fn serve(router: Arc<Router>) -> (DuplexStream, JoinHandle<anyhow::Result<()>>) {
    serve_with(router, Options::default(), Diagnostics::new())
}

fn serve_with(
    router: Arc<Router>,
    opts: Options,
    diag: Diagnostics,
) -> (DuplexStream, JoinHandle<anyhow::Result<()>>) {
    let (client, server) = tokio::io::duplex(1 << 16);
    let task = tokio::spawn(async move {
        Connection::new(server, router, Arc::new(opts))
            .with_diagnostics(diag)
            .run()
            .await
    });
    (client, task)
}

fn split(raw: &[u8]) -> (String, Vec<u8>) {
    let sep = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator");
    (
        String::from_utf8_lossy(&raw[..sep + 4]).into_owned(),
        raw[sep + 4..].to_vec(),
    )
}

#[tokio::test]
async fn test_get_round_trip() {
    let (mut client, task) = serve(demo_router());

    client
        .write_all(b"GET / HTTP/1.1\r\nHost: any\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();

    let (head, body) = split(&raw);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Length: 5\r\n"));
    assert_eq!(body, b"hello");
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_keep_alive_serves_pipelined_requests() {
    let (mut client, task) = serve(demo_router());

    let req = b"GET / HTTP/1.1\r\nHost: any\r\nConnection: keep-alive\r\n\r\n";
    client.write_all(req).await.unwrap();
    client.write_all(req).await.unwrap();
    client.shutdown().await.unwrap();

    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw);

    assert_eq!(text.matches("HTTP/1.1 200 OK").count(), 2);
    assert_eq!(text.matches("hello").count(), 2);
    assert_eq!(text.matches("Connection: keep-alive").count(), 2);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_http10_request_closes_after_response() {
    let (mut client, task) = serve(demo_router());

    client
        .write_all(b"GET / HTTP/1.0\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();

    let (head, body) = split(&raw);
    assert!(head.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(head.contains("Connection: close\r\n"));
    assert_eq!(body, b"hello");
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_post_dispatches_once_body_arrives() {
    let (mut client, task) = serve(demo_router());

    client
        .write_all(
            b"POST /echo HTTP/1.1\r\n\
              Host: any\r\n\
              Content-Type: application/x-www-form-urlencoded\r\n\
              Content-Length: 9\r\n\
              Connection: close\r\n\r\n",
        )
        .await
        .unwrap();
    // body lands in two later writes, split mid-pair
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    client.write_all(b"a=1&b").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    client.write_all(b"=two").await.unwrap();

    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();
    let (head, body) = split(&raw);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"a=1&b=two");
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_file_body_served_with_range() {
    let path = std::env::temp_dir().join(format!("httpstream-range-{}.bin", std::process::id()));
    std::fs::write(&path, b"0123456789").unwrap();

    let mut router = Router::new();
    let served = path.clone();
    router.route(
        "*",
        Method::GET,
        "/file",
        handler(move |_req| {
            let path = served.clone();
            async move { Reply::file(path) }
        }),
    );
    let (mut client, task) = serve(Arc::new(router));

    client
        .write_all(
            b"GET /file HTTP/1.1\r\nHost: any\r\nRange: bytes=2-5\r\nConnection: close\r\n\r\n",
        )
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();

    let (head, body) = split(&raw);
    assert!(head.starts_with("HTTP/1.1 206 Partial Content\r\n"));
    assert!(head.contains("Content-Range: bytes 2-5/10\r\n"));
    assert!(head.contains("Content-Length: 4\r\n"));
    assert_eq!(body, b"2345");
    task.await.unwrap().unwrap();
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn test_missing_file_answers_404() {
    let (diag, mut events) = Diagnostics::channel();
    let mut router = Router::new();
    router.route(
        "*",
        Method::GET,
        "/gone",
        handler(|_req| async { Reply::file("/no/such/file/anywhere") }),
    );
    let (mut client, task) = serve_with(Arc::new(router), Options::default(), diag);

    client
        .write_all(b"GET /gone HTTP/1.1\r\nHost: any\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();

    let (head, body) = split(&raw);
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(body, b"404 Not Found");
    task.await.unwrap().unwrap();

    // one event for the metadata failure, one for the 404 response
    assert_eq!(events.recv().await.unwrap().status, 404);
    assert_eq!(events.recv().await.unwrap().status, 404);
}

#[tokio::test]
async fn test_stream_body_of_unknown_length_is_chunked() {
    let mut router = Router::new();
    router.route(
        "*",
        Method::GET,
        "/feed",
        handler(|_req| async {
            let source = Box::new(std::io::Cursor::new(b"streamed!".to_vec()));
            Reply::stream(source, None)
        }),
    );
    let (mut client, task) = serve(Arc::new(router));

    client
        .write_all(b"GET /feed HTTP/1.1\r\nHost: any\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();

    let (head, body) = split(&raw);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Transfer-Encoding: chunked\r\n"));
    assert!(!head.contains("Content-Length"));
    assert_eq!(body, b"9\r\nstreamed!\r\n0\r\n\r\n");
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_head_gets_headers_without_body() {
    let (mut client, task) = serve(demo_router());

    client
        .write_all(b"HEAD / HTTP/1.1\r\nHost: any\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();

    let (head, body) = split(&raw);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Length: 5\r\n"));
    assert!(body.is_empty());
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unroutable_host_answers_404_and_closes() {
    let (diag, mut events) = Diagnostics::channel();
    let mut router = Router::new();
    router.route(
        "example.com",
        Method::GET,
        "/",
        handler(|_req| async { Reply::text("x") }),
    );
    let (mut client, task) = serve_with(Arc::new(router), Options::default(), diag);

    client
        .write_all(b"GET / HTTP/1.1\r\nHost: other.com\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();

    let (head, _) = split(&raw);
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(head.contains("Connection: close\r\n"));
    task.await.unwrap().unwrap();
    assert_eq!(events.recv().await.unwrap().status, 404);
}

#[tokio::test]
async fn test_oversized_post_answers_413_and_closes() {
    let opts = Options {
        limit: 64,
        ..Options::default()
    };
    let (mut client, task) = serve_with(demo_router(), opts, Diagnostics::new());

    client
        .write_all(
            b"POST /echo HTTP/1.1\r\n\
              Host: any\r\n\
              Content-Type: application/x-www-form-urlencoded\r\n\
              Content-Length: 100000\r\n\r\n",
        )
        .await
        .unwrap();
    let mut raw = Vec::new();
    client.read_to_end(&mut raw).await.unwrap();

    let (head, _) = split(&raw);
    assert!(head.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    assert!(head.contains("Connection: close\r\n"));
    task.await.unwrap().unwrap();
}
