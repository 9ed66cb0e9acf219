//! Integration tests for the reqwest transport against a local HTTP stub.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use vkapi::config::HttpConfig;
use vkapi::{HttpTransport, ReqwestTransport, VkApiError, VkMethod, VkRequest};

/// Serve one connection with a fixed status line and body, returning the
/// request line the client sent.
async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (SocketAddr, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        String::from_utf8_lossy(&request)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    });

    (addr, handle)
}

#[tokio::test]
async fn test_get_returns_body() {
    let (addr, server) = serve_once("200 OK", r#"{"response":1}"#).await;
    let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();

    let url = format!(
        "http://{addr}/method/messages.send?user_id=1&message=hi%20there&v=5.37&access_token=t"
    );
    let body = transport.get(&url).await.unwrap();

    assert_eq!(body, r#"{"response":1}"#);
    let request_line = server.await.unwrap();
    assert_eq!(
        request_line,
        "GET /method/messages.send?user_id=1&message=hi%20there&v=5.37&access_token=t HTTP/1.1"
    );
}

#[tokio::test]
async fn test_line_breaks_reach_the_wire() {
    let (addr, server) = serve_once("200 OK", r#"{"response":1}"#).await;
    let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();

    let request = VkRequest::new(VkMethod::send_message("1", "line1\nline2\tend\r").unwrap());
    let url = request.url(&format!("http://{addr}/method"), "5.37", "t");
    transport.get(&url).await.unwrap();

    let request_line = server.await.unwrap();
    assert_eq!(
        request_line,
        "GET /method/messages.send?user_id=1&message=line1%0Aline2%09end%0D&v=5.37&access_token=t HTTP/1.1"
    );
}

#[tokio::test]
async fn test_get_empty_body() {
    let (addr, server) = serve_once("200 OK", "").await;
    let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();

    let body = transport.get(&format!("http://{addr}/method")).await.unwrap();

    assert!(body.is_empty());
    server.await.unwrap();
}

#[tokio::test]
async fn test_get_http_error_status() {
    let (addr, server) = serve_once("500 Internal Server Error", "boom").await;
    let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();

    let result = transport.get(&format!("http://{addr}/method")).await;

    match result {
        Err(VkApiError::Http(msg)) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("boom"));
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_get_connection_refused() {
    // Bind then drop to get a port with nothing listening.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();

    let result = transport.get(&format!("http://{addr}/method")).await;

    assert!(matches!(result, Err(VkApiError::Http(_))));
}
