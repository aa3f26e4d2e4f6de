//! End-to-end tests against a hand-rolled mock completion endpoint. No
//! mock-HTTP crate appears anywhere in the retrieved corpus, so this
//! drives a real loopback `TcpListener` and writes a minimal HTTP/1.1
//! response by hand rather than faking the transport layer.

use std::time::{Duration, Instant};

use quill_client::{ClientConfig, CompletionClient, CompletionRequest, CompletionStatus, RequestId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn request(prompt: &str) -> CompletionRequest {
    CompletionRequest {
        request_id: RequestId::from_raw(1),
        prompt: prompt.to_string(),
        max_tokens: 64,
        temperature: 0.8,
        top_p: None,
        model: None,
        deadline: Instant::now() + Duration::from_secs(5),
        idempotent: false,
    }
}

/// Accepts one connection, drains the request, and writes back a
/// fixed status line and body. Closes the connection afterwards so the
/// client never has to reason about keep-alive.
async fn serve_once(listener: TcpListener, status_line: &str, body: &str) {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut buf = [0u8; 8192];
    let _ = socket.read(&mut buf).await.unwrap();
    let response = format!(
        "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    socket.shutdown().await.ok();
}

#[tokio::test]
async fn successful_response_round_trips_text_and_usage() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = r#"{"choices":[{"message":{"content":"the door creaked open"}}],"usage":{"prompt_tokens":12,"completion_tokens":5}}"#;
    tokio::spawn(serve_once(listener, "HTTP/1.1 200 OK", body));

    let client = CompletionClient::new(
        reqwest::Client::new(),
        ClientConfig { endpoint: format!("http://{addr}/v1/chat/completions"), api_key: None, model: "test-model".into() },
    );
    let (_tx, rx) = quill_event::cancelation();
    let result = client.complete(&request("She opened the letter and"), rx).await;

    assert_eq!(result.status, CompletionStatus::Ok);
    assert_eq!(result.text.as_deref(), Some("the door creaked open"));
    assert_eq!(result.usage.map(|u| u.prompt_tokens), Some(12));
    assert_eq!(result.usage.map(|u| u.completion_tokens), Some(5));
}

#[tokio::test]
async fn provider_error_status_maps_to_a_provider_error_result() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_once(listener, "HTTP/1.1 429 Too Many Requests", r#"{"error":"rate limited"}"#));

    let client = CompletionClient::new(
        reqwest::Client::new(),
        ClientConfig { endpoint: format!("http://{addr}/v1/chat/completions"), api_key: None, model: "test-model".into() },
    );
    let (_tx, rx) = quill_event::cancelation();
    let result = client.complete(&request("hello"), rx).await;

    assert!(matches!(
        result.status,
        CompletionStatus::Error(quill_client::ClientErrorKind::Provider)
    ));
    assert!(result.text.is_none());
}

#[tokio::test]
async fn malformed_body_maps_to_a_protocol_error_result() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_once(listener, "HTTP/1.1 200 OK", "not json at all"));

    let client = CompletionClient::new(
        reqwest::Client::new(),
        ClientConfig { endpoint: format!("http://{addr}/v1/chat/completions"), api_key: None, model: "test-model".into() },
    );
    let (_tx, rx) = quill_event::cancelation();
    let result = client.complete(&request("hello"), rx).await;

    assert!(matches!(
        result.status,
        CompletionStatus::Error(quill_client::ClientErrorKind::Protocol)
    ));
}

#[tokio::test]
async fn a_slow_endpoint_yields_a_timeout_before_the_deadline_is_hit() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept the connection but never reply - the client's deadline
        // must fire on its own.
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let client = CompletionClient::new(
        reqwest::Client::new(),
        ClientConfig { endpoint: format!("http://{addr}/v1/chat/completions"), api_key: None, model: "test-model".into() },
    );
    let (_tx, rx) = quill_event::cancelation();
    let mut req = request("hello");
    req.deadline = Instant::now() + Duration::from_millis(80);
    let result = client.complete(&req, rx).await;

    assert_eq!(result.status, CompletionStatus::Timeout);
}
