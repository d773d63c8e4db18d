use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use watchdog_common::Alert;
use watchdog_probes::{AlertSink, BackendClient, PolicySource, ProbeError};

const TIMEOUT: Duration = Duration::from_secs(2);

/// Accept one connection, capture the raw request and answer with a canned response.
async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        let _ = tx.send(request);
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn fetch_returns_normalized_policy() {
    let (url, request) = serve_once(
        "200 OK",
        r#"{"allowed_apps":["Code.exe"],"forbidden_apps":["Chrome.exe","Discord"],"policy":{"auto_kill":true,"repeat_threshold":2}}"#,
    )
    .await;

    let client = BackendClient::new(url, TIMEOUT).unwrap();
    let policy = client.fetch().await.unwrap();

    assert_eq!(policy.forbidden_apps, vec!["chrome.exe", "discord"]);
    assert_eq!(policy.allowed_apps, vec!["code.exe"]);
    assert!(policy.auto_kill());
    assert_eq!(policy.effective_threshold(), 2);

    let request = request.await.unwrap();
    assert!(request.starts_with("GET /api/v1/config/lock HTTP/1.1"));
}

#[tokio::test]
async fn fetch_rejects_error_status() {
    let (url, _request) = serve_once("503 Service Unavailable", "{}").await;
    let client = BackendClient::new(url, TIMEOUT).unwrap();

    match client.fetch().await {
        Err(ProbeError::Status { status, .. }) => assert_eq!(status.as_u16(), 503),
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn fetch_rejects_malformed_body() {
    let (url, _request) = serve_once("200 OK", "<html>maintenance</html>").await;
    let client = BackendClient::new(url, TIMEOUT).unwrap();

    assert!(matches!(client.fetch().await, Err(ProbeError::Decode(_))));
}

#[tokio::test]
async fn fetch_fails_when_backend_is_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BackendClient::new(format!("http://{}", addr), TIMEOUT).unwrap();
    assert!(client.fetch().await.is_err());
}

#[tokio::test]
async fn fetch_times_out_on_silent_backend() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let client =
        BackendClient::new(format!("http://{}", addr), Duration::from_millis(200)).unwrap();
    assert!(matches!(
        client.fetch().await,
        Err(ProbeError::Timeout { .. })
    ));
}

#[tokio::test]
async fn alert_is_posted_as_json() {
    let (url, request) = serve_once("201 Created", "{}").await;
    let client = BackendClient::new(url, TIMEOUT).unwrap();

    let alert = Alert::forbidden_app("chrome.exe", Utc::now());
    client.send(&alert).await.unwrap();

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /api/v1/alerts HTTP/1.1"));
    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["type"], "forbidden_app");
    assert_eq!(json["process"], "chrome.exe");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn alert_failure_status_is_reported() {
    let (url, _request) = serve_once("500 Internal Server Error", "{}").await;
    let client = BackendClient::new(url, TIMEOUT).unwrap();

    let alert = Alert::forbidden_app("discord", Utc::now());
    assert!(matches!(
        client.send(&alert).await,
        Err(ProbeError::Status { .. })
    ));
}
