//! `HttpRefreshClient` against a local `tiny_http` server.

use std::io::Read;
use std::thread::JoinHandle;
use std::time::Duration;

use keyfresh_auth::{FailureCause, HttpRefreshClient, RefreshClient, RefreshRequest, TokenPair};
use pretty_assertions::assert_eq;

struct Captured {
    method: String,
    content_type: Option<String>,
    body: String,
}

/// Answer exactly one request with `status` and `body` after `delay`.
fn serve_once(status: u16, body: &'static str, delay: Duration) -> (String, JoinHandle<Captured>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("Failed to start tiny_http");
    let port = server
        .server_addr()
        .to_ip()
        .expect("Should be IP address")
        .port();

    let handle = std::thread::spawn(move || {
        let mut request = server
            .recv_timeout(Duration::from_secs(5))
            .expect("recv failed")
            .expect("No request received");

        let mut request_body = String::new();
        request
            .as_reader()
            .read_to_string(&mut request_body)
            .expect("read body");
        let captured = Captured {
            method: request.method().to_string(),
            content_type: request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Content-Type"))
                .map(|h| h.value.to_string()),
            body: request_body,
        };

        std::thread::sleep(delay);
        let response = tiny_http::Response::from_string(body)
            .with_status_code(status)
            .with_header(
                "Content-Type: application/json"
                    .parse::<tiny_http::Header>()
                    .expect("header"),
            );
        let _ = request.respond(response);
        captured
    });

    (format!("http://127.0.0.1:{port}/auth/refresh"), handle)
}

fn request(organization_id: Option<&str>) -> RefreshRequest {
    RefreshRequest {
        refresh_token: "rt-abc".into(),
        organization_id: organization_id.map(str::to_owned),
    }
}

#[tokio::test]
async fn posts_json_and_parses_rotated_pair() {
    let (url, server) = serve_once(
        200,
        r#"{"accessToken":"at-new","refreshToken":"rt-new"}"#,
        Duration::ZERO,
    );
    let client = HttpRefreshClient::new(&url, Duration::from_secs(5)).expect("client");

    let pair = client
        .refresh(&request(Some("org_1")))
        .await
        .expect("refresh should succeed");
    assert_eq!(pair, TokenPair::new("at-new", "rt-new"));

    let captured = server.join().expect("server thread");
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.content_type.as_deref(), Some("application/json"));
    let body: serde_json::Value = serde_json::from_str(&captured.body).expect("json body");
    assert_eq!(
        body,
        serde_json::json!({"refreshToken": "rt-abc", "organizationId": "org_1"})
    );
}

#[tokio::test]
async fn missing_refresh_token_in_response_keeps_previous() {
    let (url, server) = serve_once(200, r#"{"accessToken":"at-new"}"#, Duration::ZERO);
    let client = HttpRefreshClient::new(&url, Duration::from_secs(5)).expect("client");

    let pair = client.refresh(&request(None)).await.expect("refresh");
    assert_eq!(pair, TokenPair::new("at-new", "rt-abc"));
    server.join().expect("server thread");
}

#[tokio::test]
async fn non_success_status_is_rejection() {
    let (url, server) = serve_once(401, "not json at all", Duration::ZERO);
    let client = HttpRefreshClient::new(&url, Duration::from_secs(5)).expect("client");

    let err = client.refresh(&request(None)).await.unwrap_err();
    assert_eq!(err, FailureCause::RefreshRejected { status: 401 });
    server.join().expect("server thread");
}

#[tokio::test]
async fn empty_error_body_is_tolerated() {
    let (url, server) = serve_once(500, "", Duration::ZERO);
    let client = HttpRefreshClient::new(&url, Duration::from_secs(5)).expect("client");

    let err = client.refresh(&request(None)).await.unwrap_err();
    assert_eq!(err, FailureCause::RefreshRejected { status: 500 });
    server.join().expect("server thread");
}

#[tokio::test]
async fn unparseable_success_body_is_malformed() {
    let (url, server) = serve_once(200, "<html>ok</html>", Duration::ZERO);
    let client = HttpRefreshClient::new(&url, Duration::from_secs(5)).expect("client");

    let err = client.refresh(&request(None)).await.unwrap_err();
    assert!(matches!(err, FailureCause::MalformedResponse(_)), "got {err:?}");
    server.join().expect("server thread");
}

#[tokio::test]
async fn slow_endpoint_times_out_as_network_error() {
    let (url, server) = serve_once(200, r#"{"accessToken":"late"}"#, Duration::from_secs(2));
    let client = HttpRefreshClient::new(&url, Duration::from_millis(200)).expect("client");

    let err = client.refresh(&request(None)).await.unwrap_err();
    assert!(
        matches!(&err, FailureCause::NetworkError(msg) if msg.contains("timed out")),
        "got {err:?}"
    );
    server.join().expect("server thread");
}

#[tokio::test]
async fn unreachable_endpoint_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let client = HttpRefreshClient::new(
        &format!("http://127.0.0.1:{port}/auth/refresh"),
        Duration::from_secs(2),
    )
    .expect("client");

    let err = client.refresh(&request(None)).await.unwrap_err();
    assert!(matches!(err, FailureCause::NetworkError(_)), "got {err:?}");
}
