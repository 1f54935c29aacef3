//! HttpTransport against a real local HTTP server standing in for the gateway.
//!
//! Run with: `cargo test -p figgy-gateway --test http_transport`

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use figgy_gateway::GatewayClient;
use figgy_gateway::transport::{GatewayTransport, HttpTransport, ToolInvocation};

type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

/// Find an available port.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn tools_invoke(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    seen.lock().unwrap().push((auth, body.clone()));

    match body["tool"].as_str().unwrap_or_default() {
        "explode" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream boom").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"ok": true})).into_response()
        }
        "refuse" => Json(json!({"ok": false, "error": {"message": "tool not allowed"}})).into_response(),
        "session_status" => Json(json!({
            "ok": true,
            "result": {"details": {"uptimeSeconds": 12.5, "channels": {"telegram": {"connected": true}}}}
        }))
        .into_response(),
        _ => Json(json!({"ok": true, "result": {"details": {"echo": body}}})).into_response(),
    }
}

/// Start a fake gateway and return its base URL plus the request log.
async fn start_fake_gateway() -> (String, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/tools/invoke", post(tools_invoke))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/"), seen)
}

#[tokio::test]
async fn test_request_shape_and_bearer_auth() {
    let (url, seen) = start_fake_gateway().await;
    let transport = HttpTransport::new(&url, Some("s3cret".into()), Duration::from_secs(5));
    assert!(transport.endpoint().ends_with("/tools/invoke"));
    assert!(!transport.endpoint().contains("//tools"));

    let invocation = ToolInvocation::new("gateway")
        .action("config.get")
        .arg("limit", 3);
    let envelope = transport.invoke(&invocation).await.unwrap();
    assert!(envelope.ok);

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer s3cret"));
    assert_eq!(
        *body,
        json!({
            "tool": "gateway",
            "args": {"limit": 3},
            "sessionKey": "main",
            "action": "config.get"
        })
    );
}

#[tokio::test]
async fn test_no_token_sends_no_authorization() {
    let (url, seen) = start_fake_gateway().await;
    let transport = HttpTransport::new(&url, Some(String::new()), Duration::from_secs(5));

    transport
        .invoke(&ToolInvocation::new("sessions_list"))
        .await
        .unwrap();

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests[0].0, None);
    assert!(requests[0].1.get("action").is_none());
}

#[tokio::test]
async fn test_non_2xx_is_transport_error() {
    let (url, _) = start_fake_gateway().await;
    let transport = HttpTransport::new(&url, None, Duration::from_secs(5));

    let err = transport
        .invoke(&ToolInvocation::new("explode"))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(
        err,
        figgy_core::error::FiggyError::Transport { status: 500, ref body } if body == "upstream boom"
    ));
}

#[tokio::test]
async fn test_not_ok_envelope_is_returned_not_raised() {
    let (url, _) = start_fake_gateway().await;
    let transport = HttpTransport::new(&url, None, Duration::from_secs(5));

    let envelope = transport
        .invoke(&ToolInvocation::new("refuse"))
        .await
        .unwrap();
    assert!(!envelope.ok);
    assert_eq!(
        figgy_gateway::envelope::error_message(&envelope),
        "tool not allowed"
    );
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let (url, _) = start_fake_gateway().await;
    let transport = HttpTransport::new(&url, None, Duration::from_millis(200));

    let err = transport
        .invoke(&ToolInvocation::new("slow"))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    let client = GatewayClient::new(Arc::new(transport));
    let health = client.health().health().await;
    assert!(health.ok);
}

#[tokio::test]
async fn test_health_over_http() {
    let (url, _) = start_fake_gateway().await;
    let client = GatewayClient::new(Arc::new(HttpTransport::new(
        &url,
        None,
        Duration::from_secs(5),
    )));

    let health = client.health().health().await;
    assert!(health.ok);
    assert_eq!(health.uptime_seconds, Some(12.5));
    assert_eq!(health.channels["telegram"]["connected"], json!(true));
}

#[tokio::test]
async fn test_health_when_gateway_is_down() {
    let port = find_free_port();
    let transport = HttpTransport::new(
        &format!("http://127.0.0.1:{port}"),
        None,
        Duration::from_secs(2),
    );
    let client = GatewayClient::new(Arc::new(transport));

    let health = client.health().health().await;
    assert!(!health.ok);
    assert_eq!(health.channels["error"], json!("Cannot connect to gateway"));
    assert_eq!(health.uptime_seconds, None);
}
