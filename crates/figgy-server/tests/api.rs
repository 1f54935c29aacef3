//! HTTP API tests, driving the router directly against an in-memory gateway.
//!
//! Run with: `cargo test -p figgy-server --test api`

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use figgy_core::config::Settings;
use figgy_core::error::FiggyError;
use figgy_core::types::GatewayEnvelope;
use figgy_gateway::GatewayClient;
use figgy_gateway::mock::{MockGateway, arg_str, not_ok, ok};
use figgy_gateway::transport::ToolInvocation;
use figgy_server::{AppState, build_router};

fn app_with(gw: Arc<MockGateway>) -> Router {
    let state = AppState::new(GatewayClient::new(gw), Settings::default());
    build_router(Arc::new(state))
}

fn app<F>(handler: F) -> (Router, Arc<MockGateway>)
where
    F: Fn(&ToolInvocation) -> figgy_core::error::Result<GatewayEnvelope> + Send + Sync + 'static,
{
    let gw = Arc::new(MockGateway::new(handler));
    (app_with(gw.clone()), gw)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(b) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(b.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

fn logs_gateway(inv: &ToolInvocation) -> figgy_core::error::Result<GatewayEnvelope> {
    match inv.tool.as_str() {
        "sessions_list" => Ok(ok(json!({"details": {"sessions": [
            {"key": "s1", "channel": "telegram", "updatedAt": 100},
            {"key": "s2", "channel": "discord", "displayName": "Ops", "updatedAt": 300},
            {"key": "s3", "channel": "telegram"}
        ]}}))),
        "sessions_history" => {
            let key = arg_str(inv, "sessionKey").unwrap_or_default();
            Ok(ok(json!({"details": {"messages": [
                {"role": "user", "content": format!("{key} question"), "timestamp": 10},
                {"role": "assistant", "content": [{"type": "text", "text": format!("{key} answer")}], "timestamp": 20}
            ]}})))
        }
        _ => Ok(not_ok("unexpected")),
    }
}

#[tokio::test]
async fn test_health_and_root() {
    let (app, _) = app(|_| Ok(not_ok("unused")));
    let (status, body) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_logs_query_with_filters() {
    let (app, gw) = app(logs_gateway);

    let (status, body) = get(
        app,
        "/api/logs?channel=telegram&role=assistant&limit=1&offset=0&include_tools=true",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(2));
    assert_eq!(body["has_more"], json!(true));
    let first = &body["messages"][0];
    assert_eq!(first["role"], "assistant");
    assert_eq!(first["session_key"], "s1");
    assert_eq!(first["session_name"], "s1");
    assert_eq!(first["content"], "s1 answer");

    let histories = gw.calls_to("sessions_history");
    assert_eq!(histories.len(), 2);
    assert!(histories.iter().all(|c| c.args["includeTools"] == json!(true)));
}

#[tokio::test]
async fn test_logs_rejects_bad_params() {
    let (app, gw) = app(logs_gateway);

    let (status, body) = get(app.clone(), "/api/logs?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("limit"));

    let (status, _) = get(app.clone(), "/api/logs?limit=501").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app.clone(), "/api/logs?role=robot").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(gw.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_query_uses_detail_body() {
    let (app, gw) = app(logs_gateway);

    for uri in [
        "/api/logs?offset=-1",
        "/api/logs?limit=abc",
        "/api/sessions?active_minutes=soon",
        "/api/cron/jobs?include_disabled=maybe",
    ] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        let detail = body["detail"].as_str().unwrap_or_default();
        assert!(!detail.is_empty(), "{uri} must answer with a JSON detail, got {body}");
    }
    assert!(gw.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_body_uses_detail_body() {
    let (app, gw) = app(|_| Ok(not_ok("unused")));

    let (status, body) = send(
        app,
        Method::PATCH,
        "/api/config",
        Some(json!({"patch": {"a": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("base_hash"));
    assert!(gw.calls().is_empty());
}

#[tokio::test]
async fn test_logs_gateway_down_is_502() {
    let (app, _) = app(|_| {
        Err(FiggyError::Transport {
            status: 503,
            body: "unavailable".into(),
        })
    });

    let (status, body) = get(app, "/api/logs").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["detail"],
        "Gateway error: Gateway returned HTTP 503: unavailable"
    );
}

#[tokio::test]
async fn test_log_sessions_and_channels() {
    let (app, _) = app(logs_gateway);

    let (status, body) = get(app.clone(), "/api/logs/sessions").await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["s2", "s1", "s3"]);
    assert_eq!(body["sessions"][0]["displayName"], "Ops");
    assert_eq!(body["sessions"][1]["displayName"], "s1");

    let (status, body) = get(app, "/api/logs/channels").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"channels": ["discord", "telegram"]}));
}

#[tokio::test]
async fn test_sessions_list_passes_active_minutes() {
    let (app, gw) = app(logs_gateway);

    let (status, body) = get(app, "/api/sessions?active_minutes=15").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 3);
    assert_eq!(gw.calls()[0].args["activeMinutes"], json!(15));
}

#[tokio::test]
async fn test_sessions_list_keeps_gateway_fields() {
    let (app, _) = app(|_| {
        Ok(ok(json!({"details": {"sessions": [{
            "key": "agent:main:main",
            "sessionId": "4f1c",
            "inputTokens": 1200,
            "outputTokens": 340,
            "updatedAt": 100
        }]}})))
    });

    let (status, body) = get(app, "/api/sessions").await;
    assert_eq!(status, StatusCode::OK);
    let session = &body["sessions"][0];
    assert_eq!(session["key"], "agent:main:main");
    assert_eq!(session["sessionId"], "4f1c");
    assert_eq!(session["inputTokens"], 1200);
    assert_eq!(session["outputTokens"], 340);
    assert_eq!(session["updatedAt"], 100);
}

#[tokio::test]
async fn test_session_history_not_found() {
    let (app, gw) = app(|inv| match arg_str(inv, "sessionKey") {
        Some("agent:main:known") => Ok(ok(json!({"details": {"messages": []}}))),
        _ => Ok(not_ok("no such session")),
    });

    let (status, body) = get(app.clone(), "/api/sessions/agent:main:known/history?limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"messages": []}));
    assert_eq!(gw.calls()[0].args["limit"], json!(5));

    let (status, body) = get(app.clone(), "/api/sessions/missing/history").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Session not found");

    let (status, _) = get(app, "/api/sessions/missing/history?limit=600").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_get_and_patch() {
    let (app, gw) = app(|inv| match inv.action.as_deref() {
        Some("config.get") => Ok(ok(json!({"details": {"config": {"a": 1}, "hash": "h1"}}))),
        Some("config.patch") if arg_str(inv, "baseHash") == Some("h1") => {
            Ok(ok(json!({"details": {"ok": true, "hash": "h2"}})))
        }
        Some("config.patch") => Ok(not_ok("config changed since last load; re-run config.get")),
        _ => Ok(not_ok("unknown")),
    });

    let (status, body) = get(app.clone(), "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"config": {"a": 1}, "hash": "h1"}));

    let (status, body) = send(
        app.clone(),
        Method::PATCH,
        "/api/config",
        Some(json!({"patch": {"b": 2}, "base_hash": "h1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hash"], "h2");

    let (status, body) = send(
        app,
        Method::PATCH,
        "/api/config",
        Some(json!({"patch": {"b": 3}, "base_hash": "h0"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("re-run config.get"));

    let patches = gw
        .calls()
        .into_iter()
        .filter(|c| c.action.as_deref() == Some("config.patch"))
        .count();
    assert_eq!(patches, 2);
}

#[tokio::test]
async fn test_config_rejection_is_502() {
    let (app, _) = app(|_| Ok(not_ok("invalid config: unknown key")));

    let (status, body) = send(
        app,
        Method::PATCH,
        "/api/config",
        Some(json!({"patch": {"zzz": 1}, "base_hash": "h1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["detail"].as_str().unwrap().starts_with("Gateway error:"));
}

#[tokio::test]
async fn test_status_endpoints() {
    let (app, _) = app(|inv| match inv.tool.as_str() {
        "session_status" => Ok(ok(json!({"details": {
            "sessionKey": "s2",
            "busy": false,
            "uptimeSeconds": 3600,
            "channels": {"telegram": {"ok": true}}
        }}))),
        _ => Ok(ok(json!({"details": {"sessions": [{"key": "s2", "displayName": "Ops"}]}}))),
    });

    let (status, body) = get(app.clone(), "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_session"], "s2");
    assert_eq!(body["current_session_name"], "Ops");
    assert_eq!(body["active_sessions"], json!(1));

    let (status, body) = get(app, "/api/status/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["uptime_seconds"], json!(3600.0));
}

#[tokio::test]
async fn test_health_reports_gateway_failure_in_body() {
    let (app, _) = app(|_| Ok(not_ok("denied")));

    let (status, body) = get(app, "/api/status/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["channels"]["error"], "Tool invoke failed");
}

#[tokio::test]
async fn test_cron_routes() {
    let (app, gw) = app(|inv| match arg_str(inv, "action") {
        Some("list") => Ok(ok(json!({"details": {"jobs": [{"id": "nightly", "enabled": true}]}}))),
        Some("update") => Ok(ok(json!({"details": {"updated": true}}))),
        Some("add") => Ok(ok(json!({"details": {"id": "new"}}))),
        _ => Ok(not_ok("cron failure")),
    });

    let (status, body) = get(app.clone(), "/api/cron/jobs/nightly").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "nightly");

    let (status, _) = get(app.clone(), "/api/cron/jobs/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(app.clone(), Method::POST, "/api/cron/jobs/nightly/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], json!(true));

    let (status, _) = send(
        app.clone(),
        Method::PATCH,
        "/api/cron/jobs/nightly",
        Some(json!({"name": "Nightly build"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/api/cron/jobs",
        Some(json!({"schedule": {"kind": "every", "everyMs": 60000}, "payload": {"kind": "systemEvent", "text": "hi"}, "sessionTarget": "main"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "new");

    let (status, _) = send(app.clone(), Method::POST, "/api/cron/jobs/nightly/run", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, body) = get(app, "/api/cron/jobs/nightly/runs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"runs": []}));

    let updates: Vec<Value> = gw
        .calls()
        .into_iter()
        .filter(|c| arg_str(c, "action") == Some("update"))
        .map(|c| c.args["patch"].clone())
        .collect();
    assert_eq!(
        updates,
        vec![json!({"enabled": false}), json!({"name": "Nightly build"})]
    );
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let (app, _) = app(|_| Ok(not_ok("unused")));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/logs")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

/// Gateway whose `config.get` reports `sha-1` and whose `config.patch`
/// accepts only `accepted_hash`.
fn queue_gateway(config: Value, accepted_hash: &'static str) -> Arc<MockGateway> {
    Arc::new(MockGateway::new(move |inv| {
        match (inv.tool.as_str(), inv.action.as_deref()) {
            ("gateway", Some("config.get")) => {
                Ok(ok(json!({"details": {"config": config, "hash": "sha-1"}})))
            }
            ("gateway", Some("config.patch")) if arg_str(inv, "baseHash") == Some(accepted_hash) => {
                Ok(ok(json!({"details": {"ok": true, "hash": "sha-2"}})))
            }
            ("gateway", Some("config.patch")) => {
                Ok(not_ok("config changed since last load; re-run config.get"))
            }
            ("sessions_list", _) => {
                let sessions: Vec<Value> = (0..25)
                    .map(|i| json!({"key": format!("agent:main:s{i}"), "channel": "web"}))
                    .collect();
                Ok(ok(json!({"details": {"sessions": sessions}})))
            }
            _ => Ok(not_ok("unexpected")),
        }
    }))
}

#[tokio::test]
async fn test_queue_status_fills_defaults() {
    let gw = queue_gateway(json!({"messages": {"queue": {"mode": "steer"}}}), "sha-1");
    let app = app_with(gw);

    let (status, body) = get(app, "/api/queue/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["config"],
        json!({
            "mode": "steer",
            "debounceMs": 1000,
            "cap": 20,
            "drop": "summarize",
            "byChannel": {}
        })
    );
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 20);
    assert_eq!(sessions[0]["sessionKey"], "agent:main:s0");
    assert_eq!(sessions[0]["displayName"], "agent:main:s0");
    assert_eq!(sessions[0]["channel"], "web");
}

#[tokio::test]
async fn test_queue_update_patches_with_fresh_hash() {
    let gw = queue_gateway(json!({}), "sha-1");
    let app = app_with(gw.clone());

    let (status, body) = send(
        app,
        Method::PATCH,
        "/api/queue/config",
        Some(json!({"mode": "followup", "debounceMs": 500})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["result"]["hash"], "sha-2");

    let actions: Vec<Option<String>> = gw.calls().into_iter().map(|c| c.action).collect();
    assert_eq!(
        actions,
        vec![Some("config.get".to_string()), Some("config.patch".to_string())]
    );
    let patch = gw.calls().pop().unwrap();
    assert_eq!(arg_str(&patch, "baseHash"), Some("sha-1"));
    let raw: Value = serde_json::from_str(arg_str(&patch, "raw").unwrap()).unwrap();
    assert_eq!(
        raw,
        json!({"messages": {"queue": {"mode": "followup", "debounceMs": 500}}})
    );
}

#[tokio::test]
async fn test_queue_update_stale_hash_is_409() {
    // Another writer moved the config on between our read and our patch.
    let gw = queue_gateway(json!({}), "sha-2");
    let app = app_with(gw.clone());

    let (status, body) = send(app, Method::PATCH, "/api/queue/config", Some(json!({"cap": 5}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("re-run config.get"));
    assert_eq!(gw.calls_to("gateway").len(), 2);
}

#[tokio::test]
async fn test_queue_update_without_fields_makes_no_calls() {
    let gw = queue_gateway(json!({}), "sha-1");
    let app = app_with(gw.clone());

    let (status, body) = send(app, Method::PATCH, "/api/queue/config", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "message": "No changes"}));
    assert!(gw.calls().is_empty());
}

#[tokio::test]
async fn test_send_to_session() {
    let (app, gw) = app(|inv| match inv.tool.as_str() {
        "sessions_send" => Ok(ok(json!({"details": {"status": "accepted", "runId": "r-1"}}))),
        _ => Ok(not_ok("unexpected")),
    });

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/api/command/send?message=status%20report&session_key=agent:main:main",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
    let call = &gw.calls()[0];
    assert_eq!(arg_str(call, "message"), Some("status report"));
    assert_eq!(arg_str(call, "sessionKey"), Some("agent:main:main"));
    assert!(call.args.get("label").is_none());

    let (status, body) = send(app.clone(), Method::POST, "/api/command/send?message=%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("message"));

    let (status, body) = send(app, Method::POST, "/api/command/send", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
    assert_eq!(gw.calls().len(), 1);
}
